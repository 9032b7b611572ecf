use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Model-free backend for dry runs and tests.
///
/// Replays a per-frame script of candidates; once the script is exhausted it
/// returns the fallback list (empty by default) for every frame.
#[derive(Default)]
pub struct StubBackend {
    script: VecDeque<Vec<RawDetection>>,
    fallback: Vec<RawDetection>,
    frames_seen: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates for successive frames, one entry per frame.
    pub fn with_script(script: Vec<Vec<RawDetection>>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    /// Same candidates on every frame.
    pub fn repeating(candidates: Vec<RawDetection>) -> Self {
        Self {
            fallback: candidates,
            ..Self::default()
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
        self.frames_seen += 1;
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedBox;

    fn candidate(score: f32) -> RawDetection {
        RawDetection {
            bbox: NormalizedBox {
                cx: 0.5,
                cy: 0.5,
                w: 0.1,
                h: 0.1,
            },
            class_scores: vec![score],
        }
    }

    fn frame() -> Frame {
        Frame::from_rgb(vec![0u8; 12], 2, 2, 1).unwrap()
    }

    #[test]
    fn replays_script_then_falls_back_to_empty() -> Result<()> {
        let mut backend = StubBackend::with_script(vec![vec![candidate(0.9)], vec![]]);
        assert_eq!(backend.detect(&frame())?.len(), 1);
        assert!(backend.detect(&frame())?.is_empty());
        assert!(backend.detect(&frame())?.is_empty());
        assert_eq!(backend.frames_seen(), 3);
        Ok(())
    }

    #[test]
    fn repeating_returns_same_candidates() -> Result<()> {
        let mut backend = StubBackend::repeating(vec![candidate(0.7), candidate(0.8)]);
        for _ in 0..3 {
            assert_eq!(backend.detect(&frame())?.len(), 2);
        }
        Ok(())
    }
}
