//! Detector output post-processing.
//!
//! Raw candidates go through argmax class selection, a confidence cut,
//! denormalization to pixels and greedy non-maximum suppression. Survivors of
//! the target class are then checked against the monitored region by
//! centroid containment.
//!
//! Suppression is global: a box of one class can suppress an overlapping box
//! of another class.

use crate::detect::result::{Detection, RawDetection};
use crate::geometry::Rect;
use crate::overlay::{BoxAnnotation, Label, Overlay, BLUE, RED};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;

/// Where the alert banner is drawn.
pub const ALERT_ORIGIN: (i32, i32) = (10, 30);
pub const ALERT_TEXT: &str = "ALERT!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainmentVerdict {
    Inside,
    Outside,
    /// Detection is not of the target class.
    NotApplicable,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostprocessConfig {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub region: Rect,
    pub target_class_id: usize,
    /// Human-readable target name used in labels.
    pub target_label: String,
}

/// Classified detections for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionReport {
    pub verdicts: Vec<(Detection, ContainmentVerdict)>,
    pub target_in_region: bool,
}

impl RegionReport {
    /// Target-class detections only.
    pub fn targets(&self) -> impl Iterator<Item = &(Detection, ContainmentVerdict)> {
        self.verdicts
            .iter()
            .filter(|(_, verdict)| *verdict != ContainmentVerdict::NotApplicable)
    }
}

pub struct DetectionPostprocessor {
    config: PostprocessConfig,
}

impl DetectionPostprocessor {
    pub fn new(config: PostprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Confidence filter, denormalization and suppression.
    pub fn filter_and_select(
        &self,
        raw: &[RawDetection],
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<Detection> {
        let candidates: Vec<Detection> = raw
            .iter()
            .filter_map(|candidate| {
                let (class_id, confidence) = candidate.best_class()?;
                if confidence <= self.config.confidence_threshold {
                    return None;
                }
                Some(Detection {
                    rect: candidate.bbox.denormalize(frame_width, frame_height),
                    class_id,
                    confidence,
                })
            })
            .collect();
        non_max_suppression(candidates, self.config.nms_threshold)
    }

    pub fn classify_against_region(&self, detections: &[Detection]) -> RegionReport {
        let verdicts: Vec<(Detection, ContainmentVerdict)> = detections
            .iter()
            .map(|det| (*det, self.verdict_for(det)))
            .collect();
        let target_in_region = verdicts
            .iter()
            .any(|(_, verdict)| *verdict == ContainmentVerdict::Inside);
        RegionReport {
            verdicts,
            target_in_region,
        }
    }

    fn verdict_for(&self, detection: &Detection) -> ContainmentVerdict {
        if detection.class_id != self.config.target_class_id {
            return ContainmentVerdict::NotApplicable;
        }
        if self.config.region.contains_strict(detection.rect.centroid()) {
            ContainmentVerdict::Inside
        } else {
            ContainmentVerdict::Outside
        }
    }

    /// Boxes for target detections, plus the alert banner when one is inside.
    pub fn overlay(&self, report: &RegionReport) -> Overlay {
        let mut overlay = Overlay::new();
        for (det, verdict) in report.targets() {
            let (color, text) = match verdict {
                ContainmentVerdict::Inside => (
                    RED,
                    format!(
                        "{} on surface: {:.2}",
                        self.config.target_label, det.confidence
                    ),
                ),
                _ => (
                    BLUE,
                    format!(
                        "{} off surface: {:.2}",
                        self.config.target_label, det.confidence
                    ),
                ),
            };
            overlay.boxes.push(BoxAnnotation {
                rect: det.rect,
                color,
                label: Some(Label {
                    text,
                    origin: (det.rect.x, det.rect.y - 5),
                    scale: 0.5,
                    color,
                }),
            });
        }
        if report.target_in_region {
            overlay.banners.push(Label {
                text: ALERT_TEXT.to_string(),
                origin: ALERT_ORIGIN,
                scale: 0.8,
                color: RED,
            });
        }
        overlay
    }
}

/// Greedy NMS across all classes.
///
/// Candidates are stably sorted by confidence, highest first. A candidate is
/// kept when its IoU with every already kept box is at most `iou_threshold`.
/// Output is in acceptance order.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| k.rect.iou(&candidate.rect) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}
