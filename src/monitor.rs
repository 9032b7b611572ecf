//! Frame loop.
//!
//! Pulls one frame at a time from a [`VideoSource`], runs the detector and
//! both analysis paths, draws the overlay and hands the result to a
//! [`DisplaySink`]. The loop ends on end of stream, on a quit request from the
//! sink, or when the stop flag is raised. Everything is single-threaded; the
//! stop flag is the only state shared with another thread (the Ctrl-C handler).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::GrayImage;

use crate::classes::ClassNames;
use crate::config::MonitorConfig;
use crate::detect::{DetectionPostprocessor, DetectorBackend, PostprocessConfig, RegionReport};
use crate::display::{DisplayControl, DisplaySink, FrameView};
use crate::frame::Frame;
use crate::ingest::VideoSource;
use crate::occupancy::{OccupancyEstimator, OccupancyReport, OccupancyState};
use crate::overlay::{draw_boxes, Overlay};

/// Analysis results for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub index: u64,
    pub detections: RegionReport,
    pub occupancy: OccupancyReport,
}

/// Products of processing one frame, kept together for display.
pub struct ProcessedFrame {
    pub report: FrameReport,
    pub gray: GrayImage,
    pub mask: GrayImage,
    pub overlay: Overlay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    EndOfStream,
    UserQuit,
    Interrupted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub alert_frames: u64,
    pub occupied_frames: u64,
    pub end: RunEnd,
}

/// Resolve the target class and build the post-processor from config.
pub fn postprocessor_for(cfg: &MonitorConfig, classes: &ClassNames) -> Result<DetectionPostprocessor> {
    let target_class_id = classes
        .index_of(&cfg.target_class)
        .with_context(|| format!("target class lookup in {}", cfg.model.classes_path.display()))?;
    Ok(DetectionPostprocessor::new(PostprocessConfig {
        confidence_threshold: cfg.confidence_threshold,
        nms_threshold: cfg.nms_threshold,
        region: cfg.region,
        target_class_id,
        target_label: cfg.target_class.clone(),
    }))
}

pub fn estimator_for(cfg: &MonitorConfig) -> OccupancyEstimator {
    OccupancyEstimator::new(cfg.region, cfg.occupancy_threshold)
}

pub struct Monitor<S, B, D> {
    source: S,
    backend: B,
    postprocessor: DetectionPostprocessor,
    estimator: OccupancyEstimator,
    display: D,
    stop: Option<Arc<AtomicBool>>,
    health_log_interval: Duration,
    last_alert: bool,
    last_occupancy: Option<OccupancyState>,
}

impl<S, B, D> Monitor<S, B, D>
where
    S: VideoSource,
    B: DetectorBackend,
    D: DisplaySink,
{
    pub fn new(
        source: S,
        backend: B,
        postprocessor: DetectionPostprocessor,
        estimator: OccupancyEstimator,
        display: D,
    ) -> Self {
        Self {
            source,
            backend,
            postprocessor,
            estimator,
            display,
            stop: None,
            health_log_interval: Duration::from_secs(5),
            last_alert: false,
            last_occupancy: None,
        }
    }

    /// Flag polled once per frame; raising it ends the run after the current frame.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_health_log_interval(mut self, interval: Duration) -> Self {
        self.health_log_interval = interval;
        self
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Detection, occupancy and overlay for one frame. Draws box outlines into the frame.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<ProcessedFrame> {
        let raw = self
            .backend
            .detect(frame)
            .with_context(|| format!("detector {} failed on frame {}", self.backend.name(), frame.index))?;
        let detections = self
            .postprocessor
            .filter_and_select(&raw, frame.width(), frame.height());
        let region_report = self.postprocessor.classify_against_region(&detections);

        let (gray, mask) = self.estimator.compute_mask(frame);
        let occupancy = self.estimator.classify(&mask);

        let mut overlay = self.postprocessor.overlay(&region_report);
        overlay.extend(self.estimator.overlay(&occupancy));
        draw_boxes(frame.image_mut(), &overlay);

        Ok(ProcessedFrame {
            report: FrameReport {
                index: frame.index,
                detections: region_report,
                occupancy,
            },
            gray,
            mask,
            overlay,
        })
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        self.backend.warm_up()?;

        let mut summary = RunSummary {
            frames_processed: 0,
            alert_frames: 0,
            occupied_frames: 0,
            end: RunEnd::EndOfStream,
        };
        let mut last_health_log = Instant::now();

        loop {
            if self.stop_requested() {
                summary.end = RunEnd::Interrupted;
                break;
            }
            let Some(mut frame) = self.source.next_frame()? else {
                log::info!("end of video");
                break;
            };

            let processed = self.process_frame(&mut frame)?;
            self.log_transitions(&processed.report);

            summary.frames_processed += 1;
            if processed.report.detections.target_in_region {
                summary.alert_frames += 1;
            }
            if processed.report.occupancy.state == OccupancyState::Occupied {
                summary.occupied_frames += 1;
            }

            let control = self.display.show(&FrameView {
                annotated: frame.image(),
                gray: &processed.gray,
                mask: &processed.mask,
                overlay: &processed.overlay,
            })?;
            if control == DisplayControl::Quit {
                summary.end = RunEnd::UserQuit;
                break;
            }

            if last_health_log.elapsed() >= self.health_log_interval {
                let stats = self.source.stats();
                log::info!(
                    "frames={} alerts={} occupied={} source={}",
                    stats.frames_captured,
                    summary.alert_frames,
                    summary.occupied_frames,
                    stats.path
                );
                last_health_log = Instant::now();
            }
        }

        Ok(summary)
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn log_transitions(&mut self, report: &FrameReport) {
        let alert = report.detections.target_in_region;
        if alert != self.last_alert {
            if alert {
                let best = report
                    .detections
                    .targets()
                    .map(|(det, _)| det.confidence)
                    .fold(0.0f32, f32::max);
                log::warn!(
                    "frame {}: target on monitored surface (conf={:.2})",
                    report.index,
                    best
                );
            } else {
                log::info!("frame {}: target left monitored surface", report.index);
            }
            self.last_alert = alert;
        }

        let state = report.occupancy.state;
        if self.last_occupancy != Some(state) {
            log::info!(
                "frame {}: {} ({} foreground px)",
                report.index,
                state.label().to_lowercase(),
                report.occupancy.foreground_pixels
            );
            self.last_occupancy = Some(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ContainmentVerdict, RawDetection, StubBackend};
    use crate::display::HeadlessDisplay;
    use crate::geometry::{NormalizedBox, Rect};
    use crate::ingest::{FileConfig, FileSource};
    use crate::overlay::{BLUE, RED};

    const CAT: usize = 1;

    fn cfg() -> MonitorConfig {
        MonitorConfig::default()
    }

    fn classes() -> ClassNames {
        ClassNames::parse("person\ncat\ndog")
    }

    fn source(frames: u64) -> FileSource {
        FileSource::open(FileConfig {
            path: "stub://test".to_string(),
            synthetic_frames: frames,
            synthetic_width: 512,
            synthetic_height: 512,
        })
        .unwrap()
    }

    fn cat_at(cx: f32, cy: f32, confidence: f32) -> RawDetection {
        RawDetection {
            bbox: NormalizedBox {
                cx: cx / 512.0,
                cy: cy / 512.0,
                w: 50.0 / 512.0,
                h: 50.0 / 512.0,
            },
            class_scores: vec![0.0, confidence, 0.0],
        }
    }

    fn monitor(
        frames: u64,
        backend: StubBackend,
    ) -> Monitor<FileSource, StubBackend, HeadlessDisplay> {
        let cfg = cfg();
        Monitor::new(
            source(frames),
            backend,
            postprocessor_for(&cfg, &classes()).unwrap(),
            estimator_for(&cfg),
            HeadlessDisplay::new(),
        )
    }

    #[test]
    fn resolves_target_class_from_list() -> Result<()> {
        let pp = postprocessor_for(&cfg(), &classes())?;
        assert_eq!(pp.config().target_class_id, CAT);
        let mut other = cfg();
        other.target_class = "gato".to_string();
        assert!(postprocessor_for(&other, &classes()).is_err());
        Ok(())
    }

    #[test]
    fn runs_until_end_of_stream() -> Result<()> {
        let mut m = monitor(4, StubBackend::new());
        let summary = m.run()?;
        assert_eq!(summary.frames_processed, 4);
        assert_eq!(summary.alert_frames, 0);
        assert_eq!(summary.end, RunEnd::EndOfStream);
        assert_eq!(m.display().frames_shown(), 4);
        Ok(())
    }

    #[test]
    fn counts_alert_frames() -> Result<()> {
        let backend = StubBackend::with_script(vec![
            vec![cat_at(150.0, 200.0, 0.65)],
            vec![cat_at(10.0, 10.0, 0.65)],
            vec![cat_at(150.0, 200.0, 0.9), cat_at(10.0, 10.0, 0.8)],
        ]);
        let summary = monitor(3, backend).run()?;
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.alert_frames, 2);
        Ok(())
    }

    #[test]
    fn process_frame_draws_verdict_colors() -> Result<()> {
        let mut m = monitor(1, StubBackend::repeating(vec![cat_at(150.0, 200.0, 0.65)]));
        let mut frame = Frame::from_image(image::RgbImage::new(512, 512), 1);
        let processed = m.process_frame(&mut frame)?;

        assert!(processed.report.detections.target_in_region);
        assert_eq!(
            processed.report.detections.verdicts[0].1,
            ContainmentVerdict::Inside
        );
        // detection box (125,175,50,50) outlined in red
        assert_eq!(frame.image().get_pixel(125, 190).0, RED);
        assert_eq!(processed.overlay.banners.len(), 1);
        assert_eq!(processed.gray.dimensions(), (512, 512));
        Ok(())
    }

    #[test]
    fn outside_detection_is_blue() -> Result<()> {
        let mut m = monitor(1, StubBackend::repeating(vec![cat_at(40.0, 40.0, 0.7)]));
        let mut frame = Frame::from_image(image::RgbImage::new(512, 512), 1);
        let processed = m.process_frame(&mut frame)?;
        assert!(!processed.report.detections.target_in_region);
        // box (15,15,50,50)
        assert_eq!(frame.image().get_pixel(15, 30).0, BLUE);
        assert!(processed.overlay.banners.is_empty());
        Ok(())
    }

    #[test]
    fn stop_flag_ends_run_before_next_frame() -> Result<()> {
        let stop = Arc::new(AtomicBool::new(true));
        let mut m = monitor(10, StubBackend::new()).with_stop_flag(stop);
        let summary = m.run()?;
        assert_eq!(summary.frames_processed, 0);
        assert_eq!(summary.end, RunEnd::Interrupted);
        Ok(())
    }

    #[test]
    fn region_outline_is_drawn_every_frame() -> Result<()> {
        let mut m = monitor(1, StubBackend::new());
        let mut frame = Frame::from_image(image::RgbImage::new(512, 512), 1);
        let processed = m.process_frame(&mut frame)?;
        let region: Rect = cfg().region;
        let expected = match processed.report.occupancy.state {
            OccupancyState::Occupied => RED,
            OccupancyState::Empty => crate::overlay::GREEN,
        };
        assert_eq!(
            frame.image().get_pixel(region.x as u32, region.y as u32 + 20).0,
            expected
        );
        Ok(())
    }
}
