//! Bancada Watch
//!
//! Watches a fixed surface (a kitchen counter, a "bancada") in a video and
//! flags when the target animal is standing on it.
//!
//! # Architecture
//!
//! Every frame goes through two independent analysis paths:
//!
//! 1. **Detection**: a detector backend proposes candidate boxes, the
//!    post-processor keeps confident candidates, suppresses overlaps and
//!    checks whether each target's centroid lies strictly inside the region.
//! 2. **Occupancy**: an adaptive-threshold foreground mask is counted inside
//!    the region and compared against a fixed pixel threshold.
//!
//! Neither path keeps state between frames.
//!
//! # Module Structure
//!
//! - `geometry`: Rects, normalized boxes, IoU and strict containment
//! - `frame`: Decoded RGB frames
//! - `ingest`: Frame sources (synthetic, local files)
//! - `detect`: Backends and detection post-processing
//! - `occupancy`: Adaptive-threshold occupancy estimation
//! - `overlay`, `display`: Annotation and presentation
//! - `config`, `assets`, `classes`: Startup configuration and model assets
//! - `monitor`: The frame loop

pub mod assets;
pub mod classes;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod monitor;
pub mod occupancy;
pub mod overlay;

pub use assets::{AssetReport, AssetStatus};
pub use classes::ClassNames;
pub use config::{BackendKind, DisplaySettings, ModelSettings, ModelVariant, MonitorConfig};
pub use detect::{
    load_backend, ContainmentVerdict, Detection, DetectionPostprocessor, DetectorBackend,
    PostprocessConfig, RawDetection, RegionReport, StubBackend,
};
pub use display::{open_display, DisplayControl, DisplaySink, FrameView, HeadlessDisplay};
pub use frame::Frame;
pub use geometry::{NormalizedBox, Rect};
pub use ingest::{FileConfig, FileSource, FileStats, VideoSource};
pub use monitor::{
    estimator_for, postprocessor_for, FrameReport, Monitor, ProcessedFrame, RunEnd, RunSummary,
};
pub use occupancy::{OccupancyEstimator, OccupancyReport, OccupancyState};
pub use overlay::{BoxAnnotation, Label, Overlay};
