mod backend;
pub mod backends;
pub mod postprocess;
mod result;

pub use backend::DetectorBackend;
pub use backends::{load_backend, StubBackend};
pub use postprocess::{
    non_max_suppression, ContainmentVerdict, DetectionPostprocessor, PostprocessConfig,
    RegionReport,
};
pub use result::{parse_darknet_rows, Detection, RawDetection, DARKNET_SCORES_OFFSET};
