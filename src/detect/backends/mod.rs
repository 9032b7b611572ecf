#[cfg(feature = "backend-opencv")]
pub mod darknet;
pub mod stub;
#[cfg(feature = "backend-tract")]
pub mod tract;

#[cfg(feature = "backend-opencv")]
pub use darknet::DarknetBackend;
pub use stub::StubBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use anyhow::Result;

use crate::config::{BackendKind, ModelSettings};
use crate::detect::backend::DetectorBackend;

/// Load the backend named in the model settings.
///
/// Fails when the model cannot be loaded or the backend was not compiled in.
pub fn load_backend(settings: &ModelSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend {
        BackendKind::Stub => Ok(Box::new(StubBackend::new())),
        BackendKind::Darknet => {
            #[cfg(feature = "backend-opencv")]
            {
                Ok(Box::new(DarknetBackend::new(
                    &settings.config_path,
                    &settings.weights_path,
                    settings.input_width,
                    settings.input_height,
                )?))
            }
            #[cfg(not(feature = "backend-opencv"))]
            {
                anyhow::bail!("darknet backend requires the backend-opencv feature")
            }
        }
        BackendKind::Tract => {
            #[cfg(feature = "backend-tract")]
            {
                Ok(Box::new(TractBackend::new(
                    &settings.weights_path,
                    settings.input_width,
                    settings.input_height,
                )?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                anyhow::bail!("tract backend requires the backend-tract feature")
            }
        }
    }
}
