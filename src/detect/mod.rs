mod backend;
mod backends;
pub mod motion;
mod registry;
pub mod text;

pub use backend::{CascadeKind, CascadeParams, Region, RegionDetector};
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractRegionBackend;
pub use registry::DetectorRegistry;
pub use text::{ScriptedRecognizer, TextCapture, TextRecognizer};
