pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod summary;

pub use config::{AppConfig, PipelineConfig};
pub use decoder::{DicomDecoder, MetadataDecoder, MetadataRecord};
pub use engine::{OrganizeEngine, OrganizeResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
