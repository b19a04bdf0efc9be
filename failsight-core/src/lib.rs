pub mod config;
pub mod context;
pub mod dataset;
pub mod document;
pub mod encoding;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod narrative;
pub mod preview;
pub mod protocol;

pub use config::FailsightConfig;
pub use context::DashboardContext;
pub use dataset::SensorTable;
pub use document::Document;
pub use error::{FailsightError, SourceKind};
pub use fingerprint::SourceFingerprint;
pub use narrative::{NarrativeExtractor, Narratives};
pub use preview::{preview_delimited, TablePreview};
