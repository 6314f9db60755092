pub mod annotation;
pub mod config;
pub mod line;
pub mod record;

pub use annotation::{Vertex, WordAnnotation};
pub use config::{ConfigError, LineConfig, LineStrategy, PipelineConfig, PreprocessConfig};
pub use line::LineGroup;
pub use record::LineItemRecord;
