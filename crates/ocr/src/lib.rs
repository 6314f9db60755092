pub mod extract;
pub mod geometry;
pub mod lines;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod vision;

pub use extract::{is_numeric, ExtractError, FieldExtractor};
pub use geometry::Quadrilateral;
pub use lines::LineReconstructor;
pub use pipeline::{PipelineError, ReceiptPipeline, ReceiptResult};
pub use preprocess::{PreprocessError, Preprocessor, RectifiedImage};
pub use recognizer::{DetectionError, MockDetector, TextDetector};
#[cfg(feature = "vision")]
pub use vision::VisionDetector;
