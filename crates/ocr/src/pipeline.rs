use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tillscan_core::{LineGroup, LineItemRecord, PipelineConfig};
use tracing::info;

use crate::extract::FieldExtractor;
use crate::lines::LineReconstructor;
use crate::preprocess::{PreprocessError, Preprocessor, RectifiedImage};
use crate::recognizer::{DetectionError, TextDetector};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Text detection failed: {0}")]
    Detection(#[from] DetectionError),
}

/// The result of a single receipt processing run.
#[derive(Debug)]
pub struct ReceiptResult {
    pub rectified: RectifiedImage,
    /// Reconstructed text lines, top to bottom.
    pub lines: Vec<LineGroup>,
    /// Line items read from `lines`.
    pub records: Vec<LineItemRecord>,
}

/// Orchestrates: rectify → detect → reconstruct lines → extract items.
pub struct ReceiptPipeline<D: TextDetector> {
    detector: D,
    preprocessor: Preprocessor,
    reconstructor: LineReconstructor,
}

impl<D: TextDetector> ReceiptPipeline<D> {
    pub fn new(detector: D, config: &PipelineConfig) -> Self {
        Self {
            detector,
            preprocessor: Preprocessor::new(config.preprocess.clone()),
            reconstructor: LineReconstructor::new(config.lines.clone()),
        }
    }

    /// Write intermediate preprocessing images into `dir`.
    pub fn with_diagnostics(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preprocessor = self.preprocessor.with_diagnostics(dir);
        self
    }

    /// Process an image file on disk.
    pub fn process_file(&self, path: &Path) -> Result<ReceiptResult, PipelineError> {
        let rectified = self.preprocessor.rectify_path(path)?;
        self.finish(rectified)
    }

    /// Process encoded image bytes (camera capture or file read).
    pub fn process_bytes(&self, data: &[u8]) -> Result<ReceiptResult, PipelineError> {
        let rectified = self.preprocessor.rectify(data)?;
        self.finish(rectified)
    }

    pub fn process_image(&self, img: DynamicImage) -> Result<ReceiptResult, PipelineError> {
        let rectified = self.preprocessor.rectify_image(img)?;
        self.finish(rectified)
    }

    fn finish(&self, rectified: RectifiedImage) -> Result<ReceiptResult, PipelineError> {
        // The corrected image goes to the detector straight from memory.
        let png = rectified.to_png_bytes()?;
        let annotations = self.detector.detect(&png)?;

        if annotations.is_empty() {
            info!("No text detected");
            return Ok(ReceiptResult { rectified, lines: Vec::new(), records: Vec::new() });
        }

        // First annotation is the full-text blob, not a word.
        let words = &annotations[1..];
        let lines = self.reconstructor.reconstruct(words);
        let records = FieldExtractor::extract_all(&lines);
        info!(words = words.len(), lines = lines.len(), items = records.len(), "Receipt processed");

        Ok(ReceiptResult { rectified, lines, records })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
