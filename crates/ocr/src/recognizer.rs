use thiserror::Error;
use tillscan_core::{Vertex, WordAnnotation};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Text detection request failed: {0}")]
    Transport(String),
    #[error("Text detection rejected credentials: {0}")]
    Auth(String),
    #[error("Text detection API error: {0}")]
    Api(String),
    #[error("Malformed text detection response: {0}")]
    Malformed(String),
}

/// Abstraction over a word-level text detector.
///
/// Implementations accept encoded image bytes (PNG/JPEG) and return the raw
/// annotation list. By convention the first element is the whole-page text
/// blob and the rest are individual words; callers drop the first element.
pub trait TextDetector: Send + Sync {
    fn detect(&self, image_bytes: &[u8]) -> Result<Vec<WordAnnotation>, DetectionError>;
}

impl<T: TextDetector + ?Sized> TextDetector for &T {
    fn detect(&self, image_bytes: &[u8]) -> Result<Vec<WordAnnotation>, DetectionError> {
        (**self).detect(image_bytes)
    }
}

impl<T: TextDetector + ?Sized> TextDetector for Box<T> {
    fn detect(&self, image_bytes: &[u8]) -> Result<Vec<WordAnnotation>, DetectionError> {
        (**self).detect(image_bytes)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset annotation list. Exercises line
/// reconstruction and extraction without a network detector.
pub struct MockDetector {
    pub annotations: Vec<WordAnnotation>,
}

impl MockDetector {
    /// Preset the raw response exactly, including any leading full-text entry.
    pub fn new(annotations: Vec<WordAnnotation>) -> Self {
        Self { annotations }
    }

    /// Preset word annotations; a full-text entry spanning all of them is
    /// put in front, the way a real detector responds.
    pub fn with_words(words: Vec<WordAnnotation>) -> Self {
        if words.is_empty() {
            return Self::new(words);
        }
        let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for v in words.iter().flat_map(|w| w.bounding_box) {
            min_x = min_x.min(v.x);
            min_y = min_y.min(v.y);
            max_x = max_x.max(v.x);
            max_y = max_y.max(v.y);
        }
        let blob = WordAnnotation::new(
            text,
            [
                Vertex::new(min_x, min_y),
                Vertex::new(max_x, min_y),
                Vertex::new(max_x, max_y),
                Vertex::new(min_x, max_y),
            ],
        );
        let mut annotations = Vec::with_capacity(words.len() + 1);
        annotations.push(blob);
        annotations.extend(words);
        Self::new(annotations)
    }
}

impl TextDetector for MockDetector {
    fn detect(&self, _image_bytes: &[u8]) -> Result<Vec<WordAnnotation>, DetectionError> {
        Ok(self.annotations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_annotations() {
        let words = vec![WordAnnotation::from_rect("Milk", 0, 0, 30, 10)];
        let d = MockDetector::new(words.clone());
        assert_eq!(d.detect(b"fake image data").unwrap(), words);
        assert_eq!(d.detect(b"").unwrap(), words);
    }

    #[test]
    fn with_words_prepends_full_text_blob() {
        let d = MockDetector::with_words(vec![
            WordAnnotation::from_rect("Milk", 10, 20, 30, 10),
            WordAnnotation::from_rect("2", 100, 22, 8, 10),
        ]);
        let out = d.detect(b"").unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].text, "Milk 2");
        assert_eq!(out[0].bounding_box[0], Vertex::new(10, 20));
        assert_eq!(out[0].bounding_box[2], Vertex::new(108, 32));
        assert_eq!(out[1].text, "Milk");
    }

    #[test]
    fn with_no_words_is_empty() {
        assert!(MockDetector::with_words(vec![]).detect(b"").unwrap().is_empty());
    }

    #[test]
    fn detector_usable_through_reference_and_box() {
        let d = MockDetector::new(vec![]);
        let by_ref: &dyn TextDetector = &d;
        assert!(by_ref.detect(b"").unwrap().is_empty());
        let boxed: Box<dyn TextDetector> = Box::new(MockDetector::new(vec![]));
        assert!(boxed.detect(b"").unwrap().is_empty());
    }
}
