//! Google Cloud Vision `images:annotate` text detection.
//!
//! Response decoding is always compiled; the HTTP client sits behind the
//! `vision` feature.

use serde::{Deserialize, Serialize};
use tillscan_core::{Vertex, WordAnnotation};
use tracing::warn;

use crate::recognizer::DetectionError;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Serialize)]
pub struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    image: ImageContent<'a>,
    features: [Feature; 1],
}

#[derive(Debug, Serialize)]
struct ImageContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> AnnotateRequest<'a> {
    /// Single-image `TEXT_DETECTION` request for base64-encoded content.
    pub fn text_detection(base64_content: &'a str) -> Self {
        Self {
            requests: [ImageRequest {
                image: ImageContent { content: base64_content },
                features: [Feature { kind: "TEXT_DETECTION" }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Message of an API error body, if the body carries one.
pub fn error_message(body: &str) -> Option<String> {
    let parsed: AnnotateResponse = serde_json::from_str(body).ok()?;
    parsed.error.map(|e| e.message)
}

/// Decode an `images:annotate` response into annotations, full-text entry
/// first. Vision leaves out zero coordinates, so missing ones read as 0.
///
/// A word whose box does not have four vertices is dropped with a warning.
/// The full-text entry is kept whatever its box, since it only marks the
/// head of the list.
pub fn parse_annotate_response(body: &str) -> Result<Vec<WordAnnotation>, DetectionError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| DetectionError::Malformed(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(DetectionError::Api(format!("{} (code {})", err.message, err.code)));
    }
    let Some(response) = parsed.responses.into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(err) = response.error {
        return Err(DetectionError::Api(format!("{} (code {})", err.message, err.code)));
    }

    let mut annotations = Vec::with_capacity(response.text_annotations.len());
    for (idx, a) in response.text_annotations.into_iter().enumerate() {
        let vertices = a.bounding_poly.map(|p| p.vertices).unwrap_or_default();
        match <[Vertex; 4]>::try_from(vertices) {
            Ok(bounding_box) => annotations.push(WordAnnotation::new(a.description, bounding_box)),
            Err(vertices) if idx == 0 => {
                warn!(vertices = vertices.len(), "Full-text annotation has an odd bounding box");
                annotations.push(WordAnnotation::new(a.description, [Vertex::default(); 4]));
            }
            Err(vertices) => {
                warn!(
                    "Dropping '{}': {} bounding vertices, expected 4",
                    a.description,
                    vertices.len()
                );
            }
        }
    }
    Ok(annotations)
}

#[cfg(feature = "vision")]
pub use client::VisionDetector;

#[cfg(feature = "vision")]
mod client {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use reqwest::StatusCode;
    use std::time::Duration;
    use tillscan_core::WordAnnotation;
    use tracing::{debug, info};

    use super::{error_message, parse_annotate_response, AnnotateRequest, DEFAULT_ENDPOINT};
    use crate::recognizer::{DetectionError, TextDetector};

    /// Blocking Vision client authenticated with an API key.
    pub struct VisionDetector {
        client: reqwest::blocking::Client,
        api_key: String,
        endpoint: String,
    }

    impl VisionDetector {
        pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, DetectionError> {
            let api_key = api_key.into();
            if api_key.trim().is_empty() {
                return Err(DetectionError::Auth("API key is empty".into()));
            }
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| DetectionError::Transport(e.to_string()))?;
            Ok(Self { client, api_key, endpoint: DEFAULT_ENDPOINT.to_string() })
        }

        pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
            self.endpoint = endpoint.into();
            self
        }
    }

    impl TextDetector for VisionDetector {
        fn detect(&self, image_bytes: &[u8]) -> Result<Vec<WordAnnotation>, DetectionError> {
            let content = STANDARD.encode(image_bytes);
            info!("Detecting text ({} bytes)", image_bytes.len());

            let response = self
                .client
                .post(&self.endpoint)
                .query(&[("key", self.api_key.as_str())])
                .json(&AnnotateRequest::text_detection(&content))
                .send()
                .map_err(|e| DetectionError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response.text().map_err(|e| DetectionError::Transport(e.to_string()))?;
            debug!(%status, bytes = body.len(), "Text detection responded");

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let message = error_message(&body).unwrap_or_else(|| status.to_string());
                return Err(DetectionError::Auth(message));
            }
            if !status.is_success() {
                let message = error_message(&body).unwrap_or_else(|| status.to_string());
                return Err(DetectionError::Api(format!("HTTP {status}: {message}")));
            }
            parse_annotate_response(&body)
        }
    }
}
