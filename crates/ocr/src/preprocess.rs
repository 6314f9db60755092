use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tillscan_core::PreprocessConfig;
use tracing::{debug, info, warn};

use crate::geometry::{self, Quadrilateral};

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),
    #[error("No contours found in binarized image")]
    NoContourFound,
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// A perspective-corrected receipt, still in memory.
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    pub image: DynamicImage,
    /// Receipt outline in source-image coordinates.
    pub quad: Quadrilateral,
    /// The outline did not simplify to four vertices and the bounding
    /// rectangle was used instead.
    pub used_fallback: bool,
}

impl RectifiedImage {
    /// PNG bytes for handing to a text detector.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, PreprocessError> {
        encode_as_png(&self.image)
    }
}

/// Grayscale → adaptive threshold → outer contour → four corners → warp.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
    diagnostics_dir: Option<PathBuf>,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config, diagnostics_dir: None }
    }

    /// Also write the intermediate images (grayscale, binarized, contour
    /// overlay, corrected) into `dir`.
    pub fn with_diagnostics(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    pub fn rectify_path(&self, path: &Path) -> Result<RectifiedImage, PreprocessError> {
        info!("Reading image: {}", path.display());
        let img = image::open(path)?;
        self.rectify_image(img)
    }

    /// Decode raw bytes (JPEG / PNG / BMP / …) and rectify.
    pub fn rectify(&self, data: &[u8]) -> Result<RectifiedImage, PreprocessError> {
        let img = image::load_from_memory(data)?;
        self.rectify_image(img)
    }

    pub fn rectify_image(&self, img: DynamicImage) -> Result<RectifiedImage, PreprocessError> {
        debug!(width = img.width(), height = img.height(), "Rectifying image");

        let gray = img.to_luma8();
        self.save_diagnostic("grayscale.png", &DynamicImage::ImageLuma8(gray.clone()));

        let binary = binarize(&gray, &self.config);
        self.save_diagnostic("binarized.png", &DynamicImage::ImageLuma8(binary.clone()));

        let contours = external_contours(&binary);
        debug!(count = contours.len(), "External contours found");
        if self.diagnostics_dir.is_some() {
            self.save_diagnostic("contours.png", &draw_contours(&img, &contours));
        }

        let outline = largest_contour(&contours).ok_or(PreprocessError::NoContourFound)?;
        let (quad, used_fallback) = locate_receipt(outline, self.config.epsilon_ratio);

        let image = match correct_perspective(&img, &quad) {
            Some(warped) => warped,
            None => {
                warn!(?quad, "Degenerate receipt outline; keeping the uncorrected image");
                img
            }
        };
        info!(
            width = image.width(),
            height = image.height(),
            used_fallback,
            "Perspective correction applied"
        );
        self.save_diagnostic("perspective_corrected.png", &image);

        Ok(RectifiedImage { image, quad, used_fallback })
    }

    fn save_diagnostic(&self, name: &str, img: &DynamicImage) {
        let Some(dir) = &self.diagnostics_dir else {
            return;
        };
        let path = dir.join(name);
        match img.save(&path) {
            Ok(()) => debug!("Saved {}", path.display()),
            Err(e) => warn!("Could not write diagnostic image {}: {e}", path.display()),
        }
    }
}

/// Gaussian-weighted adaptive threshold: 255 where the pixel is brighter than
/// its local weighted mean minus `config.offset`, 0 elsewhere.
pub fn binarize(gray: &GrayImage, config: &PreprocessConfig) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, config.sigma());
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0] as f32;
        let threshold = local_mean.get_pixel(x, y)[0] as f32 - config.offset;
        Luma([if p > threshold { 255 } else { 0 }])
    })
}

/// Outermost contours of the foreground (nonzero) regions; holes and
/// anything nested inside them are skipped.
///
/// Pixels beyond the image edge count as background, so a region touching
/// the edge (a uniformly lit photo binarizes to one) still has an outer
/// border running along the frame.
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    let (width, height) = binary.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut padded, binary, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points.into_iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect())
        .collect()
}

/// Contour enclosing the largest area; the first one wins a tie.
pub fn largest_contour(contours: &[Vec<Point<i32>>]) -> Option<&[Point<i32>]> {
    let mut best: Option<(&[Point<i32>], f64)> = None;
    for c in contours {
        let area = contour_area(c);
        if best.map_or(true, |(_, a)| area > a) {
            best = Some((c.as_slice(), area));
        }
    }
    best.map(|(c, _)| c)
}

/// Reduce a receipt outline to four ordered corners.
///
/// Returns `true` alongside the quadrilateral when the polygon approximation
/// did not produce exactly four vertices and the bounding rectangle was used.
pub fn locate_receipt(contour: &[Point<i32>], epsilon_ratio: f64) -> (Quadrilateral, bool) {
    let epsilon = epsilon_ratio * arc_length(contour, true);
    let approx = geometry::approximate_polygon(contour, epsilon);

    if let [a, b, c, d] = approx.as_slice() {
        let corners = [a, b, c, d].map(|p| (p.x as f32, p.y as f32));
        return (Quadrilateral::order(corners), false);
    }

    warn!(
        vertices = approx.len(),
        "Contour does not form a quadrilateral; using its bounding rectangle"
    );
    // contour is never empty here: find_contours yields at least one point per border
    let (x, y, w, h) = geometry::bounding_rect(contour).unwrap_or((0, 0, 1, 1));
    (Quadrilateral::order(Quadrilateral::from_rect(x, y, w, h).corners), true)
}

/// Projection taking the quadrilateral onto an upright `width × height`
/// rectangle, together with that size.
pub fn perspective_projection(quad: &Quadrilateral) -> Option<(Projection, u32, u32)> {
    let (width, height) = quad.target_size();
    let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);
    let dest = [(0.0, 0.0), (max_x, 0.0), (max_x, max_y), (0.0, max_y)];
    let projection = Projection::from_control_points(quad.corners, dest)?;
    Some((projection, width, height))
}

/// Warp the receipt region to an upright rectangle, sampling bilinearly.
/// `None` when the corners do not define a solvable homography.
pub fn correct_perspective(img: &DynamicImage, quad: &Quadrilateral) -> Option<DynamicImage> {
    let (projection, width, height) = perspective_projection(quad)?;
    let source = img.to_rgb8();
    let mut out = RgbImage::new(width, height);
    warp_into(&source, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
    Some(DynamicImage::ImageRgb8(out))
}

fn draw_contours(img: &DynamicImage, contours: &[Vec<Point<i32>>]) -> DynamicImage {
    let mut overlay = img.to_rgb8();
    let green = Rgb([0, 255, 0]);
    for contour in contours {
        let Some(last) = contour.last() else { continue };
        let mut prev = (last.x as f32, last.y as f32);
        for p in contour {
            let next = (p.x as f32, p.y as f32);
            draw_line_segment_mut(&mut overlay, prev, next, green);
            prev = next;
        }
    }
    DynamicImage::ImageRgb8(overlay)
}

fn encode_as_png(img: &DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
