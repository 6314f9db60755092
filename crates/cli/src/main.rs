use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tillscan_core::{PipelineConfig, WordAnnotation};
use tillscan_ocr::{MockDetector, ReceiptPipeline, TextDetector};
use tracing_subscriber::EnvFilter;

/// Extract item, quantity and total from a photographed receipt.
#[derive(Debug, Parser)]
#[command(name = "tillscan", version)]
struct Cli {
    /// Receipt image (JPEG, PNG, BMP, …)
    image: PathBuf,

    /// Where to write the `Item,Quantity,Total` rows
    #[arg(short, long, default_value = "sales_data.csv")]
    output: PathBuf,

    /// Also write the reconstructed text lines here
    #[arg(long)]
    text_output: Option<PathBuf>,

    /// TOML file overriding preprocessing and line grouping settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save grayscale, binarized, contour and corrected images here
    #[arg(long)]
    diagnostics_dir: Option<PathBuf>,

    /// Use a saved detector response (JSON array of annotations) instead of
    /// calling the text detection service
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Google Cloud Vision API key
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Text detection request timeout
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let detector = build_detector(cli)?;
    let mut pipeline = ReceiptPipeline::new(detector, &config);
    if let Some(dir) = &cli.diagnostics_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        pipeline = pipeline.with_diagnostics(dir);
    }

    let result = pipeline
        .process_file(&cli.image)
        .with_context(|| format!("Failed to process {}", cli.image.display()))?;

    tillscan_export::save_records(&cli.output, &result.records)?;
    if let Some(path) = &cli.text_output {
        tillscan_export::save_lines_text(path, &result.lines)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    for record in &result.records {
        println!("{record}");
    }
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn TextDetector>> {
    if let Some(path) = &cli.annotations {
        return Ok(Box::new(MockDetector::new(load_annotations(path)?)));
    }

    #[cfg(feature = "vision")]
    {
        let Some(key) = cli.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            bail!("GOOGLE_VISION_API_KEY is not set (or pass --api-key / --annotations)");
        };
        let timeout = std::time::Duration::from_secs(cli.timeout_secs);
        Ok(Box::new(tillscan_ocr::VisionDetector::new(key, timeout)?))
    }

    #[cfg(not(feature = "vision"))]
    {
        let _ = (&cli.api_key, cli.timeout_secs);
        bail!("No text detector available: pass --annotations or build with the `vision` feature")
    }
}

fn load_annotations(path: &Path) -> Result<Vec<WordAnnotation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read annotations {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse annotations {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn image_path_is_required() {
        let err = Cli::try_parse_from(["tillscan"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["tillscan", "receipt.jpg"]).unwrap();
        assert_eq!(cli.image, PathBuf::from("receipt.jpg"));
        assert_eq!(cli.output, PathBuf::from("sales_data.csv"));
        assert!(cli.text_output.is_none());
        assert_eq!(cli.timeout_secs, 30);
    }

    #[test]
    fn help_is_not_an_error_exit() {
        let err = Cli::try_parse_from(["tillscan", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
    }

    #[test]
    fn annotations_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        let words = vec![
            WordAnnotation::from_rect("Milk 2 3.50", 0, 0, 300, 14),
            WordAnnotation::from_rect("Milk", 0, 0, 40, 14),
        ];
        std::fs::write(&path, serde_json::to_string(&words).unwrap()).unwrap();
        assert_eq!(load_annotations(&path).unwrap(), words);
    }

    #[test]
    fn run_with_saved_annotations_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("receipt.png");
        let annotations = dir.path().join("annotations.json");
        let output = dir.path().join("sales.csv");
        let text = dir.path().join("lines.txt");

        std::fs::write(&image, receipt_png()).unwrap();
        let words = vec![
            WordAnnotation::from_rect("Milk 2 3.50", 0, 0, 300, 14),
            WordAnnotation::from_rect("Milk", 10, 40, 40, 12),
            WordAnnotation::from_rect("2", 200, 42, 8, 12),
            WordAnnotation::from_rect("3.50", 260, 41, 30, 12),
        ];
        std::fs::write(&annotations, serde_json::to_string(&words).unwrap()).unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("tillscan"),
            image.as_os_str(),
            OsStr::new("--annotations"),
            annotations.as_os_str(),
            OsStr::new("--output"),
            output.as_os_str(),
            OsStr::new("--text-output"),
            text.as_os_str(),
        ])
        .unwrap();
        run(&cli).unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Item,Quantity,Total\nMilk,2,3.50\n");
        assert_eq!(std::fs::read_to_string(&text).unwrap(), "Milk 2 3.50\n");
    }

    #[test]
    fn unreadable_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let annotations = dir.path().join("annotations.json");
        std::fs::write(&annotations, "[]").unwrap();
        let cli = Cli {
            image: dir.path().join("missing.jpg"),
            output: dir.path().join("out.csv"),
            text_output: None,
            config: None,
            diagnostics_dir: None,
            annotations: Some(annotations),
            api_key: None,
            timeout_secs: 30,
        };
        assert!(run(&cli).is_err());
        assert!(!dir.path().join("out.csv").exists());
    }

    fn receipt_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(16, 16, image::Luma([200u8]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }
}
