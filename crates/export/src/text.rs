use std::io::Write;
use std::path::Path;
use tillscan_core::LineGroup;
use tracing::info;

/// One line of text per group, tokens separated by single spaces, each line
/// newline-terminated.
pub fn format_lines(lines: &[LineGroup]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.text());
        out.push('\n');
    }
    out
}

pub fn write_lines_text<W: Write>(mut writer: W, lines: &[LineGroup]) -> std::io::Result<()> {
    writer.write_all(format_lines(lines).as_bytes())?;
    writer.flush()
}

pub fn save_lines_text(path: &Path, lines: &[LineGroup]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_lines_text(file, lines)?;
    info!("Formatted text saved to {}", path.display());
    Ok(())
}
