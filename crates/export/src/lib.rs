pub mod csv;
pub mod text;

pub use crate::csv::{read_records, save_records, write_records, ExportError, CSV_HEADER};
pub use crate::text::{format_lines, save_lines_text, write_lines_text};
