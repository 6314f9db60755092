use rust_decimal::Decimal;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tillscan_core::LineItemRecord;
use tracing::info;

pub const CSV_HEADER: [&str; 3] = ["Item", "Quantity", "Total"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] ::csv::Error),
    #[error("Unexpected header: {0}")]
    BadHeader(String),
    #[error("Invalid row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Write records as `Item,Quantity,Total` rows.
///
/// Quantity is written as an integer and Total as a plain decimal with `.`
/// as separator, at the scale it was read with.
pub fn write_records<W: Write>(writer: W, records: &[LineItemRecord]) -> Result<(), ExportError> {
    let mut wtr = ::csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for r in records {
        let quantity = r.quantity.to_string();
        let total = r.total.to_string();
        wtr.write_record([r.item_name.as_str(), quantity.as_str(), total.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_records(path: &Path, records: &[LineItemRecord]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_records(file, records)?;
    info!("Sales data saved to {} ({} rows)", path.display(), records.len());
    Ok(())
}

/// Read back a file produced by [`write_records`].
pub fn read_records<R: Read>(reader: R) -> Result<Vec<LineItemRecord>, ExportError> {
    let mut rdr = ::csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?;
    if headers.iter().ne(CSV_HEADER) {
        return Err(ExportError::BadHeader(headers.iter().collect::<Vec<_>>().join(",")));
    }

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result?;
        let field = |col: usize| record.get(col).unwrap_or_default();

        let quantity = field(1).trim().parse::<u32>().map_err(|e| ExportError::InvalidRow {
            row,
            message: format!("quantity '{}': {e}", field(1)),
        })?;
        let total = Decimal::from_str(field(2).trim()).map_err(|e| ExportError::InvalidRow {
            row,
            message: format!("total '{}': {e}", field(2)),
        })?;

        records.push(LineItemRecord { item_name: field(0).to_string(), quantity, total });
    }

    Ok(records)
}
