use std::fs;

use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};

use crate::domain::Barcode;
use crate::error::KiraError;

pub fn read_barcode_file(path: &Utf8Path) -> Result<Vec<Barcode>, KiraError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))?;
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.parse::<Barcode>())
        .collect()
}

pub fn read_csv_column(path: &Utf8Path, column: &str) -> Result<Vec<Barcode>, KiraError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let csv_error = |err: csv::Error| KiraError::Filesystem(format!("parse {path}: {err}"));

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());
    let idx = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| KiraError::MissingColumn {
            column: column.to_string(),
            path: path.to_string(),
        })?;

    let mut barcodes = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        match record.get(idx) {
            Some(value) if !value.is_empty() => barcodes.push(value.parse::<Barcode>()?),
            _ => {}
        }
    }
    Ok(barcodes)
}
