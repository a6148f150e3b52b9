use std::fs::File;
use std::io::{self, BufWriter, Write};

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::error::KiraError;
use crate::pipeline::{ProgressEvent, ProgressSink, PulldownResult};
use crate::report::ErrorReport;

#[derive(Debug, Serialize)]
pub struct ReportEnvelope<'a> {
    pub generated_at: String,
    pub tool: String,
    pub cancelled: bool,
    pub rows: usize,
    pub columns: usize,
    pub errors: &'a ErrorReport,
}

impl<'a> ReportEnvelope<'a> {
    pub fn new(result: &'a PulldownResult) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("kira-sm/{}", env!("CARGO_PKG_VERSION")),
            cancelled: result.cancelled,
            rows: result.table.row_count(),
            columns: result.table.column_count(),
            errors: &result.errors,
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_result(result: &PulldownResult) -> io::Result<()> {
        Self::write_json(result, io::stdout())
    }

    pub fn print_report(result: &PulldownResult) -> io::Result<()> {
        Self::write_json(&ReportEnvelope::new(result), io::stderr())
    }

    fn write_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub fn write_table(result: &PulldownResult, path: Option<&Utf8Path>) -> Result<(), KiraError> {
    match path {
        Some(path) => {
            let file = File::create(path.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {path}: {err}")))?;
            result
                .table
                .write_tsv(BufWriter::new(file))
                .map_err(|err| KiraError::Filesystem(format!("write {path}: {err}")))
        }
        None => result
            .table
            .write_tsv(io::stdout().lock())
            .map_err(|err| KiraError::Filesystem(err.to_string())),
    }
}

pub fn write_report(result: &PulldownResult, path: &Utf8Path) -> Result<(), KiraError> {
    let bytes = serde_json::to_vec_pretty(&ReportEnvelope::new(result))
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    std::fs::write(path.as_std_path(), bytes)
        .map_err(|err| KiraError::Filesystem(format!("write {path}: {err}")))
}
