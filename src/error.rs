use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid barcode: {0:?}")]
    InvalidBarcode(String),

    #[error("duplicated barcodes in input: {0:?}")]
    DuplicateBarcodes(Vec<String>),

    #[error("metadata API request failed: {0}")]
    ApiHttp(String),

    #[error("metadata API request timed out: {0}")]
    ApiTimeout(String),

    #[error("metadata API returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("metadata API returned an undecodable payload: {0}")]
    ApiPayload(String),

    #[error(
        "column name collision in template {template_id}, question {question_id}: \
         choices {choices:?} all reduce to {column}"
    )]
    #[diagnostic(help("rename the choices so they differ in letters, digits or underscores"))]
    ColumnNameCollision {
        template_id: u32,
        question_id: String,
        column: String,
        choices: Vec<String>,
    },

    #[error("no metadata was obtained")]
    EmptyResult,

    #[error("pulldown cancelled")]
    Cancelled,

    #[error("missing config file kira-sm.json in current directory")]
    #[diagnostic(help("pass --config PATH or --base-url URL"))]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("column {column:?} not found in {path}")]
    MissingColumn { column: String, path: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl KiraError {
    pub fn api_label(&self) -> String {
        match self {
            KiraError::ApiStatus { status, .. } => status.to_string(),
            KiraError::ApiTimeout(_) => "timeout".to_string(),
            KiraError::ApiPayload(_) => "invalid payload".to_string(),
            _ => "request failed".to_string(),
        }
    }
}
