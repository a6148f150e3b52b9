use serde::Serialize;

use crate::domain::{Barcode, TemplateIds};
use crate::error::KiraError;

pub const DUPLICATED_BARCODES: &str = "Duplicated barcodes in input";
pub const NO_METADATA: &str = "No metadata was obtained";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Duplicates {
        barcode: Vec<String>,
        error: String,
    },
    Sample {
        barcode: String,
        error: String,
    },
    Template {
        ids: TemplateIds,
        error: String,
    },
    Collision {
        template: u32,
        question: String,
        choices: Vec<String>,
        error: String,
    },
    General {
        error: String,
    },
}

impl ReportEntry {
    pub fn from_error(err: &KiraError) -> Self {
        match err {
            KiraError::DuplicateBarcodes(barcodes) => ReportEntry::Duplicates {
                barcode: barcodes.clone(),
                error: DUPLICATED_BARCODES.to_string(),
            },
            KiraError::ColumnNameCollision {
                template_id,
                question_id,
                choices,
                ..
            } => ReportEntry::Collision {
                template: *template_id,
                question: question_id.clone(),
                choices: choices.clone(),
                error: err.to_string(),
            },
            KiraError::EmptyResult => ReportEntry::General {
                error: NO_METADATA.to_string(),
            },
            other => ReportEntry::General {
                error: other.to_string(),
            },
        }
    }

    pub fn sample_fetch(barcode: &Barcode, err: &KiraError) -> Self {
        ReportEntry::Sample {
            barcode: barcode.as_str().to_string(),
            error: format!("{} from api", err.api_label()),
        }
    }

    pub fn sample_message(barcode: &Barcode, message: impl Into<String>) -> Self {
        ReportEntry::Sample {
            barcode: barcode.as_str().to_string(),
            error: message.into(),
        }
    }

    pub fn template_fetch(ids: TemplateIds, err: &KiraError) -> Self {
        ReportEntry::Template {
            ids,
            error: format!("{} from api", err.api_label()),
        }
    }

    pub fn error(&self) -> &str {
        match self {
            ReportEntry::Duplicates { error, .. }
            | ReportEntry::Sample { error, .. }
            | ReportEntry::Template { error, .. }
            | ReportEntry::Collision { error, .. }
            | ReportEntry::General { error } => error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorReport {
    entries: Vec<ReportEntry>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.entries.iter().any(
            |entry| matches!(entry, ReportEntry::General { error } if error == NO_METADATA),
        )
    }
}

impl Extend<ReportEntry> for ErrorReport {
    fn extend<T: IntoIterator<Item = ReportEntry>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}
