use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{
    COLLECTION_TIMESTAMP, HOST_SUBJECT_ID, MULTISELECT_SELECTED, human_site_invariants,
    is_ignored_template,
};
use crate::domain::{Answer, Barcode, RecordKind, SampleMetadata, TemplateId, strip_list_wrapper};
use crate::report::ReportEntry;
use crate::schema::MultiselectMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedRecord {
    pub barcode: Barcode,
    pub values: IndexMap<String, String>,
}

impl FlattenedRecord {
    fn new(barcode: Barcode) -> Self {
        Self {
            barcode,
            values: IndexMap::new(),
        }
    }

    fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        match self.values.entry(column.into()) {
            Entry::Occupied(entry) => {
                debug!(
                    barcode = %self.barcode,
                    column = entry.key().as_str(),
                    "column already set, keeping first value"
                );
            }
            Entry::Vacant(entry) => {
                entry.insert(value.into());
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

pub fn record_invariants(kind: &RecordKind) -> Vec<(&'static str, &'static str)> {
    match kind {
        RecordKind::Human { site } => human_site_invariants(site).unwrap_or_else(|| {
            warn!(site = site.as_str(), "no invariants known for human sample site");
            Vec::new()
        }),
        RecordKind::Animal { .. } | RecordKind::Other { .. } => Vec::new(),
    }
}

pub fn flatten_sample(
    barcode: &Barcode,
    metadata: &SampleMetadata,
    multiselect: &MultiselectMap,
) -> (FlattenedRecord, Vec<ReportEntry>) {
    let mut record = FlattenedRecord::new(barcode.clone());
    let mut errors = Vec::new();

    record.insert(
        HOST_SUBJECT_ID,
        metadata.host_subject_id.clone().unwrap_or_default(),
    );
    record.insert(
        COLLECTION_TIMESTAMP,
        metadata.sample.datetime_collected.clone().unwrap_or_default(),
    );

    let kind = metadata.record_kind();

    // Some samples carry the same survey twice; only the first counts.
    let mut collected: Vec<TemplateId> = Vec::new();
    for submission in &metadata.survey_answers {
        let template = submission.template;
        if collected.contains(&template) {
            debug!(barcode = %barcode, template, "skipping duplicate survey submission");
            continue;
        }
        collected.push(template);
        // Without the template, list answers cannot be mapped to choice columns.
        let unmapped = !is_ignored_template(template) && !multiselect.has_template(template);

        for (question_id, response) in &submission.response {
            if multiselect.is_collided(template, question_id) {
                continue;
            }
            let Some(columns) = multiselect.get(template, question_id) else {
                if unmapped && matches!(response.answer(), Answer::Choices(_)) {
                    debug!(
                        barcode = %barcode,
                        template,
                        question = question_id.as_str(),
                        "skipping list answer of unavailable template"
                    );
                    continue;
                }
                record.insert(response.shortname(), response.answer().to_text());
                continue;
            };

            for selection in selections(response.answer()) {
                match columns.get(selection) {
                    Some(column) => record.insert(column.as_str(), MULTISELECT_SELECTED),
                    None => {
                        warn!(
                            barcode = %barcode,
                            template,
                            question = question_id.as_str(),
                            selection,
                            "selection not in template choices"
                        );
                        errors.push(ReportEntry::sample_message(
                            barcode,
                            format!(
                                "Unrecognized choice {selection:?} for {} in template {template}",
                                response.shortname()
                            ),
                        ));
                    }
                }
            }
        }
    }

    for (variable, value) in record_invariants(&kind) {
        record.insert(variable, value);
    }

    (record, errors)
}

fn selections(answer: &Answer) -> Vec<&str> {
    match answer {
        Answer::Choices(choices) => choices.iter().map(String::as_str).collect(),
        Answer::Text(text) => {
            let text = strip_list_wrapper(text);
            if text.is_empty() { Vec::new() } else { vec![text] }
        }
        Answer::Scalar(_) => Vec::new(),
    }
}
