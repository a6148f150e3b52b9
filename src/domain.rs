use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Barcode(String);

impl Barcode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Barcode {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && !matches!(normalized, "." | "..")
            && !normalized.contains('/')
            && !normalized.chars().any(|ch| ch.is_whitespace());
        if !is_valid {
            return Err(KiraError::InvalidBarcode(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

pub type TemplateId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Human,
    Animal,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub source_type: SourceType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SampleSource {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleDetail {
    #[serde(default)]
    pub datetime_collected: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub source: Option<SampleSource>,
}

/// One submitted answer. Free text usually arrives wrapped as `["..."]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Choices(Vec<String>),
    Scalar(Value),
}

impl Answer {
    pub fn to_text(&self) -> String {
        match self {
            Answer::Text(text) => strip_list_wrapper(text).to_string(),
            Answer::Choices(choices) => choices
                .iter()
                .map(|choice| strip_list_wrapper(choice))
                .collect::<Vec<_>>()
                .join(", "),
            Answer::Scalar(Value::Null) => String::new(),
            Answer::Scalar(value) => value.to_string(),
        }
    }
}

pub fn strip_list_wrapper(value: &str) -> &str {
    value.trim_matches(|ch| matches!(ch, '[' | ']' | '"'))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionResponse(pub String, pub Answer);

impl QuestionResponse {
    pub fn shortname(&self) -> &str {
        &self.0
    }

    pub fn answer(&self) -> &Answer {
        &self.1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveySubmission {
    pub template: TemplateId,
    #[serde(default)]
    pub response: IndexMap<String, QuestionResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleMetadata {
    pub sample_barcode: String,
    #[serde(default)]
    pub host_subject_id: Option<String>,
    pub account: AccountRef,
    pub source: SourceRef,
    pub sample: SampleDetail,
    #[serde(default)]
    pub survey_answers: Vec<SurveySubmission>,
}

impl SampleMetadata {
    pub fn record_kind(&self) -> RecordKind {
        match self.source.source_type {
            SourceType::Human => RecordKind::Human {
                site: self.sample.site.clone().unwrap_or_default(),
            },
            SourceType::Animal => RecordKind::Animal {
                site: self.sample.site.clone().unwrap_or_default(),
            },
            SourceType::Other => RecordKind::Other {
                description: self
                    .sample
                    .source
                    .as_ref()
                    .and_then(|source| source.description.clone())
                    .unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Human { site: String },
    Animal { site: String },
    Other { description: String },
}

impl RecordKind {
    pub fn sample_type(&self) -> &str {
        match self {
            RecordKind::Human { site } | RecordKind::Animal { site } => site,
            RecordKind::Other { description } => description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateField {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub shortname: String,
    #[serde(default)]
    pub multi: bool,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateGroup {
    #[serde(default)]
    pub fields: Vec<TemplateField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateText {
    #[serde(default)]
    pub groups: Vec<TemplateGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyTemplate {
    pub survey_template_text: TemplateText,
}

impl SurveyTemplate {
    pub fn fields(&self) -> impl Iterator<Item = &TemplateField> {
        self.survey_template_text
            .groups
            .iter()
            .flat_map(|group| group.fields.iter())
    }

    pub fn multiselect_fields(&self) -> impl Iterator<Item = &TemplateField> {
        self.fields().filter(|field| field.multi)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateIds {
    pub account_id: String,
    pub source_id: String,
    pub template_id: TemplateId,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_barcode_trims() {
        let barcode: Barcode = "  000004216 ".parse().unwrap();
        assert_eq!(barcode.as_str(), "000004216");
    }

    #[test]
    fn parse_barcode_invalid() {
        assert_matches!("   ".parse::<Barcode>(), Err(KiraError::InvalidBarcode(_)));
        assert_matches!("a/b".parse::<Barcode>(), Err(KiraError::InvalidBarcode(_)));
        assert_matches!("a b".parse::<Barcode>(), Err(KiraError::InvalidBarcode(_)));
        assert_matches!("..".parse::<Barcode>(), Err(KiraError::InvalidBarcode(_)));
        assert_matches!(".".parse::<Barcode>(), Err(KiraError::InvalidBarcode(_)));
        assert!("a..b".parse::<Barcode>().is_ok());
    }

    #[test]
    fn strip_wrapper_from_free_text() {
        assert_eq!(strip_list_wrapper(r#"["foo"]"#), "foo");
        assert_eq!(strip_list_wrapper(r#"[""]"#), "");
        assert_eq!(strip_list_wrapper("plain"), "plain");
        assert_eq!(strip_list_wrapper(r#"say "hi" there"#), r#"say "hi" there"#);
    }

    #[test]
    fn unknown_source_type_is_other() {
        let source: SourceRef =
            serde_json::from_value(json!({"id": 7, "source_type": "environmental"})).unwrap();
        assert_eq!(source.source_type, SourceType::Other);
        assert_eq!(source.id, "7");
    }

    #[test]
    fn answer_variants() {
        let text: Answer = serde_json::from_value(json!("[\"Yes\"]")).unwrap();
        assert_eq!(text.to_text(), "Yes");
        let choices: Answer = serde_json::from_value(json!(["Beer", "Wine"])).unwrap();
        assert_matches!(choices, Answer::Choices(ref list) if list.len() == 2);
        let number: Answer = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(number.to_text(), "42");
        let null: Answer = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(null.to_text(), "");
    }

    #[test]
    fn record_kind_dispatch() {
        let raw = json!({
            "sample_barcode": "000001",
            "host_subject_id": "hsi",
            "account": {"id": "acct"},
            "source": {"id": "src", "source_type": "other"},
            "sample": {"datetime_collected": null, "site": null,
                       "source": {"description": "kitchen sponge"}},
            "survey_answers": []
        });
        let metadata: SampleMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(
            metadata.record_kind(),
            RecordKind::Other {
                description: "kitchen sponge".to_string()
            }
        );
        assert_eq!(metadata.record_kind().sample_type(), "kitchen sponge");
    }
}
