use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use kira_sample_metadata::api::MetadataClient;
use kira_sample_metadata::constants::MISSING_VALUE;
use kira_sample_metadata::domain::{Barcode, SampleMetadata, SurveyTemplate, TemplateIds};
use kira_sample_metadata::error::KiraError;
use kira_sample_metadata::output::JsonOutput;
use kira_sample_metadata::pipeline::{CancelToken, Pipeline};
use kira_sample_metadata::report::ReportEntry;

#[derive(Default)]
struct MockApi {
    samples: HashMap<String, Value>,
    templates: HashMap<u32, Value>,
    template_calls: Mutex<Vec<u32>>,
    cancel_after_fetch: Option<CancelToken>,
}

impl MockApi {
    fn with_sample(mut self, barcode: &str, value: Value) -> Self {
        self.samples.insert(barcode.to_string(), value);
        self
    }

    fn with_template(mut self, id: u32, value: Value) -> Self {
        self.templates.insert(id, value);
        self
    }

    fn cancelling(mut self, cancel: &CancelToken) -> Self {
        self.cancel_after_fetch = Some(cancel.clone());
        self
    }
}

impl MetadataClient for MockApi {
    fn fetch_sample_surveys(&self, barcode: &Barcode) -> Result<SampleMetadata, KiraError> {
        if let Some(cancel) = &self.cancel_after_fetch {
            cancel.cancel();
        }
        let value = self
            .samples
            .get(barcode.as_str())
            .ok_or_else(|| KiraError::ApiStatus {
                status: 404,
                message: "not found".to_string(),
            })?;
        serde_json::from_value(value.clone()).map_err(|err| KiraError::ApiPayload(err.to_string()))
    }

    fn fetch_survey_template(&self, ids: &TemplateIds) -> Result<SurveyTemplate, KiraError> {
        self.template_calls.lock().unwrap().push(ids.template_id);
        let value = self
            .templates
            .get(&ids.template_id)
            .ok_or_else(|| KiraError::ApiStatus {
                status: 500,
                message: "boom".to_string(),
            })?;
        serde_json::from_value(value.clone()).map_err(|err| KiraError::ApiPayload(err.to_string()))
    }
}

fn primary_template() -> Value {
    json!({"survey_template_text": {"groups": [
        {"fields": [
            {"id": "107", "shortname": "DIET_TYPE", "multi": false, "values": []},
            {"id": "108", "shortname": "ALCOHOL_TYPES", "multi": true,
             "values": ["Beer", "Red wine", "Spirits"]}
        ]},
        {"fields": [
            {"id": "200", "shortname": "PETS", "multi": true, "values": ["Dog", "Cat"]}
        ]}
    ]}})
}

fn sample(barcode: &str, source_type: &str, answers: Value) -> Value {
    json!({
        "sample_barcode": barcode,
        "host_subject_id": format!("hsi-{barcode}"),
        "account": {"id": "acct-1"},
        "source": {"id": "src-1", "source_type": source_type},
        "sample": {"datetime_collected": "2021-03-04 10:00:00", "site": "Stool",
                   "source": {"description": "doorknob"}},
        "survey_answers": answers
    })
}

fn barcodes(values: &[&str]) -> Vec<Barcode> {
    values.iter().map(|value| value.parse().unwrap()).collect()
}

#[test]
fn human_sample_round_trip() {
    let api = MockApi::default()
        .with_template(1, primary_template())
        .with_sample(
            "000001",
            sample(
                "000001",
                "human",
                json!([{"template": 1, "response": {
                    "107": ["DIET_TYPE", "[\"Omnivore\"]"],
                    "108": ["ALCOHOL_TYPES", ["Red wine"]]
                }}]),
            ),
        );
    let pipeline = Pipeline::new(api, 4);
    let result = pipeline.retrieve_metadata(&barcodes(&["000001"]), &CancelToken::new(), &JsonOutput);

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let table = &result.table;
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.cell("000001", "DIET_TYPE"), Some("Omnivore"));
    assert_eq!(table.cell("000001", "ALCOHOL_TYPES_Red_wine"), Some("true"));
    assert_eq!(table.cell("000001", "ALCOHOL_TYPES_Beer"), Some("false"));
    assert_eq!(table.cell("000001", "ALCOHOL_TYPES_Spirits"), Some("false"));
    assert_eq!(table.cell("000001", "PETS_Dog"), Some("false"));
    assert_eq!(table.cell("000001", "HOST_SUBJECT_ID"), Some("hsi-000001"));
    assert_eq!(table.cell("000001", "SAMPLE_TYPE"), Some("Stool"));
}

#[test]
fn every_fetch_failing_is_terminal() {
    let pipeline = Pipeline::new(MockApi::default(), 2);
    let result =
        pipeline.retrieve_metadata(&barcodes(&["a1", "a2", "a3"]), &CancelToken::new(), &JsonOutput);

    assert!(result.table.is_empty());
    assert!(!result.cancelled);
    assert_eq!(result.errors.len(), 4);
    assert!(result.errors.is_terminal());
    for (entry, barcode) in result.errors.entries().iter().zip(["a1", "a2", "a3"]) {
        assert_eq!(
            entry,
            &ReportEntry::Sample {
                barcode: barcode.to_string(),
                error: "404 from api".to_string(),
            }
        );
    }
    assert_eq!(result.errors.entries()[3].error(), "No metadata was obtained");
}

#[test]
fn duplicates_reported_and_fetched_once() {
    let api = MockApi::default()
        .with_sample("b1", sample("b1", "animal", json!([])))
        .with_sample("b2", sample("b2", "animal", json!([])));
    let pipeline = Pipeline::new(api, 2);
    let result = pipeline.retrieve_metadata(
        &barcodes(&["b1", "b2", "b1", "b1"]),
        &CancelToken::new(),
        &JsonOutput,
    );

    assert_eq!(
        result.errors.entries(),
        &[ReportEntry::Duplicates {
            barcode: vec!["b1".to_string()],
            error: "Duplicated barcodes in input".to_string(),
        }]
    );
    assert_eq!(
        result.table.sample_names().collect::<Vec<_>>(),
        vec!["b1", "b2"]
    );
    assert_eq!(result.table.cell("b2", "HOST_SUBJECT_ID"), Some("hsi-b2"));
}

#[test]
fn templates_fetched_once_and_failures_isolated() {
    let answers = json!([
        {"template": 1, "response": {"108": ["ALCOHOL_TYPES", ["Beer"]]}},
        {"template": 9, "response": {"1": ["SURF_FREQ", "Daily"]}},
        {"template": 10001, "response": {"1": ["VIOSCREEN", "done"]}}
    ]);
    let api = MockApi::default()
        .with_template(1, primary_template())
        .with_sample("c1", sample("c1", "human", answers.clone()))
        .with_sample("c2", sample("c2", "human", answers));
    let pipeline = Pipeline::new(api, 4);
    let result =
        pipeline.retrieve_metadata(&barcodes(&["c1", "c2"]), &CancelToken::new(), &JsonOutput);

    assert_eq!(result.errors.len(), 1);
    let value = serde_json::to_value(&result.errors).unwrap();
    assert_eq!(
        value[0],
        json!({"ids": {"account_id": "acct-1", "source_id": "src-1", "template_id": 9},
               "error": "500 from api"})
    );
    assert_eq!(result.table.row_count(), 2);
    assert_eq!(result.table.cell("c1", "ALCOHOL_TYPES_Beer"), Some("true"));
    assert_eq!(result.table.cell("c2", "SURF_FREQ"), Some("Daily"));
    assert_eq!(result.table.cell("c2", "VIOSCREEN"), Some("done"));
}

#[test]
fn template_requested_once_per_batch() {
    let api = MockApi::default()
        .with_template(1, primary_template())
        .with_sample("d1", sample("d1", "human", json!([{"template": 1, "response": {}}])))
        .with_sample("d2", sample("d2", "human", json!([{"template": 1, "response": {}}])))
        .with_sample("d3", sample("d3", "human", json!([{"template": 1, "response": {}}])));
    let pipeline = Pipeline::new(&api, 4);
    let result = pipeline.retrieve_metadata(
        &barcodes(&["d1", "d2", "d3"]),
        &CancelToken::new(),
        &JsonOutput,
    );

    assert!(result.errors.is_empty());
    assert_eq!(result.table.cell("d1", "PETS_Cat"), Some("false"));
    assert_eq!(*api.template_calls.lock().unwrap(), vec![1]);
}

#[test]
fn private_fields_redacted_and_missing_filled() {
    let api = MockApi::default()
        .with_sample(
            "e1",
            sample(
                "e1",
                "animal",
                json!([{"template": 4, "response": {
                    "1": ["ZIP_CODE", "92093"],
                    "2": ["pm_diet", "secret"],
                    "3": ["FAVORITE_FOOD", "[\"\"]"]
                }}]),
            ),
        )
        .with_sample("e2", sample("e2", "other", json!([])))
        .with_template(4, json!({"survey_template_text": {"groups": []}}));
    let pipeline = Pipeline::new(api, 1);
    let result =
        pipeline.retrieve_metadata(&barcodes(&["e1", "e2"]), &CancelToken::new(), &JsonOutput);

    assert!(!result.table.has_column("ZIP_CODE"));
    assert!(!result.table.has_column("pm_diet"));
    assert_eq!(result.table.cell("e1", "FAVORITE_FOOD"), Some(MISSING_VALUE));
    assert_eq!(result.table.cell("e2", "FAVORITE_FOOD"), Some(MISSING_VALUE));
}

#[test]
fn colliding_template_field_is_reported() {
    let template = json!({"survey_template_text": {"groups": [{"fields": [
        {"id": "blood", "shortname": "BLOOD_TYPE", "multi": true, "values": ["A+", "A-"]}
    ]}]}});
    let api = MockApi::default().with_template(3, template).with_sample(
        "f1",
        sample(
            "f1",
            "human",
            json!([{"template": 3, "response": {"blood": ["BLOOD_TYPE", ["A+"]]}}]),
        ),
    );
    let pipeline = Pipeline::new(api, 2);
    let result = pipeline.retrieve_metadata(&barcodes(&["f1"]), &CancelToken::new(), &JsonOutput);

    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        &result.errors.entries()[0],
        ReportEntry::Collision { template: 3, question, .. } if question == "blood"
    ));
    assert!(!result.table.has_column("BLOOD_TYPE_A"));
    assert!(!result.table.has_column("BLOOD_TYPE"));
    assert_eq!(result.table.row_count(), 1);
}

#[test]
fn cancelled_before_start_keeps_report() {
    let pipeline = Pipeline::new(MockApi::default(), 2);
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = pipeline.retrieve_metadata(&barcodes(&["g1", "g1"]), &cancel, &JsonOutput);

    assert!(result.cancelled);
    assert!(result.table.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(!result.errors.is_terminal());
}

#[test]
fn cancelled_during_fetch_keeps_stage_errors() {
    let cancel = CancelToken::new();
    let api = MockApi::default()
        .with_sample("h2", sample("h2", "animal", json!([])))
        .cancelling(&cancel);
    let pipeline = Pipeline::new(api, 1);
    let result = pipeline.retrieve_metadata(&barcodes(&["h1", "h2"]), &cancel, &JsonOutput);

    assert!(result.cancelled);
    assert!(result.table.is_empty());
    assert_eq!(
        result.errors.entries(),
        &[ReportEntry::Sample {
            barcode: "h1".to_string(),
            error: "404 from api".to_string(),
        }]
    );
    assert!(!result.errors.is_terminal());
}

#[test]
fn failed_template_drops_list_answers() {
    let api = MockApi::default().with_sample(
        "i1",
        sample(
            "i1",
            "animal",
            json!([{"template": 1, "response": {
                "107": ["DIET_TYPE", "[\"Vegan\"]"],
                "108": ["ALCOHOL_TYPES", ["Beer", "Red wine"]]
            }}]),
        ),
    );
    let pipeline = Pipeline::new(api, 2);
    let result = pipeline.retrieve_metadata(&barcodes(&["i1"]), &CancelToken::new(), &JsonOutput);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors.entries()[0].error(), "500 from api");
    assert_eq!(
        result.table.columns().collect::<Vec<_>>(),
        vec!["HOST_SUBJECT_ID", "COLLECTION_TIMESTAMP", "DIET_TYPE"]
    );
    assert_eq!(result.table.cell("i1", "DIET_TYPE"), Some("Vegan"));
}

#[test]
fn payload_for_another_barcode_is_rejected() {
    let api = MockApi::default()
        .with_sample("j1", sample("j9", "animal", json!([])))
        .with_sample("j2", sample("j2", "animal", json!([])));
    let pipeline = Pipeline::new(api, 2);
    let result =
        pipeline.retrieve_metadata(&barcodes(&["j1", "j2"]), &CancelToken::new(), &JsonOutput);

    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        &result.errors.entries()[0],
        ReportEntry::Sample { barcode, error } if barcode == "j1" && error.contains("j9")
    ));
    assert_eq!(result.table.sample_names().collect::<Vec<_>>(), vec!["j2"]);
}
