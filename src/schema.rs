use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::constants::is_ignored_template;
use crate::domain::{SampleMetadata, SurveyTemplate, TemplateField, TemplateId, TemplateIds};
use crate::error::KiraError;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new("[^0-9a-zA-Z_]+").unwrap());

pub type TemplateRegistry = HashMap<TemplateId, SurveyTemplate>;

pub fn build_column_name(shortname: &str, choice: &str) -> String {
    let replaced = choice.replace([' ', '-'], "_");
    let reduced = UNSAFE_CHARS.replace_all(&replaced, "");
    format!("{shortname}_{reduced}")
}

pub fn plan_template_fetches<'a>(
    samples: impl IntoIterator<Item = &'a SampleMetadata>,
) -> IndexMap<TemplateId, TemplateIds> {
    let mut plan = IndexMap::new();
    for sample in samples {
        for submission in &sample.survey_answers {
            if is_ignored_template(submission.template) {
                continue;
            }
            plan.entry(submission.template)
                .or_insert_with(|| TemplateIds {
                    account_id: sample.account.id.clone(),
                    source_id: sample.source.id.clone(),
                    template_id: submission.template,
                });
        }
    }
    plan
}

#[derive(Debug, Clone, Default)]
pub struct MultiselectMap {
    columns: HashMap<(TemplateId, String), IndexMap<String, String>>,
    collided: HashSet<(TemplateId, String)>,
    templates: HashSet<TemplateId>,
}

impl MultiselectMap {
    pub fn build(registry: &TemplateRegistry) -> (Self, Vec<KiraError>) {
        let mut map = Self::default();
        let mut errors = Vec::new();

        let mut template_ids = registry.keys().copied().collect::<Vec<_>>();
        template_ids.sort_unstable();

        map.templates.extend(template_ids.iter().copied());
        for template_id in template_ids {
            let Some(template) = registry.get(&template_id) else {
                continue;
            };
            for field in template.multiselect_fields() {
                let key = (template_id, field.id.clone());
                match field_columns(template_id, field) {
                    Ok(choices) => {
                        map.columns.insert(key, choices);
                    }
                    Err(err) => {
                        map.collided.insert(key);
                        errors.push(err);
                    }
                }
            }
        }

        (map, errors)
    }

    pub fn has_template(&self, template_id: TemplateId) -> bool {
        self.templates.contains(&template_id)
    }

    pub fn get(
        &self,
        template_id: TemplateId,
        question_id: &str,
    ) -> Option<&IndexMap<String, String>> {
        self.columns.get(&(template_id, question_id.to_string()))
    }

    pub fn is_collided(&self, template_id: TemplateId, question_id: &str) -> bool {
        self.collided
            .contains(&(template_id, question_id.to_string()))
    }

    pub fn all_columns(&self) -> BTreeSet<&str> {
        self.columns
            .values()
            .flat_map(|choices| choices.values().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn field_columns(
    template_id: TemplateId,
    field: &TemplateField,
) -> Result<IndexMap<String, String>, KiraError> {
    let mut choices = IndexMap::new();
    let mut owners: IndexMap<String, Vec<String>> = IndexMap::new();

    for choice in &field.values {
        if choices.contains_key(choice) {
            continue;
        }
        let column = build_column_name(&field.shortname, choice);
        owners.entry(column.clone()).or_default().push(choice.clone());
        choices.insert(choice.clone(), column);
    }

    if let Some((column, colliding)) = owners.into_iter().find(|(_, owners)| owners.len() > 1) {
        return Err(KiraError::ColumnNameCollision {
            template_id,
            question_id: field.id.clone(),
            column,
            choices: colliding,
        });
    }
    Ok(choices)
}
