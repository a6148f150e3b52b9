use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::MetadataClient;
use crate::domain::{Barcode, SampleMetadata, SurveyTemplate, TemplateIds};
use crate::duplicates::{find_duplicates, unique_in_order};
use crate::error::KiraError;
use crate::flatten::{FlattenedRecord, flatten_sample};
use crate::report::{ErrorReport, ReportEntry};
use crate::schema::{MultiselectMap, TemplateRegistry, plan_template_fetches};
use crate::table::ResultTable;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PulldownResult {
    pub table: ResultTable,
    pub errors: ErrorReport,
    pub cancelled: bool,
}

impl PulldownResult {
    fn partial(errors: ErrorReport, cancelled: bool) -> Self {
        Self {
            table: ResultTable::default(),
            errors,
            cancelled,
        }
    }
}

pub struct Pipeline<C: MetadataClient> {
    client: C,
    workers: usize,
}

impl<C: MetadataClient> Pipeline<C> {
    pub fn new(client: C, workers: usize) -> Self {
        Self {
            client,
            workers: workers.max(1),
        }
    }

    pub fn retrieve_metadata(
        &self,
        barcodes: &[Barcode],
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
    ) -> PulldownResult {
        let started = Instant::now();
        let mut errors = ErrorReport::new();

        let (dups, entry) = find_duplicates(barcodes);
        if let Some(entry) = entry {
            warn!(count = dups.len(), "duplicated barcodes in input");
            errors.push(entry);
        }
        let unique = unique_in_order(barcodes);

        sink.event(ProgressEvent {
            message: format!("phase=Fetch; requesting {} samples", unique.len()),
            elapsed: Some(started.elapsed()),
        });
        if cancel.is_cancelled() {
            return PulldownResult::partial(errors, true);
        }
        let fetched = self.fetch_samples(&unique, cancel, &mut errors);
        if cancel.is_cancelled() {
            return PulldownResult::partial(errors, true);
        }

        if fetched.is_empty() {
            warn!("no metadata was obtained");
            errors.push(ReportEntry::from_error(&KiraError::EmptyResult));
            return PulldownResult::partial(errors, false);
        }

        let plan = plan_template_fetches(fetched.iter().map(|(_, metadata)| metadata));
        sink.event(ProgressEvent {
            message: format!(
                "phase=Templates; fetched {} samples, requesting {} templates",
                fetched.len(),
                plan.len()
            ),
            elapsed: Some(started.elapsed()),
        });
        let registry = self.fetch_templates(plan.into_values().collect(), cancel, &mut errors);
        if cancel.is_cancelled() {
            return PulldownResult::partial(errors, true);
        }

        let (multiselect, collisions) = MultiselectMap::build(&registry);
        for err in &collisions {
            warn!(error = %err, "multiselect column collision");
            errors.push(ReportEntry::from_error(err));
        }

        sink.event(ProgressEvent {
            message: format!(
                "phase=Flatten; {} multiselect questions mapped",
                multiselect.len()
            ),
            elapsed: Some(started.elapsed()),
        });
        let flattened = run_pool(&fetched, self.workers, cancel, |(barcode, metadata)| {
            flatten_sample(barcode, metadata, &multiselect)
        });
        if cancel.is_cancelled() {
            return PulldownResult::partial(errors, true);
        }

        let mut records: Vec<FlattenedRecord> = Vec::with_capacity(flattened.len());
        for ((barcode, _), outcome) in fetched.iter().zip(flattened) {
            match outcome {
                Some((record, entries)) => {
                    records.push(record);
                    errors.extend(entries);
                }
                None => errors.push(ReportEntry::sample_message(
                    barcode,
                    "flattening worker panicked",
                )),
            }
        }

        sink.event(ProgressEvent {
            message: "phase=Assemble; building table".to_string(),
            elapsed: Some(started.elapsed()),
        });
        let table = ResultTable::assemble(&records, &multiselect);
        info!(
            rows = table.row_count(),
            columns = table.column_count(),
            errors = errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "metadata pulldown complete"
        );

        PulldownResult {
            table,
            errors,
            cancelled: false,
        }
    }

    fn fetch_samples(
        &self,
        barcodes: &[Barcode],
        cancel: &CancelToken,
        errors: &mut ErrorReport,
    ) -> Vec<(Barcode, SampleMetadata)> {
        let outcomes = run_pool(barcodes, self.workers, cancel, |barcode| {
            let start = Instant::now();
            let result = self.client.fetch_sample_surveys(barcode);
            debug!(
                barcode = %barcode,
                latency_ms = start.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "sample fetch"
            );
            result
        });

        let mut fetched = Vec::with_capacity(barcodes.len());
        for (barcode, outcome) in barcodes.iter().zip(outcomes) {
            match outcome {
                Some(Ok(metadata)) if metadata.sample_barcode != barcode.as_str() => {
                    warn!(
                        barcode = %barcode,
                        returned = metadata.sample_barcode.as_str(),
                        "sample payload is for another barcode"
                    );
                    errors.push(ReportEntry::sample_message(
                        barcode,
                        format!(
                            "Response was for barcode {:?}",
                            metadata.sample_barcode
                        ),
                    ));
                }
                Some(Ok(metadata)) => fetched.push((barcode.clone(), metadata)),
                Some(Err(err)) => {
                    warn!(barcode = %barcode, error = %err, "sample fetch failed");
                    errors.push(ReportEntry::sample_fetch(barcode, &err));
                }
                None if cancel.is_cancelled() => {}
                None => errors.push(ReportEntry::sample_message(
                    barcode,
                    "fetch worker panicked",
                )),
            }
        }
        fetched
    }

    fn fetch_templates(
        &self,
        plan: Vec<TemplateIds>,
        cancel: &CancelToken,
        errors: &mut ErrorReport,
    ) -> TemplateRegistry {
        let outcomes = run_pool(&plan, self.workers, cancel, |ids| {
            self.client.fetch_survey_template(ids)
        });

        let mut registry = TemplateRegistry::new();
        for (ids, outcome) in plan.into_iter().zip(outcomes) {
            let result: Result<SurveyTemplate, KiraError> = match outcome {
                Some(result) => result,
                None if cancel.is_cancelled() => continue,
                None => Err(KiraError::ApiHttp("template worker panicked".to_string())),
            };
            match result {
                Ok(template) => {
                    registry.insert(ids.template_id, template);
                }
                Err(err) => {
                    warn!(
                        template_id = ids.template_id,
                        error = %err,
                        "template fetch failed"
                    );
                    errors.push(ReportEntry::template_fetch(ids, &err));
                }
            }
        }
        registry
    }
}

fn run_pool<T, R, F>(items: &[T], workers: usize, cancel: &CancelToken, task: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let mut results: Vec<Option<R>> = Vec::with_capacity(items.len());
    results.resize_with(items.len(), || None);
    if items.is_empty() {
        return results;
    }

    let next = AtomicUsize::new(0);
    let thread_count = workers.min(items.len());
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(thread_count);
        for _ in 0..thread_count {
            handles.push(scope.spawn(|| {
                let mut done = Vec::new();
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(idx) else {
                        break;
                    };
                    done.push((idx, task(item)));
                }
                done
            }));
        }
        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (idx, result) in done {
                        results[idx] = Some(result);
                    }
                }
                Err(_) => warn!("pipeline worker panicked"),
            }
        }
    });
    results
}
