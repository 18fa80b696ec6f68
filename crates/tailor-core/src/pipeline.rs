use uuid::Uuid;

use crate::collect::BatchCollector;
use crate::error::AppError;
use crate::models::RawListing;
use crate::normalize::Normalizer;
use crate::report::{PipelineEvent, PipelineReporter};
use crate::table::ListingTable;
use crate::traits::{CardParser, Fetcher, Sink, SinkReceipt};
use crate::validate::{ValidationReport, repair, validate};

/// Placeholder for a sink slot that was never filled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn write(&self, table: &ListingTable) -> Result<SinkReceipt, AppError> {
        Ok(SinkReceipt {
            rows: table.len(),
            destination: "nowhere".into(),
        })
    }
}

/// Outcome of one non-fatal sink.
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: &'static str,
    pub result: Result<SinkReceipt, AppError>,
}

impl SinkOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a finished run did.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub normalized_rows: usize,
    pub validation: ValidationReport,
    /// Whether `repair` had to run after the first validation.
    pub repaired: bool,
    /// Receipt of the mandatory file sink.
    pub file: SinkReceipt,
    /// Optional sinks, in the order they were attempted. Empty when
    /// validation still failed after repair.
    pub sinks: Vec<SinkOutcome>,
}

impl RunSummary {
    pub fn fully_loaded(&self) -> bool {
        self.validation.is_valid() && self.sinks.iter().all(SinkOutcome::succeeded)
    }
}

/// Linear harvest -> normalize -> validate -> load pipeline.
///
/// The file sink is mandatory and fatal on failure; the spreadsheet and
/// database slots are optional and their failures are only reported.
pub struct EtlPipeline<F, P, C, G = NullSink, D = NullSink>
where
    F: Fetcher,
    P: CardParser,
    C: Sink,
    G: Sink,
    D: Sink,
{
    collector: BatchCollector<F, P>,
    normalizer: Normalizer,
    file_sink: C,
    sheet_sink: Option<G>,
    db_sink: Option<D>,
}

impl<F, P, C> EtlPipeline<F, P, C>
where
    F: Fetcher,
    P: CardParser,
    C: Sink,
{
    pub fn new(collector: BatchCollector<F, P>, normalizer: Normalizer, file_sink: C) -> Self {
        Self {
            collector,
            normalizer,
            file_sink,
            sheet_sink: None,
            db_sink: None,
        }
    }
}

impl<F, P, C, G, D> EtlPipeline<F, P, C, G, D>
where
    F: Fetcher,
    P: CardParser,
    C: Sink,
    G: Sink,
    D: Sink,
{
    pub fn with_sheet_sink<G2: Sink>(self, sink: G2) -> EtlPipeline<F, P, C, G2, D> {
        EtlPipeline {
            collector: self.collector,
            normalizer: self.normalizer,
            file_sink: self.file_sink,
            sheet_sink: Some(sink),
            db_sink: self.db_sink,
        }
    }

    pub fn with_db_sink<D2: Sink>(self, sink: D2) -> EtlPipeline<F, P, C, G, D2> {
        EtlPipeline {
            collector: self.collector,
            normalizer: self.normalizer,
            file_sink: self.file_sink,
            sheet_sink: self.sheet_sink,
            db_sink: Some(sink),
        }
    }

    /// Fill both optional slots at once. `None` leaves a slot empty and the
    /// sink is skipped.
    pub fn with_optional_sinks<G2: Sink, D2: Sink>(
        self,
        sheet_sink: Option<G2>,
        db_sink: Option<D2>,
    ) -> EtlPipeline<F, P, C, G2, D2> {
        EtlPipeline {
            collector: self.collector,
            normalizer: self.normalizer,
            file_sink: self.file_sink,
            sheet_sink,
            db_sink,
        }
    }

    /// Run the extract stage only.
    pub async fn harvest<R: PipelineReporter>(
        &self,
        reporter: &R,
    ) -> Result<Vec<RawListing>, AppError> {
        self.collector.collect(reporter).await
    }

    /// Run the whole pipeline.
    pub async fn run<R: PipelineReporter>(&self, reporter: &R) -> Result<RunSummary, AppError> {
        let raw = self.harvest(reporter).await?;
        self.process(&raw, reporter).await
    }

    /// Transform, validate, and load an already-harvested batch.
    ///
    /// 1. Normalize (fatal on failure or when nothing survives)
    /// 2. Validate, repairing once if needed
    /// 3. Write the file sink (fatal on failure)
    /// 4. Write the optional sinks, unless validation still fails
    pub async fn process<R: PipelineReporter>(
        &self,
        raw: &[RawListing],
        reporter: &R,
    ) -> Result<RunSummary, AppError> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, raw_rows = raw.len(), "Processing batch");

        // 1. Normalize
        let table = self.normalizer.normalize(raw, reporter)?;
        if table.is_empty() {
            return Err(AppError::TransformFailed(
                "no listings survived normalization".into(),
            ));
        }

        // 2. Validate (+ repair)
        let mut validation = validate(&table, reporter);
        let mut repaired = false;
        let table = if validation.is_valid() {
            table
        } else {
            tracing::warn!(%run_id, "Validation failed, attempting repair");
            let fixed = repair(table);
            validation = validate(&fixed, reporter);
            repaired = true;
            fixed
        };

        // 3. Mandatory file sink
        let file = match self.file_sink.write(&table).await {
            Ok(receipt) => {
                report_sink(reporter, self.file_sink.name(), Ok(&receipt));
                receipt
            }
            Err(e) => {
                report_sink(reporter, self.file_sink.name(), Err(&e));
                return Err(e);
            }
        };

        // 4. Optional sinks
        let mut sinks = Vec::new();
        if validation.is_valid() {
            if let Some(sink) = &self.sheet_sink {
                sinks.push(write_optional(sink, &table, reporter).await);
            }
            if let Some(sink) = &self.db_sink {
                sinks.push(write_optional(sink, &table, reporter).await);
            }
        } else {
            tracing::warn!(%run_id, "Validation still failing after repair, only the file sink was written");
        }

        Ok(RunSummary {
            run_id,
            normalized_rows: table.len(),
            validation,
            repaired,
            file,
            sinks,
        })
    }
}

async fn write_optional<S: Sink, R: PipelineReporter>(
    sink: &S,
    table: &ListingTable,
    reporter: &R,
) -> SinkOutcome {
    let result = sink.write(table).await;
    report_sink(reporter, sink.name(), result.as_ref());
    SinkOutcome {
        sink: sink.name(),
        result,
    }
}

fn report_sink<R: PipelineReporter>(
    reporter: &R,
    sink: &'static str,
    result: Result<&SinkReceipt, &AppError>,
) {
    match result {
        Ok(receipt) => reporter.report(PipelineEvent::SinkFinished {
            sink,
            rows: Some(receipt.rows),
            error: None,
        }),
        Err(e) => {
            let error = e.to_string();
            reporter.report(PipelineEvent::SinkFinished {
                sink,
                rows: None,
                error: Some(&error),
            });
        }
    }
}
