use crate::table::{Column, ColumnType, DType};

/// Events emitted by the pipeline stages for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    HarvestStarted {
        start_page: u32,
        end_page: u32,
    },
    PageFetched {
        page: u32,
        listings: usize,
    },
    PageEmpty {
        page: u32,
    },
    PageFailed {
        page: u32,
        error: &'a str,
    },
    HarvestCompleted {
        pages_attempted: u32,
        pages_succeeded: u32,
        listings: usize,
    },
    PassCompleted {
        pass: &'static str,
        rows: usize,
    },
    NullValues {
        column: Column,
        count: usize,
    },
    DuplicateRows {
        count: usize,
    },
    TypeMismatch {
        column: Column,
        expected: DType,
        actual: ColumnType,
    },
    ValidationFinished {
        passed: bool,
    },
    SinkFinished {
        sink: &'static str,
        rows: Option<usize>,
        error: Option<&'a str>,
    },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl PipelineReporter for SilentReporter {}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::HarvestStarted {
                start_page,
                end_page,
            } => {
                tracing::info!(%start_page, %end_page, "Harvest started");
            }
            PipelineEvent::PageFetched { page, listings } => {
                tracing::info!(%page, %listings, "Page scraped");
            }
            PipelineEvent::PageEmpty { page } => {
                tracing::info!(%page, "No listings found on page");
            }
            PipelineEvent::PageFailed { page, error } => {
                tracing::warn!(%page, %error, "Page fetch failed");
            }
            PipelineEvent::HarvestCompleted {
                pages_attempted,
                pages_succeeded,
                listings,
            } => {
                tracing::info!(
                    %pages_attempted,
                    %pages_succeeded,
                    %listings,
                    "Harvest completed"
                );
            }
            PipelineEvent::PassCompleted { pass, rows } => {
                tracing::debug!(%pass, %rows, "Normalization pass completed");
            }
            PipelineEvent::NullValues { column, count } => {
                tracing::warn!(%column, %count, "Column contains null values");
            }
            PipelineEvent::DuplicateRows { count } => {
                tracing::warn!(%count, "Table contains duplicate rows");
            }
            PipelineEvent::TypeMismatch {
                column,
                expected,
                actual,
            } => {
                tracing::warn!(%column, %expected, %actual, "Column has incorrect data type");
            }
            PipelineEvent::ValidationFinished { passed } => {
                if passed {
                    tracing::info!("Data validation passed");
                } else {
                    tracing::warn!("Data validation failed");
                }
            }
            PipelineEvent::SinkFinished { sink, rows, error } => match error {
                None => tracing::info!(%sink, ?rows, "Sink write succeeded"),
                Some(error) => tracing::warn!(%sink, %error, "Sink write failed"),
            },
        }
    }
}
