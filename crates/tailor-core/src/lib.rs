pub mod collect;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod table;
pub mod traits;
pub mod validate;

#[cfg(test)]
pub mod testutil;

pub use collect::{BatchCollector, CollectorConfig, page_url};
pub use error::AppError;
pub use models::{NormalizedListing, RawField, RawListing, RawRecord, Scraped, ScrapedCard};
pub use normalize::{NormalizeConfig, Normalizer};
pub use pipeline::{EtlPipeline, NullSink, RunSummary, SinkOutcome};
pub use report::{PipelineEvent, PipelineReporter, SilentReporter, TracingReporter};
pub use table::{Column, ColumnType, DType, ListingTable, Row, Value};
pub use traits::{CardParser, Fetcher, Sink, SinkReceipt};
pub use validate::{ValidationReport, repair, validate};
