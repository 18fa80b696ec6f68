use std::future::Future;

use crate::error::AppError;
use crate::models::ScrapedCard;
use crate::table::ListingTable;

/// Fetches raw HTML content from a URL.
///
/// One request per call; implementations must not retry internally.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Pulls listing cards out of a catalog page.
pub trait CardParser: Send + Sync + Clone {
    /// Returns one card per listing container, in document order.
    ///
    /// Missing markup inside a container yields `Scraped::Missing` fields,
    /// never an error. A page without containers yields an empty vec.
    fn parse_cards(&self, html: &str) -> Vec<ScrapedCard>;
}

/// Result of a successful sink write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Rows actually written after pre-write normalization.
    pub rows: usize,
    /// Human-readable destination (path, worksheet, table).
    pub destination: String,
}

/// Persists a normalized listing table to one destination.
///
/// Errors stay inside the sink's boundary as an `AppError`; callers decide
/// whether a failure is fatal.
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    fn write(
        &self,
        table: &ListingTable,
    ) -> impl Future<Output = Result<SinkReceipt, AppError>> + Send;
}
