//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{RawField, RawListing, Scraped, ScrapedCard};
use crate::report::{PipelineEvent, PipelineReporter};
use crate::table::ListingTable;
use crate::traits::{CardParser, Fetcher, Sink, SinkReceipt};

/// Raw listing with a fixed capture timestamp.
pub fn raw(
    title: &str,
    price: &str,
    rating: &str,
    colors: &str,
    size: &str,
    gender: &str,
) -> RawListing {
    RawListing::from_texts(
        title,
        price,
        rating,
        colors,
        size,
        gender,
        "2024-01-01T00:00:00Z",
    )
}

/// Fake page body understood by [`MockParser`]: `n` valid cards.
pub fn page_html(cards: usize) -> String {
    format!("cards={cards}")
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns an empty page.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// URLs fetched so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(page_html(0))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Parser for [`page_html`] bodies. Anything else yields no cards.
#[derive(Clone, Copy)]
pub struct MockParser;

impl CardParser for MockParser {
    fn parse_cards(&self, html: &str) -> Vec<ScrapedCard> {
        let count = html
            .strip_prefix("cards=")
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        (0..count)
            .map(|i| ScrapedCard {
                title: Scraped::classify(RawField::Title, format!("Item {i}")),
                price: Scraped::classify(RawField::Price, "$10.00"),
                rating: Scraped::classify(RawField::Rating, "Rating: ⭐ 4.0 / 5"),
                colors: Scraped::classify(RawField::Colors, "2 Colors"),
                size: Scraped::classify(RawField::Size, "Size: M"),
                gender: Scraped::classify(RawField::Gender, "Gender: Men"),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records row counts of successful writes.
#[derive(Clone)]
pub struct MockSink {
    name: &'static str,
    written: Arc<Mutex<Vec<usize>>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockSink {
    pub fn ok(name: &'static str) -> Self {
        Self {
            name,
            written: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Sink whose first write fails with `error`.
    pub fn failing(name: &'static str, error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..Self::ok(name)
        }
    }

    pub fn written_rows(&self) -> Vec<usize> {
        self.written.lock().unwrap().clone()
    }
}

impl Sink for MockSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn write(&self, table: &ListingTable) -> Result<SinkReceipt, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.written.lock().unwrap().push(table.len());
        Ok(SinkReceipt {
            rows: table.len(),
            destination: format!("mock:{}", self.name),
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps a debug rendering of every event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
    passes: Mutex<Vec<(&'static str, usize)>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events whose variant name is `variant`.
    pub fn count(&self, variant: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.strip_prefix(variant)
                    .is_some_and(|rest| rest.starts_with([' ', '{', '(']) || rest.is_empty())
            })
            .count()
    }

    /// Normalization passes as `(name, rows remaining)`.
    pub fn passes(&self) -> Vec<(&'static str, usize)> {
        self.passes.lock().unwrap().clone()
    }
}

impl PipelineReporter for RecordingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        if let PipelineEvent::PassCompleted { pass, rows } = event {
            self.passes.lock().unwrap().push((pass, rows));
        }
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}
