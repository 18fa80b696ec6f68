use std::time::Duration;

use chrono::{SecondsFormat, Utc};

use crate::error::AppError;
use crate::models::RawListing;
use crate::report::{PipelineEvent, PipelineReporter};
use crate::traits::{CardParser, Fetcher};

/// Build the URL of one catalog page: `<base_url>?page=<n>`.
pub fn page_url(base_url: &str, page: u32) -> String {
    format!("{base_url}?page={page}")
}

/// Configuration for a harvest run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub base_url: String,
    pub start_page: u32,
    /// Inclusive.
    pub end_page: u32,
    /// Pause between consecutive page fetches.
    pub page_delay: Duration,
}

impl CollectorConfig {
    pub fn new(base_url: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        Self {
            base_url: base_url.into(),
            start_page,
            end_page,
            page_delay: Duration::from_secs(1),
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Number of pages in the inclusive range, saturating at `u32::MAX`.
    pub fn page_count(&self) -> u32 {
        self.end_page
            .saturating_sub(self.start_page)
            .saturating_add(1)
    }
}

/// Drives fetcher + parser across a page range and accumulates listings.
pub struct BatchCollector<F, P>
where
    F: Fetcher,
    P: CardParser,
{
    fetcher: F,
    parser: P,
    config: CollectorConfig,
}

impl<F, P> BatchCollector<F, P>
where
    F: Fetcher,
    P: CardParser,
{
    pub fn new(fetcher: F, parser: P, config: CollectorConfig) -> Self {
        Self {
            fetcher,
            parser,
            config,
        }
    }

    /// Harvest every page in the configured range.
    ///
    /// Per-page fetch failures are reported and skipped. If no page yields a
    /// listing the whole batch fails with `HarvestFailed`; an empty `Ok` is
    /// never returned.
    pub async fn collect<R: PipelineReporter>(
        &self,
        reporter: &R,
    ) -> Result<Vec<RawListing>, AppError> {
        let CollectorConfig {
            base_url,
            start_page,
            end_page,
            page_delay,
        } = &self.config;

        if start_page > end_page {
            return Err(AppError::ConfigError(format!(
                "start page {start_page} is after end page {end_page}"
            )));
        }

        reporter.report(PipelineEvent::HarvestStarted {
            start_page: *start_page,
            end_page: *end_page,
        });

        let mut listings = Vec::new();
        let mut pages_succeeded = 0u32;

        for page in *start_page..=*end_page {
            if page > *start_page && !page_delay.is_zero() {
                tokio::time::sleep(*page_delay).await;
            }

            let url = page_url(base_url, page);
            tracing::debug!(%page, %url, "Fetching catalog page");

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(PipelineEvent::PageFailed {
                        page,
                        error: &error,
                    });
                    continue;
                }
            };

            let cards = self.parser.parse_cards(&html);
            if cards.is_empty() {
                reporter.report(PipelineEvent::PageEmpty { page });
                continue;
            }

            pages_succeeded += 1;
            reporter.report(PipelineEvent::PageFetched {
                page,
                listings: cards.len(),
            });
            listings.extend(
                cards
                    .into_iter()
                    .map(|card| card.capture(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))),
            );
        }

        let pages_attempted = self.config.page_count();
        reporter.report(PipelineEvent::HarvestCompleted {
            pages_attempted,
            pages_succeeded,
            listings: listings.len(),
        });

        if pages_succeeded == 0 || listings.is_empty() {
            return Err(AppError::HarvestFailed {
                pages_attempted,
                pages_succeeded,
            });
        }

        Ok(listings)
    }
}
