use std::fs;
use std::path::{Path, PathBuf};

use tailor_core::error::AppError;
use tailor_core::models::{RawListing, RawRecord};
use tailor_core::sink::{prepare_for_write, to_string_grid};
use tailor_core::table::ListingTable;
use tailor_core::traits::{Sink, SinkReceipt};

pub const DEFAULT_OUTPUT: &str = "products.csv";
pub const DEFAULT_RAW_OUTPUT: &str = "raw_products.csv";

/// Writes the normalized table to a local CSV file.
///
/// Header row first, one line per listing, no index column. An existing
/// file is overwritten.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT)
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn write(&self, table: &ListingTable) -> Result<SinkReceipt, AppError> {
        let table = prepare_for_write(table);
        ensure_parent(&self.path)?;

        let mut writer = csv::Writer::from_path(&self.path).map_err(csv_error)?;
        for record in to_string_grid(&table) {
            writer.write_record(&record).map_err(csv_error)?;
        }
        writer.flush()?;

        tracing::info!(path = %self.path.display(), rows = table.len(), "CSV written");
        Ok(SinkReceipt {
            rows: table.len(),
            destination: self.path.display().to_string(),
        })
    }
}

/// Dump harvested listings as text, sentinels rendered back in.
///
/// Returns the number of records written. An empty batch is rejected.
pub fn write_raw(path: impl AsRef<Path>, listings: &[RawListing]) -> Result<usize, AppError> {
    let path = path.as_ref();
    if listings.is_empty() {
        return Err(AppError::WriteRejected("no listings to save".into()));
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for listing in listings {
        writer.serialize(listing.to_record()).map_err(csv_error)?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = listings.len(), "Raw dump written");
    Ok(listings.len())
}

/// Load a raw dump written by [`write_raw`].
pub fn read_raw(path: impl AsRef<Path>) -> Result<Vec<RawListing>, AppError> {
    let mut reader = csv::Reader::from_path(path.as_ref()).map_err(csv_error)?;
    reader
        .deserialize::<RawRecord>()
        .map(|record| record.map(RawListing::from).map_err(csv_error))
        .collect()
}

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::CsvError(e.to_string())
}
