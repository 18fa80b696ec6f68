use tailor_core::error::AppError;
use tailor_core::sink::{prepare_for_write, strip_non_ascii};
use tailor_core::table::ListingTable;
use tailor_core::traits::{Sink, SinkReceipt};

use crate::config::DatabaseConfig;
use crate::repository::ListingRepository;

/// Writes the listing table into PostgreSQL, replacing the target table.
#[derive(Debug, Clone)]
pub struct PostgresSink {
    config: DatabaseConfig,
}

impl PostgresSink {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

impl Sink for PostgresSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn write(&self, table: &ListingTable) -> Result<SinkReceipt, AppError> {
        self.config.validate()?;

        let mut table = prepare_for_write(table);
        if self.config.strip_non_ascii {
            table = strip_non_ascii(table);
        }

        let repo = ListingRepository::connect(&self.config).await?;
        repo.health_check()
            .await
            .map_err(|e| AppError::ConnectionFailed(e.to_string()))?;

        let inserted = repo
            .replace_table(&self.config.table, &table, self.config.chunk_size)
            .await
            .map_err(|e| AppError::WriteRejected(e.to_string()))?;

        tracing::info!(table = %self.config.table, rows = inserted, "PostgreSQL table replaced");
        Ok(SinkReceipt {
            rows: table.len(),
            destination: format!("table {}", self.config.table),
        })
    }
}
