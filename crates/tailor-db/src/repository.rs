use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres, QueryBuilder};
use tailor_core::error::AppError;
use tailor_core::models::NormalizedListing;
use tailor_core::table::{Column, ListingTable};

use crate::config::DatabaseConfig;

/// Listing table persistence in PostgreSQL.
#[derive(Clone)]
pub struct ListingRepository {
    pool: Pool<Postgres>,
}

impl ListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool for one load.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(config.connect_timeout)
            .connect(config.url.trim())
            .await
            .map_err(|e| AppError::ConnectionFailed(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Replace `table_name` with the rows of `table`.
    ///
    /// Drop, recreate and multi-row inserts of `chunk_size` rows all run in
    /// one transaction, so a failed load leaves the previous table intact.
    /// `table_name` must already be a validated identifier.
    pub async fn replace_table(
        &self,
        table_name: &str,
        table: &ListingTable,
        chunk_size: usize,
    ) -> Result<u64, AppError> {
        let listings = table.listings()?;
        let table_ident = quote(table_name);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {table_ident}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        sqlx::query(&create_table_sql(&table_ident))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let columns = Column::ALL
            .iter()
            .map(|c| quote(c.name()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut inserted = 0;
        for chunk in listings.chunks(chunk_size.max(1)) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {table_ident} ({columns}) "));
            builder.push_values(chunk, |mut row, listing| {
                row.push_bind(listing.title.as_str())
                    .push_bind(listing.price)
                    .push_bind(listing.rating)
                    .push_bind(listing.colors)
                    .push_bind(listing.size.as_str())
                    .push_bind(listing.gender.as_str())
                    .push_bind(listing.captured_at.as_str());
            });
            inserted += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(table = %table_name, rows = inserted, "Table replaced");
        Ok(inserted)
    }

    /// Read every row back, in insertion order.
    pub async fn load(&self, table_name: &str) -> Result<Vec<NormalizedListing>, AppError> {
        let sql = format!(
            r#"SELECT "Title", "Price", "Rating", "Colors", "Size", "Gender", "timestamp"
            FROM {} ORDER BY ctid"#,
            quote(table_name)
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn create_table_sql(table_ident: &str) -> String {
    let columns = Column::ALL
        .iter()
        .map(|column| {
            let sql_type = match column {
                Column::Price | Column::Rating => "DOUBLE PRECISION",
                Column::Colors => "BIGINT",
                _ => "TEXT",
            };
            format!("{} {sql_type} NOT NULL", quote(column.name()))
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {table_ident} ({columns})")
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(rename = "Title")]
    title: String,
    #[sqlx(rename = "Price")]
    price: f64,
    #[sqlx(rename = "Rating")]
    rating: f64,
    #[sqlx(rename = "Colors")]
    colors: i64,
    #[sqlx(rename = "Size")]
    size: String,
    #[sqlx(rename = "Gender")]
    gender: String,
    timestamp: String,
}

impl From<ListingRow> for NormalizedListing {
    fn from(row: ListingRow) -> Self {
        NormalizedListing {
            title: row.title,
            price: row.price,
            rating: row.rating,
            colors: row.colors,
            size: row.size,
            gender: row.gender,
            captured_at: row.timestamp,
        }
    }
}
