//! Raw listing normalization.
//!
//! Reduces scraped [`RawListing`]s to a strictly-typed [`ListingTable`] through
//! a fixed sequence of filter-then-map passes. Every pass is a pure
//! `ListingTable -> ListingTable` function, and later passes only ever see the
//! rows that survived earlier ones. Parsing never fails loudly: a field that
//! does not match its pattern drops the row.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;
use crate::models::RawListing;
use crate::report::{PipelineEvent, PipelineReporter};
use crate::table::{Column, DType, ListingTable, Row, Value};

pub const DEFAULT_CONVERSION_RATE: f64 = 16_000.0;

const SIZE_LABEL: &str = "Size: ";
const GENDER_LABEL: &str = "Gender: ";
const UNKNOWN: &str = "Unknown";

/// Optional currency symbol, then digits with optional thousands separators
/// and an optional fractional part.
static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[$€£¥]\s?)?(\d{1,3}(?:,\d{3})+|\d+)(\.\d+)?").expect("valid price pattern")
});

static RATING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*5\b").expect("valid rating pattern"));

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Policy knobs for normalization.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Multiplier from the source currency to the local currency unit.
    pub conversion_rate: f64,
}

impl NormalizeConfig {
    pub fn new(conversion_rate: f64) -> Self {
        Self { conversion_rate }
    }

    fn check(&self) -> Result<(), AppError> {
        if self.conversion_rate.is_finite() && self.conversion_rate > 0.0 {
            Ok(())
        } else {
            Err(AppError::TransformFailed(format!(
                "conversion rate must be a positive finite number, got {}",
                self.conversion_rate
            )))
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            conversion_rate: DEFAULT_CONVERSION_RATE,
        }
    }
}

/// Runs the normalization passes in their fixed order.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Normalize a batch of raw listings.
    ///
    /// Returns `TransformFailed` instead of a partial table when the pipeline
    /// cannot run. An empty input produces an empty table.
    pub fn normalize<R: PipelineReporter>(
        &self,
        raw: &[RawListing],
        reporter: &R,
    ) -> Result<ListingTable, AppError> {
        self.config.check()?;
        tracing::info!(rows = raw.len(), "Starting normalization");

        let rate = self.config.conversion_rate;
        let passes: [(&'static str, &dyn Fn(ListingTable) -> ListingTable); 9] = [
            ("title", &drop_unknown_titles),
            ("duplicates", &drop_duplicates),
            ("price", &|t: ListingTable| convert_prices(t, rate)),
            ("rating", &parse_ratings),
            ("colors", &count_colors),
            ("size", &strip_sizes),
            ("gender", &strip_genders),
            ("coerce", &coerce_types),
            ("purge", &purge),
        ];

        let mut table = ListingTable::from_raw(raw);
        for (pass, apply) in passes {
            table = apply(table);
            reporter.report(PipelineEvent::PassCompleted {
                pass,
                rows: table.len(),
            });
        }

        tracing::info!(rows = table.len(), "Normalization complete");
        Ok(table)
    }
}

/// Pass 1: drop rows whose title failed extraction.
pub fn drop_unknown_titles(table: ListingTable) -> ListingTable {
    table.filter_map(|row| match row.get(Column::Title) {
        Value::Text(t) if !t.trim().is_empty() => Some(row),
        _ => None,
    })
}

/// Pass 2: drop exact full-row duplicates, keeping the first.
pub fn drop_duplicates(table: ListingTable) -> ListingTable {
    table.dedup()
}

/// Pass 3: parse the price and convert it to the local currency unit.
pub fn convert_prices(table: ListingTable, rate: f64) -> ListingTable {
    map_field(table, Column::Price, |cell| match cell {
        Value::Text(t) => extract_price(t, rate).map(Value::Float64),
        Value::Null => None,
        // Already numeric: assume it was converted upstream.
        other => positive(other.coerce_f64()),
    })
}

/// Pass 4: parse the rating out of `"<x> / 5"` or a bare decimal.
pub fn parse_ratings(table: ListingTable) -> ListingTable {
    map_field(table, Column::Rating, |cell| match cell {
        Value::Text(t) => extract_rating(t).map(Value::Float64),
        Value::Null => None,
        other => match other.coerce_f64() {
            Value::Float64(v) if (0.0..=5.0).contains(&v) => Some(Value::Float64(v)),
            _ => None,
        },
    })
}

/// Pass 5: take the first run of digits as the color count.
pub fn count_colors(table: ListingTable) -> ListingTable {
    map_field(table, Column::Colors, |cell| {
        let count = match cell {
            Value::Text(t) => extract_colors(t)?,
            Value::Null => return None,
            other => match other.coerce_i64() {
                Value::Int64(v) => v,
                _ => return None,
            },
        };
        (count > 0).then_some(Value::Int64(count))
    })
}

/// Pass 6: strip the size label and drop unknown sizes.
pub fn strip_sizes(table: ListingTable) -> ListingTable {
    map_field(table, Column::Size, |cell| known_label(cell, SIZE_LABEL))
}

/// Pass 7: strip the gender label and drop unknown genders.
pub fn strip_genders(table: ListingTable) -> ListingTable {
    map_field(table, Column::Gender, |cell| known_label(cell, GENDER_LABEL))
}

/// Pass 8: force every column to its declared 64-bit type.
///
/// Residue that does not parse becomes `Null` rather than an error.
pub fn coerce_types(table: ListingTable) -> ListingTable {
    table.map(|row| {
        Row::new(Column::ALL.map(|column| {
            let cell = row.get(column);
            match column.declared_type() {
                DType::Float64 | DType::Float32 => cell.coerce_f64(),
                DType::Int64 | DType::Int32 => cell.coerce_i64(),
                DType::Text => cell.coerce_text(),
            }
        }))
    })
}

/// Pass 9: drop rows holding a `Null` and any duplicates left by normalization.
pub fn purge(table: ListingTable) -> ListingTable {
    table.filter_map(|row| (!row.has_null()).then_some(row)).dedup()
}

/// Extract the first price numeral and convert it with `rate`.
///
/// Returns `None` when nothing matches or the result is not positive and finite.
pub fn extract_price(text: &str, rate: f64) -> Option<f64> {
    let caps = PRICE_PATTERN.captures(text)?;
    let whole = caps.get(1)?.as_str().replace(',', "");
    let fraction = caps.get(2).map_or("", |m| m.as_str());
    let value = format!("{whole}{fraction}").parse::<f64>().ok()? * rate;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Extract a rating in `[0, 5]`. Out-of-range values are rejected, not clamped.
pub fn extract_rating(text: &str) -> Option<f64> {
    let value = match RATING_PATTERN.captures(text) {
        Some(caps) => caps.get(1)?.as_str().parse::<f64>().ok()?,
        None => text.trim().parse::<f64>().ok()?,
    };
    (0.0..=5.0).contains(&value).then_some(value)
}

/// Extract the first run of digits as an integer.
pub fn extract_colors(text: &str) -> Option<i64> {
    DIGITS.find(text)?.as_str().parse().ok()
}

/// Remove every leading `label` and surrounding whitespace.
///
/// Idempotent: stripping an already-stripped value is a no-op.
pub fn strip_label(text: &str, label: &str) -> String {
    let mut rest = text.trim_start();
    while let Some(stripped) = rest.strip_prefix(label) {
        rest = stripped.trim_start();
    }
    rest.trim().to_string()
}

fn known_label(cell: &Value, label: &str) -> Option<Value> {
    let value = match cell {
        Value::Text(t) => strip_label(t, label),
        _ => return None,
    };
    (value != UNKNOWN).then_some(Value::Text(value))
}

fn positive(cell: Value) -> Option<Value> {
    match cell {
        Value::Float64(v) if v > 0.0 => Some(Value::Float64(v)),
        _ => None,
    }
}

fn map_field(
    table: ListingTable,
    column: Column,
    mut f: impl FnMut(&Value) -> Option<Value>,
) -> ListingTable {
    table.filter_map(|row| {
        let value = f(row.get(column))?;
        Some(row.with(column, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedListing;
    use crate::report::SilentReporter;
    use crate::testutil::{RecordingReporter, raw};

    fn normalize(rows: &[RawListing]) -> ListingTable {
        Normalizer::default()
            .normalize(rows, &SilentReporter)
            .unwrap()
    }

    fn sample_batch() -> Vec<RawListing> {
        vec![
            raw("T-shirt 1", "$99.99", "4.5 / 5", "3 Colors", "Size: M", "Gender: Men"),
            raw(
                "Unknown Product",
                "Price Unavailable",
                "Invalid Rating / 5",
                "5 Colors",
                "Size: L",
                "Gender: Women",
            ),
            raw("Hoodie 2", "$149.99", "3.8 / 5", "2 Colors", "Size: XL", "Gender: Unisex"),
            raw("Pants 3", "$79.50", "Not Rated", "4 Colors", "Size: S", "Gender: Men"),
        ]
    }

    #[test]
    fn end_to_end_single_valid_row() {
        let rows = vec![
            raw("T1", "$99.99", "4.5 / 5", "3 Colors", "Size: M", "Gender: Men"),
            raw(
                "Unknown Product",
                "Price Unavailable",
                "Not Rated",
                "0 Colors",
                "Size: Unknown",
                "Gender: Unknown",
            ),
        ];

        let listings = normalize(&rows).listings().unwrap();

        assert_eq!(
            listings,
            vec![NormalizedListing {
                title: "T1".into(),
                price: 1_599_840.0,
                rating: 4.5,
                colors: 3,
                size: "M".into(),
                gender: "Men".into(),
                captured_at: "2024-01-01T00:00:00Z".into(),
            }]
        );
    }

    #[test]
    fn sample_batch_keeps_valid_rows_in_order() {
        let listings = normalize(&sample_batch()).listings().unwrap();

        let titles: Vec<_> = listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["T-shirt 1", "Hoodie 2"]);
        assert!(listings.iter().all(|l| (0.0..=5.0).contains(&l.rating)));
        assert!(listings.iter().all(|l| l.colors > 0));
        assert!(listings.iter().all(|l| !l.size.contains("Size: ")));
        assert!(listings.iter().all(|l| !l.gender.contains("Gender: ")));
    }

    #[test]
    fn empty_input_yields_empty_table_with_columns() {
        let table = normalize(&[]);
        assert!(table.is_empty());
        assert_eq!(table.columns(), &Column::ALL);
    }

    #[test]
    fn single_unknown_title_yields_empty_table() {
        let rows = vec![raw(
            "Unknown Product",
            "$10.00",
            "4.0 / 5",
            "2 Colors",
            "Size: M",
            "Gender: Men",
        )];
        assert!(normalize(&rows).is_empty());
    }

    #[test]
    fn mixed_price_formats_all_convert() {
        let rows = vec![
            raw("P1", "$100.00", "4.0 / 5", "1 Colors", "Size: S", "Gender: Men"),
            raw("P2", "$50.5", "3.5 / 5", "2 Colors", "Size: M", "Gender: Women"),
            raw("P3", "25.75", "5.0 / 5", "3 Colors", "Size: L", "Gender: Unisex"),
        ];
        let prices: Vec<f64> = normalize(&rows)
            .listings()
            .unwrap()
            .iter()
            .map(|l| l.price)
            .collect();
        assert_eq!(prices, vec![1_600_000.0, 808_000.0, 412_000.0]);
    }

    #[test]
    fn price_extraction_multiplies_by_rate() {
        for (text, expected) in [
            ("$99.99", 99.99),
            ("$1,299.00", 1299.0),
            ("12", 12.0),
            ("Price: $7.25 today", 7.25),
            ("€ 3.50", 3.5),
        ] {
            let price = extract_price(text, DEFAULT_CONVERSION_RATE).unwrap();
            assert!(
                (price - expected * DEFAULT_CONVERSION_RATE).abs() < 1e-6,
                "{text} -> {price}"
            );
            assert!(price > 0.0);
        }
    }

    #[test]
    fn price_extraction_rejects_missing_or_zero() {
        assert_eq!(extract_price("free", DEFAULT_CONVERSION_RATE), None);
        assert_eq!(extract_price("$0.00", DEFAULT_CONVERSION_RATE), None);
        assert_eq!(extract_price("", DEFAULT_CONVERSION_RATE), None);
    }

    #[test]
    fn rating_extraction_takes_decimal_before_slash_five() {
        assert_eq!(extract_rating("4.5 / 5"), Some(4.5));
        assert_eq!(extract_rating("Rating: ⭐ 3.9 / 5"), Some(3.9));
        assert_eq!(extract_rating("0 / 5"), Some(0.0));
        assert_eq!(extract_rating("5/5"), Some(5.0));
        assert_eq!(extract_rating("4.2"), Some(4.2));
    }

    #[test]
    fn rating_out_of_range_is_dropped_not_clamped() {
        assert_eq!(extract_rating("7.5 / 5"), None);
        assert_eq!(extract_rating("6"), None);
        assert_eq!(extract_rating("-1"), None);
        assert_eq!(extract_rating("Rating: ⭐ Invalid Rating / 5"), None);
        assert_eq!(extract_rating("NaN"), None);
    }

    #[test]
    fn colors_take_first_digit_run() {
        assert_eq!(extract_colors("3 Colors"), Some(3));
        assert_eq!(extract_colors("Available in 12 or 4 Colors"), Some(12));
        assert_eq!(extract_colors("Colors"), None);
        assert_eq!(extract_colors("99999999999999999999 Colors"), None);
    }

    #[test]
    fn colors_pass_drops_zero_and_digitless_rows() {
        let rows = vec![
            raw("A", "$1", "4 / 5", "Colors", "Size: M", "Gender: Men"),
            raw("B", "$1", "4 / 5", "00 Colors", "Size: M", "Gender: Men"),
            raw("C", "$1", "4 / 5", "2 Colors", "Size: M", "Gender: Men"),
        ];
        let listings = normalize(&rows).listings().unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "C");
    }

    #[test]
    fn label_strip_is_idempotent() {
        for (text, label) in [
            ("Size: M", SIZE_LABEL),
            ("Size: Size: XL", SIZE_LABEL),
            ("M", SIZE_LABEL),
            ("Gender: Women", GENDER_LABEL),
            ("  Gender: Unisex ", GENDER_LABEL),
        ] {
            let once = strip_label(text, label);
            assert_eq!(strip_label(&once, label), once, "{text}");
        }
        assert_eq!(strip_label("Size: M", SIZE_LABEL), "M");
    }

    #[test]
    fn unknown_size_and_gender_are_dropped() {
        let rows = vec![
            raw("A", "$1", "4 / 5", "2 Colors", "Size: Unknown", "Gender: Men"),
            raw("B", "$1", "4 / 5", "2 Colors", "Size: M", "Unknown"),
            raw("C", "$1", "4 / 5", "2 Colors", "M", "Gender: Women"),
        ];
        let listings = normalize(&rows).listings().unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "C");
        assert_eq!(listings[0].size, "M");
    }

    #[test]
    fn empty_size_and_gender_survive_as_empty_text() {
        let rows = vec![
            raw("A", "$1", "4 / 5", "2 Colors", "Size: ", "Gender: Men"),
            raw("B", "$1", "4 / 5", "2 Colors", "Size: S", "Gender:  "),
        ];
        let listings = normalize(&rows).listings().unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].size, "");
        assert_eq!(listings[0].gender, "Men");
        assert_eq!(listings[1].size, "S");
        assert_eq!(listings[1].gender, "");
    }

    #[test]
    fn sentinels_drop_rows_at_their_own_pass() {
        let reporter = RecordingReporter::default();
        let rows = vec![
            raw("Kept", "$10", "4 / 5", "2 Colors", "Size: M", "Gender: Men"),
            raw("No price", "Price Unavailable", "4 / 5", "2 Colors", "Size: M", "Gender: Men"),
            raw("Bad rating", "$11", "Invalid Rating / 5", "2 Colors", "Size: M", "Gender: Men"),
            raw("No gender", "$12", "4 / 5", "2 Colors", "Size: M", "Gender: Unknown"),
        ];
        let table = Normalizer::default().normalize(&rows, &reporter).unwrap();

        let passes = reporter.passes();
        let rows_after = |name: &str| {
            passes
                .iter()
                .find(|(pass, _)| *pass == name)
                .map(|(_, rows)| *rows)
                .unwrap()
        };
        assert_eq!(rows_after("title"), 4);
        assert_eq!(rows_after("duplicates"), 4);
        assert_eq!(rows_after("price"), 3);
        assert_eq!(rows_after("rating"), 2);
        assert_eq!(rows_after("colors"), 2);
        assert_eq!(rows_after("size"), 2);
        assert_eq!(rows_after("gender"), 1);
        assert_eq!(table.listings().unwrap()[0].title, "Kept");
    }

    #[test]
    fn duplicates_removed_before_and_after_normalization() {
        let first = raw("A", "$10", "4 / 5", "2 Colors", "Size: M", "Gender: Men");
        // Differs only in price formatting, so it collapses after parsing.
        let reformatted = raw("A", "10.00", "4 / 5", "2 Colors", "Size: M", "Gender: Men");
        let rows = vec![first.clone(), first, reformatted];

        let table = normalize(&rows);
        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicate_count(), 0);
    }

    #[test]
    fn output_never_contains_nulls() {
        let mut rows = sample_batch();
        rows.push(raw("X", "abc", "", "", "", ""));
        rows.push(raw("Y", "$5", "unrated", "1 Colors", "Size: M", "Gender: Men"));
        let table = normalize(&rows);
        assert_eq!(table.len(), 2);
        for column in Column::ALL {
            assert_eq!(table.null_count(column), 0, "{column}");
        }
    }

    #[test]
    fn timestamp_passes_through_unchanged() {
        let mut row = raw("A", "$1", "4 / 5", "2 Colors", "Size: M", "Gender: Men");
        row.captured_at = "2025-06-30T12:34:56.789+00:00".into();
        let listings = normalize(&[row]).listings().unwrap();
        assert_eq!(listings[0].captured_at, "2025-06-30T12:34:56.789+00:00");
    }

    #[test]
    fn custom_conversion_rate_is_applied() {
        let normalizer = Normalizer::new(NormalizeConfig::new(1.0));
        let rows = vec![raw("A", "$12.50", "4 / 5", "2 Colors", "Size: M", "Gender: Men")];
        let listings = normalizer
            .normalize(&rows, &SilentReporter)
            .unwrap()
            .listings()
            .unwrap();
        assert_eq!(listings[0].price, 12.5);
    }

    #[test]
    fn invalid_conversion_rate_fails_transformation() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = Normalizer::new(NormalizeConfig::new(rate))
                .normalize(&sample_batch(), &SilentReporter)
                .unwrap_err();
            assert!(matches!(err, AppError::TransformFailed(_)));
        }
    }

    #[test]
    fn reports_every_pass_in_order() {
        let reporter = RecordingReporter::default();
        Normalizer::default()
            .normalize(&sample_batch(), &reporter)
            .unwrap();

        let passes = reporter.passes();
        let names: Vec<_> = passes.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "title",
                "duplicates",
                "price",
                "rating",
                "colors",
                "size",
                "gender",
                "coerce",
                "purge"
            ]
        );
        // title drops 1, rating drops 1 (Not Rated)
        assert_eq!(passes[0].1, 3);
        assert_eq!(passes[3].1, 2);
        assert_eq!(passes[8].1, 2);
    }

    #[test]
    fn coercion_normalizes_32_bit_cells() {
        let table = ListingTable::new(vec![Row::new([
            Value::Text("A".into()),
            Value::Float32(2.5),
            Value::Text("4.5".into()),
            Value::Int32(3),
            Value::Text("M".into()),
            Value::Text("Men".into()),
            Value::Text("t".into()),
        ])]);

        let row = coerce_types(table).rows()[0].clone();
        assert_eq!(row.get(Column::Price), &Value::Float64(2.5));
        assert_eq!(row.get(Column::Rating), &Value::Float64(4.5));
        assert_eq!(row.get(Column::Colors), &Value::Int64(3));
    }
}
