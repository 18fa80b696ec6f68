//! Dynamically-typed listing table used by the transform stage.
//!
//! Scraped text enters as `Text`/`Null` cells and leaves as typed cells once
//! the normalizer has run. Keeping the cells dynamic lets the validator detect
//! type drift and lets `repair` fix it without re-deriving values.

use std::collections::HashSet;
use std::fmt;

use crate::error::AppError;
use crate::models::{NormalizedListing, RawListing, Scraped};

pub const COLUMN_COUNT: usize = 7;

/// Columns of the listing table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Title,
    Price,
    Rating,
    Colors,
    Size,
    Gender,
    CapturedAt,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Title,
        Column::Price,
        Column::Rating,
        Column::Colors,
        Column::Size,
        Column::Gender,
        Column::CapturedAt,
    ];

    /// Header name used by every sink.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Title => "Title",
            Column::Price => "Price",
            Column::Rating => "Rating",
            Column::Colors => "Colors",
            Column::Size => "Size",
            Column::Gender => "Gender",
            Column::CapturedAt => "timestamp",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn declared_type(&self) -> DType {
        match self {
            Column::Price | Column::Rating => DType::Float64,
            Column::Colors => DType::Int64,
            Column::Title | Column::Size | Column::Gender | Column::CapturedAt => DType::Text,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime type of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Text,
    Float32,
    Float64,
    Int32,
    Int64,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Text => "text",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
        }
    }

    /// Whether a column declared as `self` accepts cells of type `actual`.
    ///
    /// 32-bit numerics are accepted for their 64-bit counterparts.
    pub fn accepts(&self, actual: DType) -> bool {
        matches!(
            (self, actual),
            (DType::Text, DType::Text)
                | (DType::Float64, DType::Float64 | DType::Float32)
                | (DType::Int64, DType::Int64 | DType::Int32)
        ) || *self == actual
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed type of a column, derived from its non-null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Empty,
    Uniform(DType),
    Mixed,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Empty => f.write_str("empty"),
            ColumnType::Uniform(dtype) => write!(f, "{dtype}"),
            ColumnType::Mixed => f.write_str("mixed"),
        }
    }
}

/// One table cell. `Null` is the missing-value marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Float32(f32),
    Float64(f64),
    Int32(i32),
    Int64(i64),
}

impl Value {
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(DType::Text),
            Value::Float32(_) => Some(DType::Float32),
            Value::Float64(_) => Some(DType::Float64),
            Value::Int32(_) => Some(DType::Int32),
            Value::Int64(_) => Some(DType::Int64),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Numeric coercion to `Float64`. Anything unparsable becomes `Null`.
    pub fn coerce_f64(&self) -> Value {
        let parsed = match self {
            Value::Float64(v) => Some(*v),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Text(t) => t.trim().parse::<f64>().ok(),
            Value::Null => None,
        };
        match parsed {
            Some(v) if v.is_finite() => Value::Float64(v),
            _ => Value::Null,
        }
    }

    /// Numeric coercion to `Int64`. Fractional or out-of-range values become `Null`.
    pub fn coerce_i64(&self) -> Value {
        let parsed = match self {
            Value::Int64(v) => Some(*v),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Float64(v) => float_to_i64(*v),
            Value::Float32(v) => float_to_i64(f64::from(*v)),
            Value::Text(t) => {
                let t = t.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().and_then(float_to_i64))
            }
            Value::Null => None,
        };
        parsed.map_or(Value::Null, Value::Int64)
    }

    /// Coercion to `Text`. Numbers are rendered, `Null` stays `Null`.
    pub fn coerce_text(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Text(t) => Value::Text(t.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    fn key(&self) -> CellKey {
        match self {
            Value::Null => CellKey::Null,
            Value::Text(t) => CellKey::Text(t.clone()),
            Value::Float32(v) => CellKey::Float32(v.to_bits()),
            Value::Float64(v) => CellKey::Float64(v.to_bits()),
            Value::Int32(v) => CellKey::Int32(*v),
            Value::Int64(v) => CellKey::Int64(*v),
        }
    }
}

fn float_to_i64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(t) => f.write_str(t),
            // Debug keeps the trailing ".0" on whole floats.
            Value::Float32(v) => write!(f, "{v:?}"),
            Value::Float64(v) => write!(f, "{v:?}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
        }
    }
}

impl From<&Scraped> for Value {
    fn from(field: &Scraped) -> Self {
        match field {
            Scraped::Text(t) => Value::Text(t.clone()),
            Scraped::Missing => Value::Null,
        }
    }
}

/// Hashable identity of a cell, used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey {
    Null,
    Text(String),
    Float32(u32),
    Float64(u64),
    Int32(i32),
    Int64(i64),
}

/// One table row, indexed by [`Column`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: [Value; COLUMN_COUNT],
}

impl Row {
    pub fn new(cells: [Value; COLUMN_COUNT]) -> Self {
        Self { cells }
    }

    pub fn get(&self, column: Column) -> &Value {
        &self.cells[column.index()]
    }

    /// Return the row with `column` replaced by `value`.
    pub fn with(mut self, column: Column, value: Value) -> Self {
        self.cells[column.index()] = value;
        self
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn has_null(&self) -> bool {
        self.cells.iter().any(Value::is_null)
    }

    fn key(&self) -> Vec<CellKey> {
        self.cells.iter().map(Value::key).collect()
    }
}

impl From<&RawListing> for Row {
    fn from(listing: &RawListing) -> Self {
        Row::new([
            Value::from(&listing.title),
            Value::from(&listing.price),
            Value::from(&listing.rating),
            Value::from(&listing.colors),
            Value::from(&listing.size),
            Value::from(&listing.gender),
            Value::Text(listing.captured_at.clone()),
        ])
    }
}

impl From<&NormalizedListing> for Row {
    fn from(listing: &NormalizedListing) -> Self {
        Row::new([
            Value::Text(listing.title.clone()),
            Value::Float64(listing.price),
            Value::Float64(listing.rating),
            Value::Int64(listing.colors),
            Value::Text(listing.size.clone()),
            Value::Text(listing.gender.clone()),
            Value::Text(listing.captured_at.clone()),
        ])
    }
}

/// Ordered collection of rows with the fixed listing column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingTable {
    rows: Vec<Row>,
}

impl ListingTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn from_raw(listings: &[RawListing]) -> Self {
        Self::new(listings.iter().map(Row::from).collect())
    }

    pub fn from_listings(listings: &[NormalizedListing]) -> Self {
        Self::new(listings.iter().map(Row::from).collect())
    }

    pub fn columns(&self) -> &'static [Column] {
        &Column::ALL
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep rows for which `f` returns `Some`, in order.
    pub fn filter_map(self, f: impl FnMut(Row) -> Option<Row>) -> Self {
        Self::new(self.rows.into_iter().filter_map(f).collect())
    }

    /// Apply `f` to every row, in order.
    pub fn map(self, f: impl FnMut(Row) -> Row) -> Self {
        Self::new(self.rows.into_iter().map(f).collect())
    }

    /// Drop exact full-row duplicates, keeping the first occurrence.
    pub fn dedup(self) -> Self {
        let mut seen = HashSet::new();
        self.filter_map(|row| seen.insert(row.key()).then_some(row))
    }

    /// Number of rows that repeat an earlier row exactly.
    pub fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.rows.iter().filter(|row| !seen.insert(row.key())).count()
    }

    pub fn null_count(&self, column: Column) -> usize {
        self.rows
            .iter()
            .filter(|row| row.get(column).is_null())
            .count()
    }

    /// Observed type of `column`, ignoring null cells.
    pub fn column_type(&self, column: Column) -> ColumnType {
        let mut observed = None;
        for dtype in self.rows.iter().filter_map(|row| row.get(column).dtype()) {
            match observed {
                None => observed = Some(dtype),
                Some(seen) if seen != dtype => return ColumnType::Mixed,
                Some(_) => {}
            }
        }
        observed.map_or(ColumnType::Empty, ColumnType::Uniform)
    }

    /// Convert every row into a typed [`NormalizedListing`].
    ///
    /// Fails if any row still has a null or wrongly-typed cell; run the
    /// table through coercion and purge first.
    pub fn listings(&self) -> Result<Vec<NormalizedListing>, AppError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                typed_listing(row).ok_or_else(|| {
                    AppError::TransformFailed(format!(
                        "row {i} does not match the listing schema"
                    ))
                })
            })
            .collect()
    }
}

fn typed_listing(row: &Row) -> Option<NormalizedListing> {
    let text = |column: Column| row.get(column).as_text().map(str::to_string);
    let price = match row.get(Column::Price) {
        Value::Float64(v) => *v,
        _ => return None,
    };
    let rating = match row.get(Column::Rating) {
        Value::Float64(v) => *v,
        _ => return None,
    };
    let colors = match row.get(Column::Colors) {
        Value::Int64(v) => *v,
        _ => return None,
    };
    Some(NormalizedListing {
        title: text(Column::Title)?,
        price,
        rating,
        colors,
        size: text(Column::Size)?,
        gender: text(Column::Gender)?,
        captured_at: text(Column::CapturedAt)?,
    })
}
