//! Pre-write normalization shared by every sink.

use crate::table::{ListingTable, Row, Value};
use crate::validate::repair;

/// Defensive coercion + purge applied right before a write.
pub fn prepare_for_write(table: &ListingTable) -> ListingTable {
    repair(table.clone())
}

/// Remove every non-ASCII character from text cells.
///
/// Some destinations choke on emoji and other multi-byte text.
pub fn strip_non_ascii(table: ListingTable) -> ListingTable {
    table.map(|row| {
        Row::new(std::array::from_fn(|i| match &row.cells()[i] {
            Value::Text(t) if !t.is_ascii() => Value::Text(t.chars().filter(char::is_ascii).collect()),
            other => other.clone(),
        }))
    })
}

/// Header plus stringified rows, in column order.
pub fn to_string_grid(table: &ListingTable) -> Vec<Vec<String>> {
    let header = table
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    std::iter::once(header)
        .chain(
            table
                .rows()
                .iter()
                .map(|row| row.cells().iter().map(Value::to_string).collect()),
        )
        .collect()
}
