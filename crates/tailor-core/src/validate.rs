use crate::normalize::{coerce_types, purge};
use crate::report::{PipelineEvent, PipelineReporter};
use crate::table::{Column, ColumnType, DType, ListingTable};

/// A column whose observed type is not accepted by its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub column: Column,
    pub expected: DType,
    pub actual: ColumnType,
}

/// Outcome of [`validate`]. Every category is always filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Columns with at least one null, and how many.
    pub null_counts: Vec<(Column, usize)>,
    pub duplicate_rows: usize,
    pub type_mismatches: Vec<TypeMismatch>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.null_counts.is_empty() && self.duplicate_rows == 0 && self.type_mismatches.is_empty()
    }
}

/// Check a normalized table for nulls, duplicate rows, and type drift.
///
/// All three checks run regardless of earlier failures; each failure is
/// reported as a diagnostic event.
pub fn validate<R: PipelineReporter>(table: &ListingTable, reporter: &R) -> ValidationReport {
    let null_counts: Vec<_> = table
        .columns()
        .iter()
        .map(|&column| (column, table.null_count(column)))
        .filter(|(_, count)| *count > 0)
        .collect();
    for &(column, count) in &null_counts {
        reporter.report(PipelineEvent::NullValues { column, count });
    }

    let duplicate_rows = table.duplicate_count();
    if duplicate_rows > 0 {
        reporter.report(PipelineEvent::DuplicateRows {
            count: duplicate_rows,
        });
    }

    let type_mismatches: Vec<_> = table
        .columns()
        .iter()
        .filter_map(|&column| {
            let expected = column.declared_type();
            let actual = table.column_type(column);
            let accepted = match actual {
                ColumnType::Empty => true,
                ColumnType::Uniform(dtype) => expected.accepts(dtype),
                ColumnType::Mixed => false,
            };
            (!accepted).then_some(TypeMismatch {
                column,
                expected,
                actual,
            })
        })
        .collect();
    for mismatch in &type_mismatches {
        reporter.report(PipelineEvent::TypeMismatch {
            column: mismatch.column,
            expected: mismatch.expected,
            actual: mismatch.actual,
        });
    }

    let report = ValidationReport {
        null_counts,
        duplicate_rows,
        type_mismatches,
    };
    reporter.report(PipelineEvent::ValidationFinished {
        passed: report.is_valid(),
    });
    report
}

/// Rerun coercion and purge on an already-normalized table.
///
/// Fixes type drift deterministically without re-deriving any value.
pub fn repair(table: ListingTable) -> ListingTable {
    purge(coerce_types(table))
}
