//! Outer join of summary tables on their shared key.

use crate::aggregate::SummaryTable;
use crate::error::{PipelineError, Result};

/// Outer-join `left` and `right` on their key column, prefixing their value
/// columns with `left_prefix` and `right_prefix`.
///
/// A key present on one side only gets zeros for the other side's columns.
/// Rows stay ordered by key.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSchema`] if the key columns differ or the
/// prefixed columns collide.
pub fn merge(
    left: &SummaryTable,
    left_prefix: &str,
    right: &SummaryTable,
    right_prefix: &str,
) -> Result<SummaryTable> {
    merge_all(&[(left_prefix, left), (right_prefix, right)])
}

/// Fold any number of prefixed summaries into one table, columns in input
/// order.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSchema`] if no table is given, the key
/// columns differ, or two prefixed columns share a name.
pub fn merge_all(parts: &[(&str, &SummaryTable)]) -> Result<SummaryTable> {
    let Some((_, first)) = parts.first() else {
        return Err(PipelineError::InvalidSchema("nothing to merge".into()));
    };
    let key_column = first.key_column();

    let mut columns: Vec<String> = Vec::new();
    let mut offsets = Vec::with_capacity(parts.len());
    for (prefix, table) in parts {
        if table.key_column() != key_column {
            return Err(PipelineError::InvalidSchema(format!(
                "cannot join on '{}' and '{key_column}'",
                table.key_column()
            )));
        }
        offsets.push(columns.len());
        for column in table.columns() {
            let name = format!("{prefix}{column}");
            if columns.contains(&name) {
                return Err(PipelineError::InvalidSchema(format!(
                    "column '{name}' appears twice after prefixing"
                )));
            }
            columns.push(name);
        }
    }

    let mut merged = SummaryTable::new(key_column, columns);
    for ((_, table), offset) in parts.iter().zip(offsets) {
        for (key, values) in table.rows() {
            let row = merged.row_mut(key);
            row[offset..offset + values.len()].copy_from_slice(values);
        }
    }
    Ok(merged)
}
