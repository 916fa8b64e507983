use arrow::array::{BooleanArray, Float64Array};

use super::model::{FilteredSeries, Table};
use crate::error::{ConvertError, Result};

// ---------------------------------------------------------------------------
// Index parsing / validation
// ---------------------------------------------------------------------------

/// Parse a user-supplied column index.  Negative values parse fine and are
/// rejected later by [`validate_index`].
pub fn parse_index(input: &str) -> Result<i64> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ConvertError::InvalidIndexFormat {
            input: input.to_string(),
        })
}

/// Check `index` against `[0, column_count - 1]` and convert it to a position.
pub fn validate_index(table: &Table, index: i64) -> Result<usize> {
    let max = table.column_count() as i64 - 1;
    if index < 0 || index > max {
        return Err(ConvertError::IndexRange {
            requested: index,
            valid_range: 0..=max,
        });
    }
    Ok(index as usize)
}

// ---------------------------------------------------------------------------
// Selection + zero filter
// ---------------------------------------------------------------------------

/// Row mask keeping every row whose value is not zero.
///
/// `-0.0 == 0.0`, so negative zero is dropped; NaN compares unequal and stays.
fn nonzero_mask(values: &Float64Array) -> BooleanArray {
    BooleanArray::from_unary(values, |v| v != 0.0)
}

/// Values of `array` at the rows set in `mask`, in row order.  The mask is
/// built from a column of the same table, so the two have the same length.
fn take_values(array: &Float64Array, mask: &BooleanArray) -> Vec<f64> {
    array
        .values()
        .iter()
        .zip(mask.values().iter())
        .filter_map(|(&v, keep)| keep.then_some(v))
        .collect()
}

/// Select columns `i` (x) and `j` (y) by position and drop rows where y is 0.
///
/// Both indices are validated before any column data is read.  `i == j` is
/// allowed; an all-zero y column yields an empty series.
pub fn select_and_filter(table: &Table, i: i64, j: i64) -> Result<FilteredSeries> {
    let xi = validate_index(table, i)?;
    let yj = validate_index(table, j)?;

    let x_col = table.column(xi);
    let y_col = table.column(yj);
    let mask = nonzero_mask(y_col);

    let series = FilteredSeries {
        x_name: table.column_name(xi).to_string(),
        y_name: table.column_name(yj).to_string(),
        x: take_values(x_col, &mask),
        y: take_values(y_col, &mask),
    };

    log::debug!(
        "Selected '{}' / '{}': kept {} of {} rows",
        series.x_name,
        series.y_name,
        series.len(),
        table.num_rows()
    );
    Ok(series)
}
