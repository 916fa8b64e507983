use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::Table;
use crate::error::{ConvertError, Result};
use crate::fits;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the table of a source file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – numeric columns, or list columns of numbers
/// * anything else      – FITS; the first extension must be a BINTABLE
///
/// Vector cells are flattened row after row, so a single-row spectrum with
/// `WAVE[4096]` and `FLUX[4096]` becomes two 4096-long columns.  The source
/// file is closed before this returns, whatever the outcome.
pub fn load(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let columns = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        _ => load_fits(path)?,
    };

    let table = build_table(path, columns)?;
    log::debug!(
        "Loaded {} columns x {} rows from {}: {:?}",
        table.column_count(),
        table.num_rows(),
        path.display(),
        table.column_names()
    );
    Ok(table)
}

fn read_error(path: &Path, source: std::io::Error) -> ConvertError {
    ConvertError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn format_error(path: &Path, reason: impl ToString) -> ConvertError {
    ConvertError::SourceFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Check the flattened columns agree in length, then build the [`Table`].
fn build_table(path: &Path, columns: Vec<(String, Vec<f64>)>) -> Result<Table> {
    let Some((first_name, first_values)) = columns.first() else {
        return Err(format_error(path, "table has no columns"));
    };
    if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != first_values.len()) {
        return Err(format_error(
            path,
            format!(
                "column '{name}' has {} values but '{first_name}' has {}",
                values.len(),
                first_values.len()
            ),
        ));
    }
    Table::from_columns(columns).map_err(|e| format_error(path, e))
}

// ---------------------------------------------------------------------------
// FITS loader
// ---------------------------------------------------------------------------

fn load_fits(path: &Path) -> Result<Vec<(String, Vec<f64>)>> {
    // Whole-file read: the handle is gone by the time parsing starts.
    let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
    let columns = fits::read_first_table(&bytes).map_err(|e| format_error(path, e))?;

    Ok(columns
        .into_iter()
        .map(|col| {
            if col.repeat > 1 {
                log::debug!("Flattening '{}' (repeat {})", col.name, col.repeat);
            }
            (col.name, col.values)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load every column of a Parquet file as `f64`.
///
/// Accepted column types:
/// - integer / float / boolean – one value per row
/// - List, LargeList or FixedSizeList of the above – concatenated per row
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<(String, Vec<f64>)>> {
    let file = std::fs::File::open(path).map_err(|e| read_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| format_error(path, format!("reading parquet metadata: {e}")))?;

    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| format_error(path, format!("building parquet reader: {e}")))?;

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| format_error(path, format!("reading parquet record batch: {e}")))?;

        for (col_idx, out) in values.iter_mut().enumerate() {
            let col = batch.column(col_idx);
            append_flattened(col, out)
                .map_err(|reason| format_error(path, format!("column '{}': {reason}", names[col_idx])))?;
        }
    }

    Ok(names.into_iter().zip(values).collect())
}

// -- Arrow helpers --

fn is_plain_number(dt: &DataType) -> bool {
    dt.is_numeric() || matches!(dt, DataType::Boolean)
}

/// Append a numeric column to `out`, flattening list cells in row order.
/// Nulls become NaN.
fn append_flattened(col: &Arc<dyn Array>, out: &mut Vec<f64>) -> std::result::Result<(), String> {
    match col.data_type() {
        dt if is_plain_number(dt) => append_numbers(col.as_ref(), out),
        DataType::List(_) => {
            let list = col.as_list::<i32>();
            for row in 0..list.len() {
                if !list.is_null(row) {
                    append_numbers(list.value(row).as_ref(), out)?;
                }
            }
            Ok(())
        }
        DataType::LargeList(_) => {
            let list = col.as_list::<i64>();
            for row in 0..list.len() {
                if !list.is_null(row) {
                    append_numbers(list.value(row).as_ref(), out)?;
                }
            }
            Ok(())
        }
        DataType::FixedSizeList(_, _) => {
            let list = col.as_fixed_size_list();
            for row in 0..list.len() {
                if !list.is_null(row) {
                    append_numbers(list.value(row).as_ref(), out)?;
                }
            }
            Ok(())
        }
        other => Err(format!("expected numeric or list-of-numeric data, got {other:?}")),
    }
}

fn append_numbers(values: &dyn Array, out: &mut Vec<f64>) -> std::result::Result<(), String> {
    if !is_plain_number(values.data_type()) {
        return Err(format!(
            "list inner type is {:?}, expected a number",
            values.data_type()
        ));
    }
    let as_f64 = cast(values, &DataType::Float64).map_err(|e| e.to_string())?;
    let f64_arr = as_f64
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or("cast to Float64 produced another type")?;
    out.extend(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use arrow::array::{ArrayRef, Float32Builder, Int64Array, ListBuilder, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    use crate::fits::{ColumnData, TForm, TypeCode};

    fn write_fits(path: &Path, columns: &[ColumnData<'_>]) {
        let mut file = std::fs::File::create(path).unwrap();
        fits::write_table(&mut file, columns).unwrap();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.fits")).unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));
    }

    #[test]
    fn directory_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));
    }

    #[test]
    fn garbage_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.fits");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "wavelength,flux\n1,2").unwrap();
        drop(f);

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConvertError::SourceFormat { .. }));
    }

    #[test]
    fn vector_columns_are_flattened_row_major() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spectrum.fits");
        let wave = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let flux = [0.5, 0.0, 1.5, 2.5, 0.0, 3.5];
        write_fits(
            &path,
            &[
                ColumnData {
                    name: "WAVE",
                    form: TForm::new(3, TypeCode::Float64),
                    values: &wave,
                },
                ColumnData {
                    name: "FLUX",
                    form: TForm::new(3, TypeCode::Float32),
                    values: &flux,
                },
            ],
        );

        let table = load(&path).unwrap();
        assert_eq!(table.column_names(), ["WAVE", "FLUX"]);
        assert_eq!(table.num_rows(), 6);
        assert_eq!(table.column(0).values().to_vec(), wave.to_vec());
        assert_eq!(table.column(1).values().to_vec(), flux.to_vec());
    }

    #[test]
    fn mismatched_flattened_lengths_are_a_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.fits");
        let wave = [1.0, 2.0, 3.0, 4.0];
        let snr = [9.0, 9.0];
        write_fits(
            &path,
            &[
                ColumnData {
                    name: "WAVE",
                    form: TForm::new(2, TypeCode::Float64),
                    values: &wave,
                },
                ColumnData {
                    name: "SNR",
                    form: TForm::scalar(TypeCode::Float32),
                    values: &snr,
                },
            ],
        );

        match load(&path).unwrap_err() {
            ConvertError::SourceFormat { reason, .. } => {
                assert!(reason.contains("'SNR' has 2 values but 'WAVE' has 4"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn write_parquet(path: &Path, batch: &RecordBatch) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_ragged_flattening_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spectrum.parquet");

        let mut flux = ListBuilder::new(Float32Builder::new());
        for row in [[1.0f32, 2.0], [3.0, 4.0]] {
            flux.values().append_slice(&row);
            flux.append(true);
        }
        let flux: ArrayRef = Arc::new(flux.finish());
        let order: ArrayRef = Arc::new(Int64Array::from(vec![10, 11]));
        let schema = Schema::new(vec![
            Field::new("FLUX", flux.data_type().clone(), false),
            Field::new("ORDER", DataType::Int64, false),
        ]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![flux, order]).unwrap();
        write_parquet(&path, &batch);

        // FLUX flattens to 4 values, ORDER stays at 2.
        match load(&path).unwrap_err() {
            ConvertError::SourceFormat { reason, .. } => {
                assert!(reason.contains("'ORDER' has 2 values but 'FLUX' has 4"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parquet_numeric_columns_load_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.pq");

        let mut wave = ListBuilder::new(Float32Builder::new());
        wave.values().append_slice(&[400.0, 410.0, 420.0]);
        wave.append(true);
        let mut flux = ListBuilder::new(Float32Builder::new());
        flux.values().append_slice(&[1.0, 0.0, 2.0]);
        flux.append(true);

        let wave: ArrayRef = Arc::new(wave.finish());
        let flux: ArrayRef = Arc::new(flux.finish());
        let schema = Schema::new(vec![
            Field::new("WAVE", wave.data_type().clone(), false),
            Field::new("FLUX", flux.data_type().clone(), false),
        ]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![wave, flux]).unwrap();
        write_parquet(&path, &batch);

        let table = load(&path).unwrap();
        assert_eq!(table.column_names(), ["WAVE", "FLUX"]);
        assert_eq!(table.column(0).values().to_vec(), vec![400.0, 410.0, 420.0]);
        assert_eq!(table.column(1).values().to_vec(), vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn parquet_string_columns_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("names.parquet");
        let names: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        let schema = Schema::new(vec![Field::new("OBJECT", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![names]).unwrap();
        write_parquet(&path, &batch);

        match load(&path).unwrap_err() {
            ConvertError::SourceFormat { reason, .. } => assert!(reason.contains("OBJECT")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
