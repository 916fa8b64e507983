use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float64Array};
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Table – the columns of one binary table extension
// ---------------------------------------------------------------------------

/// Named `f64` columns of equal length, in stored order.
///
/// Backed by an Arrow [`RecordBatch`] whose fields are all non-nullable
/// `Float64`; the batch enforces the equal-length invariant.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    /// Build a table from `(name, values)` pairs.  Fails if lengths differ.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self, ArrowError> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, _)| Field::new(name, DataType::Float64, false))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .into_iter()
            .map(|(_, values)| Arc::new(Float64Array::from(values)) as ArrayRef)
            .collect();

        let options = RecordBatchOptions::new().with_row_count(Some(n_rows));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(Table { batch })
    }

    pub fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column_name(&self, index: usize) -> &str {
        self.batch.schema_ref().field(index).name()
    }

    /// Column at `index`.  Panics if out of range; callers validate first.
    pub fn column(&self, index: usize) -> &Float64Array {
        self.batch.column(index).as_primitive::<Float64Type>()
    }
}

// ---------------------------------------------------------------------------
// FilteredSeries – the cleaned (x, y) pair
// ---------------------------------------------------------------------------

/// Two parallel sequences left after dropping rows whose y is zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilteredSeries {
    /// Source column name of `x` (diagnostics only).
    pub x_name: String,
    /// Source column name of `y` (diagnostics only).
    pub y_name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl FilteredSeries {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The pair as an Arrow batch with the exported column names.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = Schema::new(vec![
            Field::new("X_data", DataType::Float64, false),
            Field::new("Y_data", DataType::Float64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(self.x.clone())),
                Arc::new(Float64Array::from(self.y.clone())),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// ExportArtifacts
// ---------------------------------------------------------------------------

/// Where the two exports of one request were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifacts {
    pub text_path: PathBuf,
    pub binary_path: PathBuf,
}
