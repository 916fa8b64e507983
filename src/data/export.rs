use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::model::{ExportArtifacts, FilteredSeries};
use crate::error::{ConvertError, OutputKind, Result};
use crate::fits::{self, ColumnData, FitsError, TForm, TypeCode};

pub const TEXT_SUFFIX: &str = "_filtered.txt";
pub const BINARY_SUFFIX: &str = "_filtered.fits";
pub const X_COLUMN: &str = "X_data";
pub const Y_COLUMN: &str = "Y_data";

// ---------------------------------------------------------------------------
// Output paths
// ---------------------------------------------------------------------------

/// `dir/name.ext` → `dir/name{suffix}`.  Only the last extension is dropped.
pub fn derived_path(source: &Path, suffix: &str) -> PathBuf {
    let mut name = source.file_stem().unwrap_or_default().to_os_string();
    name.push(suffix);
    source.with_file_name(name)
}

pub fn artifacts_for(source: &Path) -> ExportArtifacts {
    ExportArtifacts {
        text_path: derived_path(source, TEXT_SUFFIX),
        binary_path: derived_path(source, BINARY_SUFFIX),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write the filtered pair next to `base_path` as text and as a FITS table.
///
/// The text file is written first; if it fails the binary file is not
/// attempted.  Existing files are overwritten.
pub fn export(base_path: &Path, x_data: &[f64], y_data: &[f64]) -> Result<ExportArtifacts> {
    let artifacts = artifacts_for(base_path);

    if x_data.len() != y_data.len() {
        return Err(ConvertError::Write {
            which: OutputKind::Text,
            path: artifacts.text_path,
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("x has {} values but y has {}", x_data.len(), y_data.len()),
            ),
        });
    }

    write_text(&artifacts.text_path, x_data, y_data).map_err(|source| ConvertError::Write {
        which: OutputKind::Text,
        path: artifacts.text_path.clone(),
        source,
    })?;
    log::debug!("Wrote {}", artifacts.text_path.display());

    write_binary(&artifacts.binary_path, x_data, y_data).map_err(|source| ConvertError::Write {
        which: OutputKind::Binary,
        path: artifacts.binary_path.clone(),
        source,
    })?;
    log::debug!("Wrote {}", artifacts.binary_path.display());

    Ok(artifacts)
}

/// Space-delimited, six decimals, `# X_data Y_data` header line.
fn write_text(path: &Path, x_data: &[f64], y_data: &[f64]) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# {X_COLUMN} {Y_COLUMN}")?;

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(file);
    for (x, y) in x_data.iter().zip(y_data) {
        wtr.write_record([fixed6(*x), fixed6(*y)])?;
    }
    wtr.flush()
}

/// `%f` formatting: six decimals, non-finite values as `nan` / `inf` / `-inf`.
fn fixed6(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v:.6}")
    }
}

fn write_binary(path: &Path, x_data: &[f64], y_data: &[f64]) -> io::Result<()> {
    let columns = [
        ColumnData {
            name: X_COLUMN,
            form: TForm::scalar(TypeCode::Float32),
            values: x_data,
        },
        ColumnData {
            name: Y_COLUMN,
            form: TForm::scalar(TypeCode::Float32),
            values: y_data,
        },
    ];
    let mut file = BufWriter::new(File::create(path)?);
    fits::write_table(&mut file, &columns).map_err(|e| match e {
        FitsError::Io(io) => io,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Read-back
// ---------------------------------------------------------------------------

/// Read a text export back into a series (`#` lines are skipped).
pub fn read_text(path: &Path) -> Result<FilteredSeries> {
    let format_error = |reason: String| ConvertError::SourceFormat {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut series = FilteredSeries {
        x_name: X_COLUMN.to_string(),
        y_name: Y_COLUMN.to_string(),
        ..FilteredSeries::default()
    };
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| format_error(format!("line {row}: {e}")))?;
        if record.len() != 2 {
            return Err(format_error(format!(
                "row {row}: expected 2 fields, found {}",
                record.len()
            )));
        }
        let parse = |field: &str| {
            field
                .parse::<f64>()
                .map_err(|_| format_error(format!("row {row}: '{field}' is not a number")))
        };
        series.x.push(parse(&record[0])?);
        series.y.push(parse(&record[1])?);
    }
    Ok(series)
}
