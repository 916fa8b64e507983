//! One synchronous request: path + two index strings in, artifacts out.
//!
//! ```text
//!  Idle → Loading → Filtering → Exporting → Rendering → Done
//!    └───────┴──────────┴───────────┴───────────┴──→ Failed { stage, error }
//! ```
//! Index syntax and the presence of a source path are checked in `Idle`,
//! before any file is opened.  Nothing here is re-entrant; callers serialise
//! requests themselves.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::data::model::{ExportArtifacts, FilteredSeries};
use crate::data::{export, filter, loader};
use crate::error::ConvertError;
use crate::plot::{self, RenderedPlot};

pub const DEFAULT_X_INDEX: &str = "0";
pub const DEFAULT_Y_INDEX: &str = "3";

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Loading,
    Filtering,
    Exporting,
    Rendering,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::Filtering => "filtering",
            Stage::Exporting => "exporting",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the caller asks for.  Indices stay as text so that a malformed one
/// is reported as such rather than rejected by the caller's own parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub source: Option<PathBuf>,
    pub x_index: String,
    pub y_index: String,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            source: None,
            x_index: DEFAULT_X_INDEX.to_string(),
            y_index: DEFAULT_Y_INDEX.to_string(),
        }
    }
}

impl Request {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn with_indices(mut self, x_index: impl Into<String>, y_index: impl Into<String>) -> Self {
        self.x_index = x_index.into();
        self.y_index = y_index.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub artifacts: ExportArtifacts,
    pub series: FilteredSeries,
    pub plot: RenderedPlot,
}

/// Terminal failure of a request, tagged with the stage it happened in.
#[derive(Error, Debug)]
#[error("{error} (while {stage})")]
pub struct Failure {
    pub stage: Stage,
    #[source]
    pub error: ConvertError,
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Run a request to completion.
pub fn run(request: &Request) -> Result<Outcome, Failure> {
    run_with_observer(request, |_| {})
}

/// Run a request, calling `on_stage` on every transition (including the
/// final `Done`; a failure is reported through the return value only).
pub fn run_with_observer<F>(request: &Request, mut on_stage: F) -> Result<Outcome, Failure>
where
    F: FnMut(Stage),
{
    let mut stage = Stage::Idle;
    on_stage(stage);

    let result = run_stages(request, |next| {
        stage = next;
        on_stage(next);
    });

    match result {
        Ok(outcome) => {
            on_stage(Stage::Done);
            log::info!(
                "Kept {} rows; wrote {} and {}",
                outcome.series.len(),
                outcome.artifacts.text_path.display(),
                outcome.artifacts.binary_path.display()
            );
            Ok(outcome)
        }
        Err(error) => {
            log::error!("Request failed while {stage}: {error}");
            Err(Failure { stage, error })
        }
    }
}

fn run_stages<F>(request: &Request, mut enter: F) -> Result<Outcome, ConvertError>
where
    F: FnMut(Stage),
{
    let source = request.source.as_deref().ok_or(ConvertError::InputMissing)?;
    let x_index = filter::parse_index(&request.x_index)?;
    let y_index = filter::parse_index(&request.y_index)?;

    enter(Stage::Loading);
    let table = loader::load(source)?;
    log::info!(
        "Loaded {} ({} columns, {} rows)",
        source.display(),
        table.column_count(),
        table.num_rows()
    );

    enter(Stage::Filtering);
    let series = filter::select_and_filter(&table, x_index, y_index)?;
    drop(table);

    enter(Stage::Exporting);
    let artifacts = export::export(source, &series.x, &series.y)?;

    enter(Stage::Rendering);
    let plot = plot::render(&plot_name(source), &series.x, &series.y);

    Ok(Outcome {
        artifacts,
        series,
        plot,
    })
}

fn plot_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputKind;
    use crate::fits::{self, ColumnData, TForm, TypeCode};
    use tempfile::TempDir;

    /// Columns A..D, rows (1,0,5,9), (2,2,6,8), (3,0,7,7).
    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("sample.fits");
        let cols: [(&str, [f64; 3]); 4] = [
            ("A", [1.0, 2.0, 3.0]),
            ("B", [0.0, 2.0, 0.0]),
            ("C", [5.0, 6.0, 7.0]),
            ("D", [9.0, 8.0, 7.0]),
        ];
        let columns: Vec<ColumnData<'_>> = cols
            .iter()
            .map(|(name, values)| ColumnData {
                name: *name,
                form: TForm::scalar(TypeCode::Float64),
                values: values.as_slice(),
            })
            .collect();
        let mut file = std::fs::File::create(&path).unwrap();
        fits::write_table(&mut file, &columns).unwrap();
        path
    }

    fn stages_of(request: &Request) -> (Vec<Stage>, Result<Outcome, Failure>) {
        let mut seen = Vec::new();
        let result = run_with_observer(request, |s| seen.push(s));
        (seen, result)
    }

    #[test]
    fn default_request_uses_columns_zero_and_three() {
        let dir = TempDir::new().unwrap();
        let source = write_sample(dir.path());

        let (seen, result) = stages_of(&Request::new(&source));
        let outcome = result.unwrap();
        assert_eq!(
            seen,
            [
                Stage::Idle,
                Stage::Loading,
                Stage::Filtering,
                Stage::Exporting,
                Stage::Rendering,
                Stage::Done
            ]
        );
        assert_eq!(outcome.series.x, vec![1.0, 2.0, 3.0]);
        assert_eq!(outcome.series.y, vec![9.0, 8.0, 7.0]);
        assert_eq!(outcome.plot.len(), 3);
        assert_eq!(outcome.plot.name, "sample");
        assert!(outcome.artifacts.text_path.exists());
        assert!(outcome.artifacts.binary_path.exists());
    }

    #[test]
    fn out_of_range_fails_while_filtering_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let source = write_sample(dir.path());

        let failure = run(&Request::new(&source).with_indices("0", "4")).unwrap_err();
        assert_eq!(failure.stage, Stage::Filtering);
        assert!(matches!(
            failure.error,
            ConvertError::IndexRange { requested: 4, .. }
        ));
        assert!(!dir.path().join("sample_filtered.txt").exists());
        assert!(!dir.path().join("sample_filtered.fits").exists());
    }

    #[test]
    fn bad_index_text_fails_before_loading() {
        let dir = TempDir::new().unwrap();
        let source = write_sample(dir.path());

        let (seen, result) = stages_of(&Request::new(&source).with_indices("abc", "3"));
        let failure = result.unwrap_err();
        assert_eq!(seen, [Stage::Idle]);
        assert_eq!(failure.stage, Stage::Idle);
        assert!(matches!(
            failure.error,
            ConvertError::InvalidIndexFormat { ref input } if input == "abc"
        ));
        assert!(!dir.path().join("sample_filtered.txt").exists());
        assert!(!dir.path().join("sample_filtered.fits").exists());
    }

    #[test]
    fn missing_source_is_reported() {
        let failure = run(&Request::default()).unwrap_err();
        assert_eq!(failure.stage, Stage::Idle);
        assert!(matches!(failure.error, ConvertError::InputMissing));
    }

    #[test]
    fn unreadable_source_fails_while_loading() {
        let dir = TempDir::new().unwrap();
        let failure = run(&Request::new(dir.path().join("absent.fits"))).unwrap_err();
        assert_eq!(failure.stage, Stage::Loading);
        assert_eq!(failure.error.kind(), "read_error");
    }

    #[test]
    fn zero_column_filters_rows() {
        let dir = TempDir::new().unwrap();
        let source = write_sample(dir.path());

        let outcome = run(&Request::new(&source).with_indices("0", "1")).unwrap();
        assert_eq!(outcome.series.x, vec![2.0]);
        assert_eq!(outcome.series.y, vec![2.0]);
        assert_eq!(outcome.plot.points, vec![[2.0, 2.0]]);
    }

    #[test]
    fn blocked_binary_output_fails_while_exporting() {
        let dir = TempDir::new().unwrap();
        let source = write_sample(dir.path());
        std::fs::create_dir(dir.path().join("sample_filtered.fits")).unwrap();

        let (seen, result) = stages_of(&Request::new(&source));
        let failure = result.unwrap_err();
        assert_eq!(seen.last(), Some(&Stage::Exporting));
        assert!(!seen.contains(&Stage::Rendering));
        assert_eq!(failure.stage, Stage::Exporting);
        match failure.error {
            ConvertError::Write { which, ref path, .. } => {
                assert_eq!(which, OutputKind::Binary);
                assert_eq!(path, &dir.path().join("sample_filtered.fits"));
            }
            ref other => panic!("unexpected error: {other}"),
        }
        // The text export ran before the binary one.
        assert!(dir.path().join("sample_filtered.txt").is_file());
    }

    #[test]
    fn failure_message_names_the_stage() {
        let failure = Failure {
            stage: Stage::Exporting,
            error: ConvertError::InputMissing,
        };
        assert_eq!(
            failure.to_string(),
            "no source file was selected (while exporting)"
        );
    }
}
