use std::path::PathBuf;

use rusty_fits::data::model::ExportArtifacts;
use rusty_fits::pipeline::{self, Failure, Outcome, Request, Stage};
use rusty_fits::plot::RenderedPlot;
use rusty_fits::ConvertError;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Text of the "first column" entry.
    pub x_index_input: String,

    /// Text of the "second column" entry.
    pub y_index_input: String,

    /// Plot of the last successful request (kept when a later one fails).
    pub plot: Option<RenderedPlot>,

    /// Output paths of the last successful request.
    pub artifacts: Option<ExportArtifacts>,

    /// Last stage reached by the current or last request.
    pub stage: Stage,

    /// Status line shown in the top bar.
    pub status_message: Option<String>,

    /// Error shown in red; cleared when a new request starts.
    pub error_message: Option<String>,

    /// Whether a request is in progress.
    pub busy: bool,
}

impl Default for AppState {
    fn default() -> Self {
        let defaults = Request::default();
        Self {
            x_index_input: defaults.x_index,
            y_index_input: defaults.y_index,
            plot: None,
            artifacts: None,
            stage: Stage::Idle,
            status_message: None,
            error_message: None,
            busy: false,
        }
    }
}

impl AppState {
    /// Build a request from the current entries.
    pub fn request_for(&self, source: Option<PathBuf>) -> Request {
        Request {
            source,
            x_index: self.x_index_input.clone(),
            y_index: self.y_index_input.clone(),
        }
    }

    /// Run one request synchronously.  Ignored while another is in flight.
    pub fn process(&mut self, source: Option<PathBuf>) {
        if self.busy {
            log::warn!("Ignoring request: another file is still being processed");
            return;
        }
        self.busy = true;
        self.error_message = None;
        self.status_message = Some("Processing…".to_string());

        let request = self.request_for(source);
        let result = pipeline::run_with_observer(&request, |stage| self.stage = stage);
        self.finish(result);
    }

    /// Fold a finished request into the UI state.
    pub fn finish(&mut self, result: Result<Outcome, Failure>) {
        self.busy = false;
        match result {
            Ok(outcome) => {
                self.stage = Stage::Done;
                self.status_message = Some(format!(
                    "Done: kept {} rows of '{}' vs '{}'",
                    outcome.series.len(),
                    outcome.series.x_name,
                    outcome.series.y_name
                ));
                self.artifacts = Some(outcome.artifacts);
                self.plot = Some(outcome.plot);
            }
            Err(Failure {
                stage,
                error: ConvertError::InputMissing,
            }) => {
                self.stage = stage;
                self.status_message = Some("No file selected.".to_string());
            }
            Err(failure) => {
                self.stage = failure.stage;
                self.status_message = Some("Processing failed.".to_string());
                self.error_message = Some(format!("Error: {failure}"));
            }
        }
    }
}
