//! Command-line front end: process one FITS file without the viewer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use serde::Serialize;

use rusty_fits::data::model::ExportArtifacts;
use rusty_fits::pipeline::{self, Outcome, Request, Stage, DEFAULT_X_INDEX, DEFAULT_Y_INDEX};

/// Extract two columns from a FITS binary table, drop rows whose second
/// value is zero, and write `<stem>_filtered.txt` / `<stem>_filtered.fits`.
#[derive(Parser)]
#[command(name = "fits_filter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source file (.fits, or .parquet)
    path: Option<PathBuf>,

    /// Index of the x column
    #[arg(short = 'x', long, default_value = DEFAULT_X_INDEX, allow_hyphen_values = true)]
    x_col: String,

    /// Index of the y column (rows where it is zero are dropped)
    #[arg(short = 'y', long, default_value = DEFAULT_Y_INDEX, allow_hyphen_values = true)]
    y_col: String,

    /// Print a JSON summary instead of plain text
    #[arg(long)]
    json: bool,

    /// Print the first N filtered rows as a table
    #[arg(long, value_name = "ROWS")]
    preview: Option<usize>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Summary<'a> {
    Ok {
        #[serde(flatten)]
        artifacts: &'a ExportArtifacts,
        rows: usize,
        x_column: &'a str,
        y_column: &'a str,
    },
    Failed {
        stage: Stage,
        kind: &'static str,
        message: String,
    },
}

fn print_preview(outcome: &Outcome, rows: usize) -> Result<()> {
    let batch = outcome
        .series
        .to_record_batch()
        .context("building preview batch")?;
    let head = batch.slice(0, rows.min(batch.num_rows()));
    println!("{}", pretty_format_batches(&[head]).context("formatting preview")?);
    Ok(())
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    let request = Request {
        source: cli.path,
        x_index: cli.x_col,
        y_index: cli.y_col,
    };

    match pipeline::run(&request) {
        Ok(outcome) => {
            if cli.json {
                let summary = Summary::Ok {
                    artifacts: &outcome.artifacts,
                    rows: outcome.series.len(),
                    x_column: &outcome.series.x_name,
                    y_column: &outcome.series.y_name,
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Kept {} rows ('{}' vs '{}')",
                    outcome.series.len(),
                    outcome.series.x_name,
                    outcome.series.y_name
                );
                println!("Text:  {}", outcome.artifacts.text_path.display());
                println!("FITS:  {}", outcome.artifacts.binary_path.display());
            }
            if let Some(rows) = cli.preview {
                print_preview(&outcome, rows)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if cli.json {
                let summary = Summary::Failed {
                    stage: failure.stage,
                    kind: failure.error.kind(),
                    message: failure.error.to_string(),
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                eprintln!("Error: {failure}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
