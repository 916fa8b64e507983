//! Extract two columns from the binary table of a FITS file, drop rows whose
//! second value is zero, and export the pair as text and as a new FITS table.
//!
//! The crate is organised as:
//!
//! - **fits**: header cards, HDU walking, BINTABLE decode/encode
//! - **data**: the in-memory table, loading, column filtering, export
//! - **plot**: the surface-independent line plot of a filtered series
//! - **pipeline**: one synchronous request and its stage state machine
//! - **error**: the error taxonomy surfaced to callers
//!
//! # Example
//!
//! ```no_run
//! use rusty_fits::pipeline::{run, Request};
//!
//! let outcome = run(&Request::new("ADP.2021-03-04T01:02:03.fits").with_indices("0", "3"))
//!     .unwrap();
//! println!("{}", outcome.artifacts.text_path.display());
//! ```

pub mod data;
pub mod error;
pub mod fits;
pub mod pipeline;
pub mod plot;

pub use error::{ConvertError, OutputKind};
pub use pipeline::{run, run_with_observer, Failure, Outcome, Request, Stage};
