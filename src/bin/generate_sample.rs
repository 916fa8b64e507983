use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};

use rusty_fits::fits::{self, ColumnData, TForm, TypeCode};

/// Depth of a Gaussian absorption line at `wl`.
fn line_depth(wl: f64, (centre, width, depth): (f64, f64, f64)) -> f64 {
    depth * (-(wl - centre).powi(2) / (2.0 * width.powi(2))).exp()
}

/// Sloped continuum minus absorption lines, plus detector noise.
fn generate_flux(
    wavelengths: &[f64],
    lines: &[(f64, f64, f64)],
    noise_sigma: f64,
    noise: &mut Noise,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let continuum = 1.0 + 2.0e-4 * (wl - 6000.0);
            let absorption: f64 = lines.iter().map(|&line| line_depth(wl, line)).sum();
            continuum - absorption + noise_sigma * noise.standard_normal()
        })
        .collect()
}

/// Seeded splitmix64 stream, so the sample file is identical on every run.
struct Noise(u64);

impl Noise {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller.
    fn standard_normal(&mut self) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// Writes a one-row spectrum in the usual archive layout: every column is a
/// vector cell, so the loader has to flatten it.
///
/// Columns: WAVE (D), FLUX (E), ERR (E), FLUX_REDUCED (E).  FLUX_REDUCED is
/// zero inside the telluric bands, so the default indices (0, 3) exercise the
/// zero filter.
fn main() -> Result<()> {
    env_logger::init();
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_spectrum.fits"));

    let mut noise = Noise(42);

    // Wavelengths: 5000 → 7998 Å, step 2
    let wave: Vec<f64> = (0..1500).map(|i| 5000.0 + i as f64 * 2.0).collect();

    let lines = [
        (5175.0, 4.0, 0.35), // Mg b
        (5892.0, 3.0, 0.55), // Na D
        (6563.0, 6.0, 0.70), // H-alpha
    ];
    let flux = generate_flux(&wave, &lines, 0.01, &mut noise);
    let err: Vec<f64> = flux.iter().map(|f| 0.01 * f.abs().max(0.1)).collect();

    let telluric = [(6860.0, 6960.0), (7590.0, 7700.0)];
    let reduced: Vec<f64> = wave
        .iter()
        .zip(&flux)
        .map(|(&wl, &f)| {
            if telluric.iter().any(|&(lo, hi)| wl >= lo && wl <= hi) {
                0.0
            } else {
                f
            }
        })
        .collect();

    let n = wave.len();
    let columns = [
        ColumnData {
            name: "WAVE",
            form: TForm::new(n, TypeCode::Float64),
            values: &wave,
        },
        ColumnData {
            name: "FLUX",
            form: TForm::new(n, TypeCode::Float32),
            values: &flux,
        },
        ColumnData {
            name: "ERR",
            form: TForm::new(n, TypeCode::Float32),
            values: &err,
        },
        ColumnData {
            name: "FLUX_REDUCED",
            form: TForm::new(n, TypeCode::Float32),
            values: &reduced,
        },
    ];

    let file = File::create(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    fits::write_table(&mut out, &columns).context("writing FITS table")?;

    let masked = reduced.iter().filter(|v| **v == 0.0).count();
    println!(
        "Wrote 1 spectrum ({n} samples, {masked} masked) to {}",
        output_path.display()
    );
    Ok(())
}
