//! Writes a deterministic synthetic SMS measurement table as CSV and Parquet.
//!
//! Each of the six RI media gets one unetched and one etched transmission
//! curve. The diagnostic dip near 1.19 µm red-shifts with RI, far more
//! strongly for the etched fiber.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use sms_spectra::config::AnalysisConfig;

#[derive(Parser)]
#[command(name = "generate_sample", about = "Write a synthetic SMS measurement table")]
struct Args {
    /// Output path without extension; `.csv` and `.parquet` are appended
    #[arg(short, long, default_value = "sample_data")]
    output: PathBuf,

    /// PRNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Noise standard deviation in dB
    #[arg(long, default_value_t = 0.02)]
    noise: f64,
}

/// Gaussian dip: (centre, sigma, depth in dB)
type Dip = (f64, f64, f64);

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(wavelength: &[f64], dips: &[Dip], noise_level: f64, rng: &mut SimpleRng) -> Vec<f64> {
    wavelength
        .iter()
        .map(|&wl| {
            let loss: f64 = dips
                .iter()
                .map(|&(mu, sigma, depth)| gaussian(wl, mu, sigma, depth))
                .sum();
            -2.0 - loss + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn write_csv(path: &Path, columns: &[(String, Vec<f64>)]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(columns.iter().map(|(name, _)| name.as_str()))?;
    let n_rows = columns.first().map_or(0, |(_, v)| v.len());
    for i in 0..n_rows {
        wtr.write_record(columns.iter().map(|(_, v)| v[i].to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, columns: &[(String, Vec<f64>)]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, v)| Arc::new(Float64Array::from(v.clone())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating Parquet writer")?;
    writer.write(&batch).context("writing Parquet batch")?;
    writer.close().context("closing Parquet writer")?;
    Ok(batch)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let cfg = AnalysisConfig::default();
    let mut rng = SimpleRng::new(args.seed);

    // 1.00 → 1.50 µm, step 0.5 nm
    let wavelength: Vec<f64> = (0..=1000).map(|i| 1.0 + i as f64 * 0.0005).collect();

    let mut columns = vec![(cfg.wavelength_column.clone(), wavelength.clone())];
    let mut etched_columns = Vec::new();
    for ((label, unetched), etched) in cfg
        .ri_labels
        .iter()
        .zip(&cfg.unetched_columns)
        .zip(&cfg.etched_columns)
    {
        let ri: f64 = label.parse().with_context(|| format!("RI label '{label}'"))?;
        let shift = ri - 1.33;

        let unetched_dips = [(1.185 + 0.05 * shift, 0.006, 6.0), (1.32, 0.012, 3.0), (1.10, 0.02, 1.5)];
        let etched_dips = [(1.175 + 0.4 * shift, 0.008, 8.0), (1.34 + 0.2 * shift, 0.015, 4.0), (1.08, 0.02, 2.0)];

        let u = generate_spectrum(&wavelength, &unetched_dips, args.noise, &mut rng);
        let e = generate_spectrum(&wavelength, &etched_dips, args.noise, &mut rng);
        columns.push((unetched.clone(), u));
        etched_columns.push((etched.clone(), e));
    }
    columns.extend(etched_columns);

    let csv_path = args.output.with_extension("csv");
    let parquet_path = args.output.with_extension("parquet");
    write_csv(&csv_path, &columns)?;
    let batch = write_parquet(&parquet_path, &columns)?;

    println!("{}", pretty_format_batches(&[batch.slice(0, 5)])?);
    println!(
        "Wrote {} curves ({} wavelengths each) to {} and {}",
        columns.len() - 1,
        wavelength.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
