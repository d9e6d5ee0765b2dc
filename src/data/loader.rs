use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::MeasurementTable;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a wide measurement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one numeric column per measurement
/// * `.parquet` – flat Float64 / Float32 / Int columns
/// * `.json`    – `[{ "Wavelength": 1.04, "RI_Water": 0.12, ... }, ...]`
///
/// Empty or non-numeric cells become NaN.
pub fn load_table(path: &Path) -> Result<MeasurementTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::info!(
        "loaded {} rows x {} columns from {}",
        table.n_rows(),
        table.column_names().count(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<MeasurementTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but {} headers",
                record.len(),
                headers.len()
            );
        }
        for (col, value) in record.iter().enumerate() {
            columns[col].push(parse_cell(value));
        }
    }

    Ok(MeasurementTable::new(headers.into_iter().zip(columns).collect())?)
}

fn parse_cell(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
/// The first record decides which columns exist, in its key order.
fn load_json(path: &Path) -> Result<MeasurementTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let Some(first) = records.first() else {
        return Ok(MeasurementTable::default());
    };
    let names: Vec<String> = first
        .as_object()
        .context("Row 0 is not a JSON object")?
        .keys()
        .cloned()
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(records.len()); names.len()];

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for (col, name) in names.iter().enumerate() {
            let value = obj.get(name).and_then(JsonValue::as_f64).unwrap_or(f64::NAN);
            columns[col].push(value);
        }
    }

    Ok(MeasurementTable::new(names.into_iter().zip(columns).collect())?)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat numeric column per measurement.
/// Works with files written by both Pandas and Polars.
fn load_parquet(path: &Path) -> Result<MeasurementTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col, name) in names.iter().enumerate() {
            let array = batch.column(col);
            extend_f64(&mut columns[col], array)
                .with_context(|| format!("column '{name}'"))?;
        }
    }

    Ok(MeasurementTable::new(names.into_iter().zip(columns).collect())?)
}

/// Append a numeric Arrow column to `out`, nulls as NaN.
fn extend_f64(out: &mut Vec<f64>, col: &Arc<dyn Array>) -> Result<()> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            out.extend(arr.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            out.extend(arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)));
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            out.extend(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        other => bail!("Expected a numeric column, got {other:?}"),
    }
    Ok(())
}
