use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// FieldValue – a single cell of the feature table
// ---------------------------------------------------------------------------

/// A feature-table cell: either a categorical label or a number.
/// Used as a grouping key, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use FieldValue::*;
        match (self, other) {
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Number(_), Text(_)) => std::cmp::Ordering::Less,
            (Text(_), Number(_)) => std::cmp::Ordering::Greater,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Number(v) => write!(f, "{v}"),
        }
    }
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumCurve – one transmission measurement
// ---------------------------------------------------------------------------

/// Minimum number of samples a curve must carry.
pub const MIN_CURVE_SAMPLES: usize = 3;

/// One transmission spectrum with its RI and diameter labels.
///
/// Construction validates the sampling grid; once built the curve is
/// immutable.
#[derive(Debug, Clone)]
pub struct SpectrumCurve {
    wavelength: Vec<f64>,
    transmission: Vec<f64>,
    ri: String,
    diameter: String,
}

impl SpectrumCurve {
    pub fn new(
        wavelength: Vec<f64>,
        transmission: Vec<f64>,
        ri: impl Into<String>,
        diameter: impl Into<String>,
    ) -> Result<Self> {
        validate_grid(&wavelength)?;
        if wavelength.len() != transmission.len() {
            return Err(AnalysisError::invalid(format!(
                "wavelength has {} samples but transmission has {}",
                wavelength.len(),
                transmission.len()
            )));
        }
        Ok(Self {
            wavelength,
            transmission,
            ri: ri.into(),
            diameter: diameter.into(),
        })
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn transmission(&self) -> &[f64] {
        &self.transmission
    }

    pub fn ri(&self) -> &str {
        &self.ri
    }

    pub fn diameter(&self) -> &str {
        &self.diameter
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

/// Mean spacing of a strictly increasing grid.
pub fn mean_step(wavelength: &[f64]) -> f64 {
    let n = wavelength.len();
    if n < 2 {
        return 0.0;
    }
    (wavelength[n - 1] - wavelength[0]) / (n - 1) as f64
}

/// Largest relative deviation of any sample spacing from the mean spacing.
/// Zero for a perfectly uniform grid.
pub fn spacing_irregularity(wavelength: &[f64]) -> f64 {
    let step = mean_step(wavelength);
    if step <= 0.0 {
        return 0.0;
    }
    wavelength
        .windows(2)
        .map(|w| ((w[1] - w[0]) - step).abs() / step)
        .fold(0.0, f64::max)
}

fn validate_grid(wavelength: &[f64]) -> Result<()> {
    if wavelength.len() < MIN_CURVE_SAMPLES {
        return Err(AnalysisError::invalid(format!(
            "curve needs at least {MIN_CURVE_SAMPLES} samples, got {}",
            wavelength.len()
        )));
    }
    if let Some(i) = wavelength.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(AnalysisError::invalid(format!(
            "wavelength is not strictly increasing at sample {} ({} -> {})",
            i + 1,
            wavelength[i],
            wavelength[i + 1]
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CurvePair – unetched and etched transmission for one RI sample
// ---------------------------------------------------------------------------

/// Both fiber configurations measured in the same RI medium on a shared grid.
#[derive(Debug, Clone)]
pub struct CurvePair {
    pub ri: String,
    wavelength: Vec<f64>,
    unetched: Vec<f64>,
    etched: Vec<f64>,
}

impl CurvePair {
    pub fn new(
        ri: impl Into<String>,
        wavelength: Vec<f64>,
        unetched: Vec<f64>,
        etched: Vec<f64>,
    ) -> Result<Self> {
        validate_grid(&wavelength)?;
        if unetched.len() != wavelength.len() || etched.len() != wavelength.len() {
            return Err(AnalysisError::invalid(format!(
                "curve pair lengths differ: wavelength {}, unetched {}, etched {}",
                wavelength.len(),
                unetched.len(),
                etched.len()
            )));
        }
        Ok(Self {
            ri: ri.into(),
            wavelength,
            unetched,
            etched,
        })
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn unetched(&self) -> &[f64] {
        &self.unetched
    }

    pub fn etched(&self) -> &[f64] {
        &self.etched
    }

    /// RI label parsed as a number, if it is one.
    pub fn ri_value(&self) -> Option<f64> {
        self.ri.trim().parse().ok()
    }
}

// ---------------------------------------------------------------------------
// MeasurementTable – the wide input table
// ---------------------------------------------------------------------------

/// Wide table of equally long numeric columns, in file order.
/// One `Wavelength` column plus one transmission column per (diameter × RI).
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl MeasurementTable {
    pub fn new(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if let Some((first_name, first)) = columns.first() {
            for (name, values) in &columns {
                if values.len() != first.len() {
                    return Err(AnalysisError::invalid(format!(
                        "column '{name}' has {} rows but '{first_name}' has {}",
                        values.len(),
                        first.len()
                    )));
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<f64>> {
        self.columns
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    /// Keep only the rows whose index satisfies `keep`.
    pub fn retain_rows<F: Fn(usize) -> bool>(&self, keep: F) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let kept = values
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| keep(*i))
                    .map(|(_, v)| *v)
                    .collect();
                (name.clone(), kept)
            })
            .collect();
        Self { columns }
    }

    /// Iterate rows as value vectors, in column order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.n_rows()).map(move |i| self.columns.iter().map(|(_, v)| v[i]).collect())
    }

    pub fn curve(
        &self,
        wavelength_column: &str,
        column: &str,
        ri: &str,
        diameter: &str,
    ) -> Result<SpectrumCurve> {
        SpectrumCurve::new(
            self.column(wavelength_column)?.to_vec(),
            self.column(column)?.to_vec(),
            ri,
            diameter,
        )
    }

    pub fn pair(
        &self,
        wavelength_column: &str,
        unetched_column: &str,
        etched_column: &str,
        ri: &str,
    ) -> Result<CurvePair> {
        CurvePair::new(
            ri,
            self.column(wavelength_column)?.to_vec(),
            self.column(unetched_column)?.to_vec(),
            self.column(etched_column)?.to_vec(),
        )
    }
}

// ---------------------------------------------------------------------------
// FeatureRecord / FeatureTable – extracted peak features
// ---------------------------------------------------------------------------

pub const COL_DIAMETER: &str = "MMF Diameter";
pub const COL_ENVIRONMENT: &str = "surrounding environment";
pub const COL_WAVELENGTH: &str = "Wavelength";
pub const COL_TRANSMISSION: &str = "Transmission";
pub const COL_WIDTH: &str = "Spectral width";
pub const COL_PROMINENCE: &str = "Prominence";

/// One retained dip of one curve. Field order matches the exported CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "MMF Diameter")]
    pub diameter: String,
    #[serde(rename = "surrounding environment")]
    pub ri: String,
    #[serde(rename = "Wavelength")]
    pub wavelength: f64,
    #[serde(rename = "Transmission")]
    pub transmission: f64,
    #[serde(rename = "Spectral width")]
    pub spectral_width: f64,
    #[serde(rename = "Prominence")]
    pub prominence: f64,
}

impl FeatureRecord {
    /// Look up a field by its table column name.
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            COL_DIAMETER => Some(FieldValue::Text(self.diameter.clone())),
            COL_ENVIRONMENT => Some(FieldValue::Text(self.ri.clone())),
            COL_WAVELENGTH => Some(FieldValue::Number(self.wavelength)),
            COL_TRANSMISSION => Some(FieldValue::Number(self.transmission)),
            COL_WIDTH => Some(FieldValue::Number(self.spectral_width)),
            COL_PROMINENCE => Some(FieldValue::Number(self.prominence)),
            _ => None,
        }
    }
}

/// All retained features of a run, one row per dip.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub const COLUMNS: [&'static str; 6] = [
        COL_DIAMETER,
        COL_ENVIRONMENT,
        COL_WAVELENGTH,
        COL_TRANSMISSION,
        COL_WIDTH,
        COL_PROMINENCE,
    ];

    pub fn new(records: Vec<FeatureRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = FeatureRecord>) {
        self.records.extend(records);
    }

    /// Every value of `column`, in row order.
    pub fn values(&self, column: &str) -> Result<Vec<FieldValue>> {
        if !Self::COLUMNS.contains(&column) {
            return Err(AnalysisError::MissingColumn(column.to_string()));
        }
        Ok(self.records.iter().filter_map(|r| r.field(column)).collect())
    }

    /// Numeric values of `column` split by the distinct values of `group_by`.
    /// Groups come out sorted by key; rows keep table order inside a group.
    pub fn numeric_groups(
        &self,
        column: &str,
        group_by: &str,
    ) -> Result<BTreeMap<FieldValue, Vec<f64>>> {
        for c in [column, group_by] {
            if !Self::COLUMNS.contains(&c) {
                return Err(AnalysisError::MissingColumn(c.to_string()));
            }
        }
        let mut groups: BTreeMap<FieldValue, Vec<f64>> = BTreeMap::new();
        for rec in &self.records {
            let (Some(key), Some(value)) = (rec.field(group_by), rec.field(column)) else {
                continue;
            };
            let Some(v) = value.as_f64() else {
                return Err(AnalysisError::invalid(format!(
                    "column '{column}' is not numeric"
                )));
            };
            groups.entry(key).or_default().push(v);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(diameter: &str, ri: &str, wavelength: f64) -> FeatureRecord {
        FeatureRecord {
            diameter: diameter.to_string(),
            ri: ri.to_string(),
            wavelength,
            transmission: -1.0,
            spectral_width: 0.01,
            prominence: 1.0,
        }
    }

    #[test]
    fn curve_rejects_non_increasing_wavelength() {
        let err = SpectrumCurve::new(vec![1.0, 1.1, 1.1, 1.2], vec![0.0; 4], "1.33", "125 µm");
        assert!(matches!(err, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn curve_rejects_length_mismatch() {
        let err = SpectrumCurve::new(vec![1.0, 1.1, 1.2], vec![0.0; 2], "1.33", "125 µm");
        assert!(err.is_err());
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = MeasurementTable::new(vec![
            ("Wavelength".to_string(), vec![1.0, 2.0]),
            ("RI_B".to_string(), vec![1.0]),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn missing_column_is_labelled() {
        let table = MeasurementTable::new(vec![("Wavelength".to_string(), vec![1.0])]).unwrap();
        match table.column("RI_B") {
            Err(AnalysisError::MissingColumn(c)) => assert_eq!(c, "RI_B"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn irregular_spacing_is_measured() {
        assert_eq!(spacing_irregularity(&[0.0, 1.0, 2.0, 3.0]), 0.0);
        assert!(spacing_irregularity(&[0.0, 1.0, 1.5, 3.0]) > 0.4);
    }

    #[test]
    fn groups_are_sorted_by_label() {
        let table = FeatureTable::new(vec![
            record("25 µm", "1.33", 1.2),
            record("125 µm", "1.33", 1.1),
            record("25 µm", "1.35", 1.3),
        ]);
        let groups = table.numeric_groups(COL_WAVELENGTH, COL_DIAMETER).unwrap();
        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["125 µm", "25 µm"]);
        assert_eq!(groups[&FieldValue::Text("25 µm".into())], vec![1.2, 1.3]);
    }

    #[test]
    fn categorical_column_cannot_be_tested() {
        let table = FeatureTable::new(vec![record("25 µm", "1.33", 1.2)]);
        assert!(table.numeric_groups(COL_ENVIRONMENT, COL_DIAMETER).is_err());
    }
}
