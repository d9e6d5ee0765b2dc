use std::path::Path;

use approx::assert_relative_eq;

use sms_spectra::analysis::covariance::covariance;
use sms_spectra::analysis::peaks::PeakExtractor;
use sms_spectra::analysis::shift::FirstMinimumTracker;
use sms_spectra::config::AnalysisConfig;
use sms_spectra::data::filter::preprocess;
use sms_spectra::data::loader::load_table;
use sms_spectra::data::model::{
    COL_DIAMETER, COL_WAVELENGTH, CurvePair, FeatureRecord, FeatureTable, MeasurementTable,
    SpectrumCurve,
};
use sms_spectra::report;
use sms_spectra::stats::{GroupVerdict, PairedOutcome, StatisticalComparer};
use sms_spectra::{curve_pairs, extract_features};

fn gaussian_dip(wl: f64, center: f64, depth: f64, fwhm: f64) -> f64 {
    let sigma = fwhm / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
    -depth * (-(wl - center).powi(2) / (2.0 * sigma * sigma)).exp()
}

fn feature(diameter: &str, ri: &str, wavelength: f64) -> FeatureRecord {
    FeatureRecord {
        diameter: diameter.to_string(),
        ri: ri.to_string(),
        wavelength,
        transmission: -3.0,
        spectral_width: 0.01,
        prominence: 2.0,
    }
}

/// Noise-free wide table in the default column layout, 1.00 → 1.50 µm.
fn synthetic_table(cfg: &AnalysisConfig) -> MeasurementTable {
    let wavelength: Vec<f64> = (0..=1000).map(|i| 1.0 + i as f64 * 0.0005).collect();
    let spectrum = |dips: &[(f64, f64, f64)]| -> Vec<f64> {
        wavelength
            .iter()
            .map(|&wl| -2.0 + dips.iter().map(|&(c, d, w)| gaussian_dip(wl, c, d, w)).sum::<f64>())
            .collect()
    };

    let mut unetched = Vec::new();
    let mut etched = Vec::new();
    for ((label, u), e) in cfg
        .ri_labels
        .iter()
        .zip(&cfg.unetched_columns)
        .zip(&cfg.etched_columns)
    {
        let shift: f64 = label.parse::<f64>().unwrap() - 1.33;
        unetched.push((
            u.clone(),
            spectrum(&[(1.185 + 0.05 * shift, 6.0, 0.014), (1.32, 3.0, 0.028), (1.10, 1.5, 0.047)]),
        ));
        etched.push((
            e.clone(),
            spectrum(&[(1.175 + 0.4 * shift, 8.0, 0.019), (1.34 + 0.2 * shift, 4.0, 0.035), (1.08, 2.0, 0.047)]),
        ));
    }
    let mut columns = vec![(cfg.wavelength_column.clone(), wavelength.clone())];
    columns.extend(unetched);
    columns.extend(etched);
    MeasurementTable::new(columns).unwrap()
}

#[test]
fn single_dip_yields_one_feature() {
    let wl: Vec<f64> = (0..2001).map(|i| 1.10 + i as f64 * 1e-4).collect();
    let t: Vec<f64> = wl.iter().map(|&w| gaussian_dip(w, 1.20, 5.0, 0.01)).collect();
    let curve = SpectrumCurve::new(wl, t, "1.33", "125 µm").unwrap();

    let features = PeakExtractor::default().extract(&curve);
    assert_eq!(features.len(), 1);
    assert_relative_eq!(features[0].wavelength, 1.20, epsilon = 1e-6);
    assert_relative_eq!(features[0].prominence, 5.0, epsilon = 1e-3);
    assert_relative_eq!(features[0].spectral_width, 0.01, epsilon = 2e-4);
}

#[test]
fn constant_minimum_has_zero_sensitivity() {
    let wl: Vec<f64> = (0..400).map(|i| 1.10 + i as f64 * 0.0005).collect();
    let t: Vec<f64> = wl.iter().map(|&w| gaussian_dip(w, 1.19, 3.0, 0.01)).collect();
    let pairs: Vec<CurvePair> = ["1.33", "1.35", "1.37", "1.39", "1.40"]
        .iter()
        .map(|ri| CurvePair::new(*ri, wl.clone(), t.clone(), t.clone()).unwrap())
        .collect();

    let sensitivity = FirstMinimumTracker::default().sensitivity(&pairs).unwrap();
    assert_eq!(sensitivity.ri.len(), 5);
    assert!(sensitivity.sensitivity_125.iter().all(|s| *s == 0.0));
    assert!(sensitivity.sensitivity_25.iter().all(|s| *s == 0.0));
}

#[test]
fn separated_diameters_differ_under_anova() {
    let mut records = Vec::new();
    for i in 1..=5 {
        records.push(feature("125 µm", "1.33", i as f64));
        records.push(feature("25 µm", "1.33", 9.0 + i as f64));
    }
    let table = FeatureTable::new(records);
    let cmp = StatisticalComparer::new(&table, 0.05).unwrap();
    let anova = cmp.group_comparison(COL_WAVELENGTH, COL_DIAMETER).unwrap();
    assert_relative_eq!(anova.f_statistic, 81.0, epsilon = 1e-9);
    assert_eq!(anova.verdict, GroupVerdict::SignificantDifference);
}

#[test]
fn two_pairs_are_insufficient_for_wilcoxon() {
    let table = FeatureTable::new(vec![
        feature("125 µm", "1.33", 1.20),
        feature("125 µm", "1.35", 1.21),
        feature("25 µm", "1.33", 1.18),
        feature("25 µm", "1.35", 1.19),
    ]);
    let cmp = StatisticalComparer::new(&table, 0.05).unwrap();
    let outcome = cmp.paired_test(COL_WAVELENGTH, "125 µm", "25 µm").unwrap();
    assert!(matches!(outcome, PairedOutcome::InsufficientPairedSamples { n: 2, .. }));
}

#[test]
fn etched_fiber_is_more_sensitive() {
    let cfg = AnalysisConfig::default();
    let table = preprocess(&synthetic_table(&cfg), &cfg).unwrap();
    let pairs = curve_pairs(&table, &cfg).unwrap();
    let tracker = FirstMinimumTracker::new(cfg.minimum_window.0, cfg.minimum_window.1);

    let landslide = tracker.landslide(&pairs);
    assert_eq!(landslide.len(), 6);
    assert!(landslide.min_25.windows(2).all(|w| w[1] > w[0]));

    let sensitivity = tracker.sensitivity(&pairs).unwrap();
    for (s125, s25) in sensitivity.sensitivity_125.iter().zip(&sensitivity.sensitivity_25) {
        assert!(s25 > s125, "etched {s25} should exceed unetched {s125}");
    }
}

#[test]
fn full_run_writes_every_table() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("measurements.csv");
    let mut cfg = AnalysisConfig::default();
    report::write_table(&input, &synthetic_table(&cfg)).unwrap();
    cfg.tables_dir = tmp.path().join("Results").join("tables");
    cfg.processed_dir = tmp.path().join("Data").join("processed");

    let raw = load_table(&input).unwrap();
    let table = preprocess(&raw, &cfg).unwrap();
    report::ensure_dir(&cfg.tables_dir).unwrap();
    report::ensure_dir(&cfg.processed_dir).unwrap();
    let tables: &Path = &cfg.tables_dir;

    report::write_table(&cfg.processed_dir.join(report::PROCESSED_FILE), &table).unwrap();
    let pairs = curve_pairs(&table, &cfg).unwrap();
    let tracker = FirstMinimumTracker::new(cfg.minimum_window.0, cfg.minimum_window.1);
    report::write_landslide(&tables.join(report::LANDSLIDE_FILE), &tracker.landslide(&pairs))
        .unwrap();
    report::write_sensitivity(
        &tables.join(report::SENSITIVITY_FILE),
        &tracker.sensitivity(&pairs).unwrap(),
    )
    .unwrap();
    let cov = covariance(&table, &cfg.unetched_columns, &cfg.etched_columns).unwrap();
    report::write_covariance(tables, &cov, &cfg.ri_labels).unwrap();

    let features = extract_features(&table, &cfg).unwrap();
    assert_eq!(features.len(), 12 * cfg.peaks.top_k);
    report::write_features(&tables.join(report::FEATURES_FILE), &features).unwrap();
    report::write_features(&cfg.processed_dir.join(report::FEATURES_FILE), &features).unwrap();

    let cmp = StatisticalComparer::new(&features, cfg.alpha).unwrap();
    report::write_summary(&tables.join(report::SUMMARY_FILE), &cmp.summary()).unwrap();
    let normality = cmp.normality_by_group(&cfg.test_column, COL_DIAMETER).unwrap();
    assert_eq!(normality.len(), 2);
    report::write_normality(&tables.join(report::NORMALITY_FILE), &normality).unwrap();
    let anova = cmp.group_comparison(&cfg.test_column, COL_DIAMETER).unwrap();
    report::write_anova(&tables.join(report::ANOVA_FILE), &anova).unwrap();
    let paired = cmp
        .paired_test(&cfg.test_column, &cfg.unetched_label, &cfg.etched_label)
        .unwrap();
    assert_eq!(paired.record().map(|r| r.n), Some(18));
    report::write_wilcoxon(&tables.join(report::WILCOXON_FILE), &[paired]).unwrap();

    for file in [
        report::FEATURES_FILE,
        report::SUMMARY_FILE,
        report::NORMALITY_FILE,
        report::ANOVA_FILE,
        report::WILCOXON_FILE,
        report::LANDSLIDE_FILE,
        report::SENSITIVITY_FILE,
        report::COVARIANCE_UNETCHED_FILE,
        report::COVARIANCE_ETCHED_FILE,
        report::COVARIANCE_PER_RI_FILE,
    ] {
        assert!(tables.join(file).is_file(), "{file} missing");
    }
    assert!(cfg.processed_dir.join(report::PROCESSED_FILE).is_file());
    assert!(cfg.processed_dir.join(report::FEATURES_FILE).is_file());

    // features survive a CSV round trip
    let mut rdr = csv::Reader::from_path(tables.join(report::FEATURES_FILE)).unwrap();
    let back: Vec<FeatureRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(back.len(), features.len());
    assert_eq!(back[0].diameter, cfg.unetched_label);
}
