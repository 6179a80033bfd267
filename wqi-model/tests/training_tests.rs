//! End-to-end training: synthesize, fit, persist, reload, serve

use std::io::Write;
use wqi_common::estimator::{predict, Calibration};
use wqi_common::{Assessment, ParameterSet, RuleTable};
use wqi_model::ensemble::{BoostingParams, EnsembleConfig, ForestParams};
use wqi_model::synthesis::{load_external_dataset, SynthesisConfig, SyntheticGenerator};
use wqi_model::training::{train_and_evaluate, TrainingConfig};
use wqi_model::{analysis, artifact};

fn small_ensemble() -> EnsembleConfig {
    EnsembleConfig {
        forest: ForestParams {
            n_trees: 25,
            max_depth: 10,
            ..Default::default()
        },
        boosting: BoostingParams {
            n_rounds: 80,
            learning_rate: 0.1,
            max_depth: 5,
            ..Default::default()
        },
        cv_folds: 3,
    }
}

#[test]
fn test_synthetic_training_learns_the_rules() {
    let rules = RuleTable::default();
    let table = SyntheticGenerator::from_config(&SynthesisConfig::default())
        .unwrap()
        .generate(1000, &rules)
        .unwrap();

    let report = train_and_evaluate(&table, &small_ensemble(), &TrainingConfig::default()).unwrap();
    let meta = &report.ensemble.metadata;

    assert_eq!(report.skipped_rows, 0);
    assert_eq!(meta.train_rows, 800);
    assert_eq!(meta.test_rows, 200);
    assert!(meta.r2 > 0.5, "held-out R2 too low: {}", meta.r2);
    assert!(meta.mae < 15.0, "held-out MAE too high: {}", meta.mae);
    assert!((meta.feature_importances.values().sum::<f64>() - 1.0).abs() < 1e-9);
}

#[test]
fn test_artifact_round_trip_serves_predictions() {
    let rules = RuleTable::default();
    let table = SyntheticGenerator::from_config(&SynthesisConfig::default())
        .unwrap()
        .generate(400, &rules)
        .unwrap();
    let report = train_and_evaluate(&table, &small_ensemble(), &TrainingConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    artifact::save(&path, &report.ensemble).unwrap();
    let loaded = artifact::load(&path).unwrap();

    let ideal = ParameterSet::from_array([7.0, 2.0, 200.0, 8.0, 20.0, 500.0, 0.5, 3.0]);
    let prediction = predict(&loaded, &ideal, &Calibration::default());
    assert!(!prediction.is_error());
    assert!(prediction.wqi <= 100);
    assert_eq!(
        prediction.assessment,
        Assessment::from_index(prediction.wqi).label()
    );
}

#[test]
fn test_external_dataset_with_gaps_trains_on_complete_rows() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pH,Turbidity,TDS,DO,Temp,Conductivity,Chlorine,Nitrate,Quality").unwrap();
    for i in 0..120 {
        let v = i as f64;
        let turbidity = if i % 10 == 0 { String::new() } else { format!("{:.1}", (v * 0.37) % 25.0) };
        let label = if i % 2 == 0 { "Safe" } else { "Unsafe" };
        writeln!(
            file,
            "{:.2},{},{:.0},{:.2},{:.1},{:.0},{:.2},{:.1},{}",
            6.0 + (v * 0.13) % 3.0,
            turbidity,
            100.0 + (v * 17.0) % 900.0,
            3.0 + (v * 0.29) % 8.0,
            12.0 + (v * 0.7) % 20.0,
            300.0 + (v * 23.0) % 1500.0,
            0.1 + (v * 0.05) % 1.5,
            (v * 0.41) % 30.0,
            label
        )
        .unwrap();
    }

    let rules = RuleTable::default();
    let table = load_external_dataset(file.path(), &rules).unwrap();
    assert_eq!(table.len(), 120);

    let report = train_and_evaluate(&table, &small_ensemble(), &TrainingConfig::default()).unwrap();
    assert_eq!(report.skipped_rows, 12);
    assert_eq!(report.ensemble.metadata.train_rows + report.ensemble.metadata.test_rows, 108);

    let summary = analysis::analyze(&table, Some(&report.ensemble));
    assert_eq!(summary.groups.len(), 2);
    assert!(summary.safe_mean.is_some());
    assert_eq!(summary.model_fit.unwrap().rows, 108);
}
