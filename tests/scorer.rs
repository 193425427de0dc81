use churn_scorer::config::ArtifactsConfig;
use churn_scorer::models::Classifier;
use churn_scorer::{ArtifactError, Record, Scorer, ScoringError};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models").join(name)
}

fn bundled_scorer() -> Scorer {
    Scorer::load(bundled("churn_model.json"), bundled("churn_threshold.txt"))
        .expect("bundled artifacts should load")
}

fn customer(senior: i32, tenure: i32, monthly: f64, total: f64) -> Record {
    Record::new()
        .with("senior_citizen", senior)
        .with("tenure", tenure)
        .with("monthly_charges", monthly)
        .with("total_charges", total)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[test]
fn test_bundled_artifacts_score_sample() {
    let scorer = bundled_scorer();
    assert!((scorer.threshold().value() - 0.42).abs() < 1e-12);
    assert_eq!(
        scorer.classifier().feature_names(),
        &["senior_citizen", "tenure", "monthly_charges", "total_charges"]
    );

    let sample = customer(0, 12, 70.5, 850.75)
        .with("gender", "Male")
        .with("contract", "Month-to-month");
    let table = scorer.predict_churn(sample).unwrap();

    assert_eq!(table.len(), 1);
    let row = table.rows()[0];
    assert!((row.probability - sigmoid(0.4)).abs() < 1e-5);
    assert_eq!(row.prediction, 1);
}

#[test]
fn test_three_row_batch_keeps_order() {
    let scorer = bundled_scorer();
    let table = scorer
        .predict_churn(vec![
            // 0.35 - 0.05 + 0.1
            customer(0, 12, 70.5, 850.75),
            // -0.3 - 0.05 - 0.15
            customer(0, 60, 20.0, 4200.0),
            // -0.1 + 0.2 + 0.1
            customer(1, 3, 45.0, 135.0),
        ])
        .unwrap();

    assert_eq!(table.len(), 3);
    let expected = [sigmoid(0.4), sigmoid(-0.5), sigmoid(0.2)];
    for (row, want) in table.rows().iter().zip(expected) {
        assert!((row.probability - want).abs() < 1e-5);
        assert!((0.0..=1.0).contains(&row.probability));
    }
    assert_eq!(table.predictions().collect::<Vec<_>>(), vec![1, 0, 1]);
}

#[test]
fn test_null_feature_is_scored_as_missing() {
    let scorer = bundled_scorer();
    let table = scorer
        .predict_json(&json!({
            "senior_citizen": 0,
            "tenure": null,
            "monthly_charges": 70.5,
            "total_charges": 850.75
        }))
        .unwrap();

    // missing tenure defaults left at the root
    assert!((table.rows()[0].probability - sigmoid(0.4)).abs() < 1e-5);
}

#[test]
fn test_text_feature_is_inference_error() {
    let scorer = bundled_scorer();
    let err = scorer
        .predict_churn(customer(0, 12, 70.5, 850.75).with("tenure", "twelve"))
        .unwrap_err();
    assert!(matches!(err, ScoringError::Inference(_)));
}

#[test]
fn test_unsupported_input_produces_no_output() {
    let scorer = bundled_scorer();
    let err = scorer.predict_json(&json!(12.5)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "input must be a record or a collection of records, got number"
    );
}

#[test]
fn test_independent_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let strict = dir.path().join("strict.txt");
    std::fs::File::create(&strict)
        .unwrap()
        .write_all(b"0.9")
        .unwrap();

    let default = bundled_scorer();
    let strict = Scorer::load(bundled("churn_model.json"), &strict).unwrap();

    let sample = customer(0, 12, 70.5, 850.75);
    assert_eq!(default.predict_churn(sample.clone()).unwrap().rows()[0].prediction, 1);
    assert_eq!(strict.predict_churn(sample).unwrap().rows()[0].prediction, 0);
}

#[test]
fn test_corrupt_model_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.json");
    std::fs::write(&model, "{\"learner\": 42}").unwrap();

    let err = Scorer::load(&model, bundled("churn_threshold.txt")).err().unwrap();
    assert!(matches!(err, ArtifactError::Json { .. }));
}

#[test]
fn test_missing_threshold_fails_to_load() {
    let config = ArtifactsConfig {
        model_path: bundled("churn_model.json"),
        threshold_path: "does/not/exist.txt".into(),
        ..ArtifactsConfig::default()
    };
    let err = Scorer::from_config(&config).err().unwrap();
    assert!(matches!(err, ArtifactError::Io { .. }));
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_artifact_dir_loads() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join(OsStr::from_bytes(b"churn-\xff"));
    std::fs::create_dir(&dir).unwrap();
    let model = dir.join("churn_model.json");
    let threshold = dir.join("churn_threshold.txt");
    std::fs::copy(bundled("churn_model.json"), &model).unwrap();
    std::fs::copy(bundled("churn_threshold.txt"), &threshold).unwrap();

    let scorer = Scorer::load(&model, &threshold).unwrap();
    assert!((scorer.threshold().value() - 0.42).abs() < 1e-12);

    std::fs::remove_file(&threshold).unwrap();
    match Scorer::load(&model, &threshold) {
        Err(ArtifactError::Io { path, .. }) => assert_eq!(path, threshold),
        other => panic!("expected Io error, got {:?}", other.err()),
    }
}
