//! Integration test: full pipeline (validate → preprocess → tune → train → evaluate → predict)

use polars::prelude::*;
use serde_json::json;
use telco_churn::config::PipelineConfig;
use telco_churn::data::DataSaver;
use telco_churn::inference::PredictService;
use telco_churn::optimizer::{TuningMetric, TuningResult, TuningStrategy};
use telco_churn::pipeline::{Pipeline, TrainOptions, TuneOptions, TRAINING_RUN};
use telco_churn::preprocessing::PreprocessingArtifact;
use telco_churn::tracking::RunStatus;
use telco_churn::training::EVALUATION_RUN;

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];

/// Synthetic raw table where short month-to-month fiber customers churn
fn raw_telco(n: usize) -> DataFrame {
    let mut ids = Vec::with_capacity(n);
    let mut gender = Vec::with_capacity(n);
    let mut yes_no = Vec::with_capacity(n);
    let mut contract = Vec::with_capacity(n);
    let mut internet = Vec::with_capacity(n);
    let mut tenure = Vec::with_capacity(n);
    let mut monthly = Vec::with_capacity(n);
    let mut total = Vec::with_capacity(n);
    let mut churn = Vec::with_capacity(n);

    for i in 0..n {
        let t = (i * 7 % 72) as i64;
        let c = CONTRACTS[i % 3];
        let s = INTERNET[(i / 3) % 3];
        let m = 20.0 + (i % 50) as f64 * 1.5;

        ids.push(format!("{:04}-CUST", i));
        gender.push(if i % 2 == 0 { "Male" } else { "Female" });
        yes_no.push(if i % 4 == 0 { "Yes" } else { "No" });
        contract.push(c);
        internet.push(s);
        tenure.push(t);
        monthly.push(m);
        // new customers ship with a blank total
        total.push(if t == 0 { " ".to_string() } else { format!("{:.2}", m * t as f64) });
        churn.push(if c == "Month-to-month" && t < 36 { "Yes" } else { "No" });
    }

    df!(
        "customerID" => ids,
        "gender" => gender,
        "SeniorCitizen" => (0..n).map(|i| (i % 5 == 0) as i64).collect::<Vec<_>>(),
        "Partner" => &yes_no,
        "Dependents" => &yes_no,
        "tenure" => tenure,
        "PhoneService" => (0..n).map(|i| if i % 3 == 0 { "No" } else { "Yes" }).collect::<Vec<_>>(),
        "InternetService" => internet,
        "Contract" => contract,
        "MonthlyCharges" => monthly,
        "TotalCharges" => total,
        "Churn" => churn
    )
    .unwrap()
}

fn setup(n: usize) -> (tempfile::TempDir, Pipeline) {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::rooted_at(dir.path()).with_threshold(0.35);
    DataSaver::save_csv(&mut raw_telco(n), &config.raw_data_path).unwrap();
    (dir, Pipeline::new(config))
}

#[test]
fn test_validate_synthetic_data() {
    let (_dir, pipeline) = setup(90);
    let report = pipeline.validate().unwrap();
    assert!(report.success, "failures: {:?}", report.failures());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_missing_raw_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::rooted_at(dir.path()));
    assert!(pipeline.validate().is_err());
}

#[test]
fn test_preprocess_writes_contract() {
    let (_dir, pipeline) = setup(90);
    let artifact = pipeline.preprocess().unwrap();

    assert!(pipeline.config().processed_data_path.exists());
    let loaded = PreprocessingArtifact::load(pipeline.config().preprocessing_path()).unwrap();
    assert_eq!(loaded.feature_columns, artifact.feature_columns);
    assert_eq!(loaded.target_column.as_deref(), Some("Churn"));

    assert!(!artifact.feature_columns.contains(&"customerID".to_string()));
    assert!(!artifact.feature_columns.contains(&"Churn".to_string()));
    assert!(artifact.feature_columns.contains(&"Contract_One year".to_string()));
    assert!(!artifact.feature_columns.contains(&"Contract_Month-to-month".to_string()));
    assert_eq!(
        artifact.categorical_levels.get("InternetService"),
        Some(&vec!["Fiber optic".to_string(), "No".to_string()])
    );
}

#[test]
fn test_full_pipeline_and_serving() {
    let (_dir, pipeline) = setup(120);
    let tune = TuneOptions {
        n_trials: 2,
        metric: TuningMetric::Recall,
        strategy: TuningStrategy::Holdout { test_size: 0.25, threshold: 0.35 },
        extended_space: false,
    };

    let summary = pipeline.run(Some(&tune), &TrainOptions::default()).unwrap();

    assert!(summary.validation.success);
    let tuning = summary.tuning.unwrap();
    assert_eq!(tuning.n_trials, 2);
    assert!(pipeline.config().best_params_path().exists());
    let saved = TuningResult::load(pipeline.config().best_params_path()).unwrap();
    assert_eq!(
        saved.best_params.keys().collect::<Vec<_>>(),
        tuning.best_params.keys().collect::<Vec<_>>()
    );
    assert!((saved.best_value - tuning.best_value).abs() < 1e-12);

    let metrics = summary.metrics;
    assert_eq!(metrics.n_samples, 24);
    assert!((0.0..=1.0).contains(&metrics.accuracy));
    assert!(pipeline.config().model_path().exists());
    assert!(pipeline.config().artifacts_dir.join("confusion_matrix.json").exists());

    // tracker: one run per trial, the tuning summary, training and evaluation
    let runs = pipeline.tracker().list_runs().unwrap();
    assert_eq!(runs.len(), 2 + 3);
    for name in [TRAINING_RUN, EVALUATION_RUN] {
        let run = runs.iter().find(|r| r.run_name == name).unwrap();
        assert_eq!(run.status, RunStatus::Finished);
    }

    // serving reads the same artifacts, raw categoricals included
    let service = PredictService::load(&pipeline.config().inference_config()).unwrap();
    assert_eq!(service.feature_columns(), summary.artifact.feature_columns.as_slice());

    let record = json!({
        "customerID": "9999-NEW",
        "gender": "Female",
        "tenure": 2,
        "Contract": "Month-to-month",
        "InternetService": "Fiber optic",
        "MonthlyCharges": 80.5,
        "TotalCharges": 161.0
    });
    let result = service.predict_single(record.as_object().unwrap()).unwrap();
    assert!((0.0..=1.0).contains(&result.probability_churn));
    assert_eq!(result.prediction, u8::from(result.probability_churn >= 0.35));
}

#[test]
fn test_train_without_tuning_uses_defaults() {
    let (_dir, pipeline) = setup(60);
    pipeline.preprocess().unwrap();

    let model = pipeline.train(&TrainOptions { balanced: true, ignore_best_params: false }).unwrap();
    assert_eq!(model.config().n_estimators, 100);
    assert!(model.config().scale_pos_weight > 1.0);
}

#[test]
fn test_evaluate_without_model_fails() {
    let (_dir, pipeline) = setup(60);
    pipeline.preprocess().unwrap();
    assert!(pipeline.evaluate().is_err());
}
