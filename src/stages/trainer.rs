//! Model training: fit the menu, pick the best test R², persist the bundle

use super::artifacts::{CandidateReport, TrainingArtifact, TransformationArtifact};
use crate::config::{ArtifactLayout, PipelineConfig};
use crate::error::{FlightError, Result, Stage, StageContext, StageResult};
use crate::inference::FareModel;
use crate::preprocessing::FeaturePreprocessor;
use crate::tracking::{RunRecord, RunStatus, TrackingSink};
use crate::training::{Candidate, Estimator, GridSearch, RegressionMetrics, Regressor};
use crate::utils::{load_object, save_object};
use indexmap::IndexMap;
use ndarray::{s, Array1, Array2};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Load a `[features | target]` array and split off the last column
pub fn load_training_array(path: &Path) -> Result<(Array2<f64>, Array1<f64>)> {
    let arr: Array2<f64> = load_object(path)?;
    if arr.ncols() < 2 {
        return Err(FlightError::ShapeError {
            expected: "at least one feature column and a target column".to_string(),
            actual: format!("{} columns", arr.ncols()),
        });
    }
    let last = arr.ncols() - 1;
    Ok((arr.slice(s![.., ..last]).to_owned(), arr.column(last).to_owned()))
}

struct Fitted {
    estimator: Estimator,
    params: String,
    cv_score: Option<f64>,
}

fn fit_candidate(
    candidate: &Candidate,
    cv_folds: usize,
    seed: Option<u64>,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<Fitted> {
    match &candidate.grid {
        Some(grid) => {
            let (estimator, result) = GridSearch::new(cv_folds)
                .with_random_state(seed)
                .fit(&candidate.spec, grid, x, y)?;
            info!(
                model = %candidate.name,
                params = %result.best_spec,
                cv_r2 = result.best_score,
                grid_points = result.n_candidates,
                "grid search finished"
            );
            Ok(Fitted {
                estimator,
                params: result.best_spec.to_string(),
                cv_score: Some(result.best_score),
            })
        }
        None => {
            let mut estimator = candidate.spec.build(seed);
            estimator.fit(x, y)?;
            Ok(Fitted {
                estimator,
                params: candidate.spec.to_string(),
                cv_score: None,
            })
        }
    }
}

/// Fit every menu entry on the training partition and score it on both
/// partitions.
///
/// Returns one report per entry in menu order, with the fitted estimator for
/// entries that succeeded. A failing entry is logged and reported, never
/// propagated.
pub fn evaluate_models(
    menu: &[Candidate],
    cv_folds: usize,
    seed: Option<u64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Vec<(CandidateReport, Option<Estimator>)> {
    menu.iter()
        .map(|candidate| {
            let start = Instant::now();
            let scored = fit_candidate(candidate, cv_folds, seed, x_train, y_train).and_then(|fitted| {
                let train = RegressionMetrics::compute(y_train, &fitted.estimator.predict(x_train)?)?;
                let test = RegressionMetrics::compute(y_test, &fitted.estimator.predict(x_test)?)?;
                Ok((fitted, train, test))
            });

            match scored {
                Ok((fitted, train, test)) => {
                    info!(
                        model = %candidate.name,
                        train_r2 = train.r2_score,
                        test_r2 = test.r2_score,
                        elapsed_secs = start.elapsed().as_secs_f64(),
                        "candidate scored"
                    );
                    let report = CandidateReport {
                        name: candidate.name.clone(),
                        params: fitted.params,
                        cv_score: fitted.cv_score,
                        train_metric: Some(train),
                        test_metric: Some(test),
                        error: None,
                    };
                    (report, Some(fitted.estimator))
                }
                Err(e) => {
                    warn!(model = %candidate.name, error = %e, "candidate failed");
                    let report = CandidateReport {
                        name: candidate.name.clone(),
                        params: candidate.spec.to_string(),
                        cv_score: None,
                        train_metric: None,
                        test_metric: None,
                        error: Some(e.to_string()),
                    };
                    (report, None)
                }
            }
        })
        .collect()
}

/// Pair the estimator's importances with the preprocessor's output names
fn named_importances(
    estimator: &Estimator,
    preprocessor: &FeaturePreprocessor,
) -> Option<IndexMap<String, f64>> {
    let importances = estimator.feature_importances()?;
    let names = preprocessor.feature_names();
    if importances.len() != names.len() {
        warn!(
            importances = importances.len(),
            features = names.len(),
            "feature importances do not match the preprocessor output"
        );
        return None;
    }
    Some(names.iter().cloned().zip(importances).collect())
}

/// Index of the highest test R². NaN and failed entries never win; ties keep
/// the earliest entry.
pub fn select_best(reports: &[CandidateReport]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, report) in reports.iter().enumerate() {
        let Some(score) = report.test_r2() else {
            continue;
        };
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

pub struct ModelTrainer<'a> {
    config: &'a PipelineConfig,
    layout: &'a ArtifactLayout,
    transformation_artifact: &'a TransformationArtifact,
    tracker: Option<&'a dyn TrackingSink>,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        layout: &'a ArtifactLayout,
        transformation_artifact: &'a TransformationArtifact,
        tracker: Option<&'a dyn TrackingSink>,
    ) -> Self {
        Self {
            config,
            layout,
            transformation_artifact,
            tracker,
        }
    }

    /// Report the selected model. Failures are logged, not returned.
    fn track_experiment(&self, artifact: &TrainingArtifact) {
        let Some(tracker) = self.tracker else {
            return;
        };
        let record = RunRecord::new()
            .with_tag("best_model_name", artifact.best_model_name.clone())
            .with_param("cv_folds", self.config.training.cv_folds)
            .with_param("candidates", artifact.candidates.len())
            .with_regression_metrics("train", &artifact.train_metric)
            .with_regression_metrics("test", &artifact.test_metric)
            .with_artifact(&artifact.trained_model_file_path);

        if let Err(e) = tracker.log_run(&record) {
            warn!(error = %e, "experiment tracking failed, training result kept");
        }
    }

    /// Report a run where no candidate could be selected
    fn track_failure(&self, reports: &[CandidateReport], error: &FlightError) {
        let Some(tracker) = self.tracker else {
            return;
        };
        let record = RunRecord::new()
            .with_status(RunStatus::Failed)
            .with_tag("error", error.to_string())
            .with_param("cv_folds", self.config.training.cv_folds)
            .with_param("candidates", reports.len());

        if let Err(e) = tracker.log_run(&record) {
            warn!(error = %e, "experiment tracking failed for the failed run");
        }
    }

    pub fn train_model(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<TrainingArtifact> {
        let training = &self.config.training;
        let mut evaluated = evaluate_models(
            &training.menu,
            training.cv_folds,
            training.random_seed,
            x_train,
            y_train,
            x_test,
            y_test,
        );

        let reports: Vec<CandidateReport> = evaluated.iter().map(|(r, _)| r.clone()).collect();
        let Some(best_idx) = select_best(&reports) else {
            let failures: Vec<String> = reports
                .iter()
                .map(|r| format!("{}: {}", r.name, r.error.as_deref().unwrap_or("non-finite score")))
                .collect();
            let err =
                FlightError::TrainingError(format!("no candidate succeeded ({})", failures.join("; ")));
            self.track_failure(&reports, &err);
            return Err(err);
        };

        let (best_report, best_estimator) = evaluated.swap_remove(best_idx);
        let (estimator, train_metric, test_metric) =
            match (best_estimator, best_report.train_metric, best_report.test_metric) {
                (Some(e), Some(train), Some(test)) => (e, train, test),
                _ => {
                    return Err(FlightError::TrainingError(format!(
                        "selected candidate {} has no fitted model",
                        best_report.name
                    )))
                }
            };
        info!(
            model = %best_report.name,
            params = %best_report.params,
            test_r2 = test_metric.r2_score,
            "best model selected"
        );

        let preprocessor: FeaturePreprocessor =
            load_object(&self.transformation_artifact.transformed_object_file_path)?;
        let feature_importances = named_importances(&estimator, &preprocessor);
        if let Some(importances) = &feature_importances {
            let mut ranked: Vec<(&String, &f64)> = importances.iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(a.1));
            for (feature, importance) in ranked.into_iter().take(5) {
                info!(
                    model = %best_report.name,
                    feature = %feature,
                    importance = *importance,
                    "feature importance"
                );
            }
        }

        save_object(&self.layout.best_estimator_file_path, &estimator)?;
        let model = FareModel::new(preprocessor, estimator)?;
        model.save(&self.layout.trained_model_file_path)?;
        info!(path = %self.layout.trained_model_file_path.display(), "trained model saved");

        let artifact = TrainingArtifact {
            best_model_name: best_report.name,
            trained_model_file_path: self.layout.trained_model_file_path.clone(),
            best_estimator_file_path: self.layout.best_estimator_file_path.clone(),
            train_metric,
            test_metric,
            candidates: reports,
            feature_importances,
        };
        self.track_experiment(&artifact);
        Ok(artifact)
    }

    pub fn initiate_model_trainer(&self) -> StageResult<TrainingArtifact> {
        info!("loading transformed training and testing arrays");
        let (x_train, y_train) =
            load_training_array(&self.transformation_artifact.transformed_train_file_path)
                .stage_context(Stage::Training, "loading transformed training array")?;
        let (x_test, y_test) =
            load_training_array(&self.transformation_artifact.transformed_test_file_path)
                .stage_context(Stage::Training, "loading transformed testing array")?;

        let artifact = self
            .train_model(&x_train, &y_train, &x_test, &y_test)
            .stage_context(Stage::Training, "training models")?;
        info!(
            best_model = %artifact.best_model_name,
            train_r2 = artifact.train_metric.r2_score,
            test_r2 = artifact.test_metric.r2_score,
            "model training complete"
        );
        Ok(artifact)
    }
}
