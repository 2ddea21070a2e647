use std::num::NonZeroUsize;
use std::path::PathBuf;

use input_analyser::criterion::{CriterionKind, Entropy, Gini};
use input_analyser::metrics::ConfusionMatrix;
use input_analyser::random_forest::{RandomForest, RandomForestBuilder};
use input_analyser::table::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::artifact::ModelArtifact;
use crate::dataset::InputLogDataset;
use crate::error::{PredictorError, Result};
use crate::record::FEATURE_NAMES;
use crate::settings::{Settings, Training};

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub classes: Vec<String>,
    pub accuracy: f64,
    /// Per-class recall on the test split, `None` for classes absent from it.
    pub recall: Vec<Option<f64>>,
    pub model_path: PathBuf,
}

impl From<&Training> for RandomForestBuilder {
    fn from(training: &Training) -> Self {
        let fallback = RandomForestBuilder::default();

        Self {
            trees: NonZeroUsize::new(training.trees).unwrap_or(fallback.trees),
            max_features: training.max_features.and_then(NonZeroUsize::new),
            max_depth: training.max_depth.and_then(NonZeroUsize::new),
            min_samples_split: training.min_samples_split,
            min_samples_leaf: training.min_samples_leaf,
            seed: Some(training.seed),
            parallel: training.parallel,
            ..fallback
        }
    }
}

/// Reads the input log named by `settings`, fits a forest on the training
/// split, evaluates it on the test split and saves the artifact.
pub fn train(settings: &Settings) -> Result<TrainingReport> {
    let paths = &settings.paths;
    tracing::info!("reading input log {}", paths.dataset.display());

    let dataset = InputLogDataset::from_csv(&paths.dataset)?;
    let (artifact, report) = fit(&dataset, &settings.training)?;

    artifact.save(&paths.model)?;
    tracing::info!(
        "model accuracy {:.4} on {} test rows, saved to {}",
        report.accuracy,
        report.test_rows,
        paths.model.display()
    );

    Ok(TrainingReport { model_path: paths.model.clone(), ..report })
}

/// Fits and evaluates without touching the filesystem.
pub fn fit(dataset: &InputLogDataset, training: &Training) -> Result<(ModelArtifact, TrainingReport)> {
    if dataset.is_empty() {
        return Err(PredictorError::EmptyDataset);
    }

    let labels = dataset.label_encoder();
    let table_builder = dataset.encode(&labels)?;
    let table = table_builder.build()?;

    let mut rng = StdRng::seed_from_u64(training.seed);
    let (train, test) = table.train_test_split(&mut rng, training.test_size);
    if train.rows_len() == 0 {
        return Err(PredictorError::invalid_argument(format!(
            "{} rows leave nothing to train on with test_size {}",
            dataset.len(),
            training.test_size
        )));
    }
    tracing::debug!(
        "split {} rows into {} train and {} test",
        dataset.len(),
        train.rows_len(),
        test.rows_len()
    );

    let train_rows = train.rows_len();
    let builder = RandomForestBuilder::from(training);
    let forest = match training.criterion {
        CriterionKind::Gini => builder.fit(Gini, train),
        CriterionKind::Entropy => builder.fit(Entropy, train),
    };

    let matrix = evaluate(&forest, &test)?;
    let accuracy = matrix.accuracy();
    if accuracy.is_nan() {
        tracing::warn!("test split is empty, accuracy is unknown");
    }

    let report = TrainingReport {
        rows: dataset.len(),
        train_rows,
        test_rows: test.rows_len(),
        classes: labels.classes().to_vec(),
        accuracy,
        recall: (0..labels.len()).map(|class| matrix.recall(class)).collect(),
        model_path: PathBuf::new(),
    };
    let artifact = ModelArtifact {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        labels,
        accuracy,
        forest,
    };

    Ok((artifact, report))
}

fn evaluate(forest: &RandomForest, test: &Table) -> Result<ConfusionMatrix> {
    let mut matrix = ConfusionMatrix::new(forest.n_classes);
    for (features, expected) in test.rows() {
        matrix.record(expected, forest.predict(&features)?);
    }
    Ok(matrix)
}
