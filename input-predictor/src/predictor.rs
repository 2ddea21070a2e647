use std::path::Path;

use crate::artifact::ModelArtifact;
use crate::error::{PredictorError, Result};
use crate::record::features;

/// A loaded model, ready to answer predictions.
#[derive(Debug, Clone)]
pub struct InputPredictor {
    artifact: ModelArtifact,
}

impl InputPredictor {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let artifact = ModelArtifact::load(path)?;

        tracing::info!(
            "loaded model from {} ({} trees, {} labels)",
            path.display(),
            artifact.forest.forest.len(),
            artifact.labels.len()
        );

        Ok(Self { artifact })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn predict_input(&self, timestamp: f64, x: f64, y: f64, z: f64, frame: u64) -> Result<&str> {
        let xs = features(timestamp, x, y, z, frame);
        let class = self.artifact.forest.predict(&xs)?;

        self.artifact
            .labels
            .decode(class)
            .ok_or_else(|| PredictorError::invalid_model(format!("class {class} has no label")))
    }

    /// Probability of every known input, in label order.
    pub fn predict_proba(
        &self,
        timestamp: f64,
        x: f64,
        y: f64,
        z: f64,
        frame: u64,
    ) -> Result<Vec<(&str, f64)>> {
        let xs = features(timestamp, x, y, z, frame);
        let probabilities = self.artifact.forest.predict_proba(&xs)?;

        Ok(self
            .artifact
            .labels
            .classes()
            .iter()
            .map(String::as_str)
            .zip(probabilities)
            .collect())
    }
}

/// Loads the model at `model_path` and predicts a single row.
pub fn get_prediction<P: AsRef<Path>>(
    model_path: P,
    timestamp: f64,
    x: f64,
    y: f64,
    z: f64,
    frame: u64,
) -> Result<String> {
    let predictor = InputPredictor::load(model_path)?;
    predictor
        .predict_input(timestamp, x, y, z, frame)
        .map(str::to_owned)
}
