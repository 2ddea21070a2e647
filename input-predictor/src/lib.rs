pub mod artifact;
pub mod dataset;
pub mod error;
pub mod ffi;
pub mod labels;
pub mod logging;
pub mod predictor;
pub mod record;
pub mod settings;
pub mod training;

pub use artifact::ModelArtifact;
pub use error::{PredictorError, Result};
pub use predictor::{get_prediction, InputPredictor};
pub use record::InputLog;
pub use settings::Settings;
pub use training::{train, TrainingReport};
