use std::path::{Path, PathBuf};
use std::{env, io};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use input_analyser::criterion::CriterionKind;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const ENV_PREFIX: &str = "INPUT_PREDICTOR";

/// Held by tests that read or set `INPUT_PREDICTOR__*` variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub dataset: PathBuf,
    pub model: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("Saved/InputLogs.csv"),
            model: PathBuf::from("models/input_predictor_model.rf"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Training {
    pub test_size: f64,
    pub seed: u64,
    pub trees: usize,
    pub criterion: CriterionKind,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub parallel: bool,
}

impl Default for Training {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            trees: 100,
            criterion: CriterionKind::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub paths: Paths,
    pub training: Training,
}

impl Settings {
    /// Loads `configs/default` and `configs/{RUN_MODE}` from the working
    /// directory, both optional, then `INPUT_PREDICTOR__*` variables.
    pub fn new() -> Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Self::load(|builder| {
            builder
                .add_source(File::with_name("configs/default").required(false))
                .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
        })
    }

    /// Loads a single settings file instead of the `configs/` directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        Self::load(|builder| builder.add_source(File::from(path)))
    }

    fn load<F>(sources: F) -> Result<Self>
        where
            F: FnOnce(ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState>,
    {
        let defaults = Config::try_from(&Settings::default())?;

        let mut settings: Settings = sources(Config::builder().add_source(defaults))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.paths.dataset = normalize_path(&settings.paths.dataset)
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        settings.paths.model = normalize_path(&settings.paths.model)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;

        if !(training.test_size > 0.0 && training.test_size < 1.0) {
            return Err(ConfigError::Message(format!(
                "training.test_size must be between 0 and 1, got {}",
                training.test_size
            )));
        }
        if training.trees == 0 {
            return Err(ConfigError::Message("training.trees must be at least 1".into()));
        }
        if training.trees > u16::MAX as usize {
            return Err(ConfigError::Message(format!(
                "training.trees must be at most {}",
                u16::MAX
            )));
        }
        if training.min_samples_split < 2 {
            return Err(ConfigError::Message("training.min_samples_split must be at least 2".into()));
        }
        if training.min_samples_leaf < 1 {
            return Err(ConfigError::Message("training.min_samples_leaf must be at least 1".into()));
        }
        if training.max_depth == Some(0) || training.max_features == Some(0) {
            return Err(ConfigError::Message(
                "training.max_depth and training.max_features must be positive".into(),
            ));
        }

        Ok(())
    }
}

pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    })
}
