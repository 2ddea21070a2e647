use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use input_predictor::{logging, train, InputPredictor, PredictorError, Settings};

/// Train and query the player input predictor
#[derive(Parser, Debug)]
#[command(name = "input-predictor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file, replacing the configs/ directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a model on the input log and save it
    Train {
        /// Input log CSV
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Where to write the model
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Number of trees
        #[arg(short, long)]
        trees: Option<usize>,

        /// Seed for the split and the forest
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict the input for one position sample
    #[command(allow_negative_numbers = true)]
    Predict {
        timestamp: f64,
        x: f64,
        y: f64,
        z: f64,
        frame: u64,

        /// Model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Print every label with its probability
        #[arg(long)]
        proba: bool,
    },

    /// Describe a saved model
    Inspect {
        /// Model file
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::new(),
    };
    let mut settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            return ExitCode::FAILURE;
        },
    };

    let level = if cli.verbose { "debug".to_string() } else { settings.logger.level.clone() };
    logging::init(&level);

    let result = match cli.command {
        Commands::Train { dataset, model, trees, seed, json } => {
            if let Some(dataset) = dataset {
                settings.paths.dataset = dataset;
            }
            if let Some(model) = model {
                settings.paths.model = model;
            }
            if let Some(trees) = trees {
                settings.training.trees = trees;
            }
            if let Some(seed) = seed {
                settings.training.seed = seed;
            }
            run_train(&settings, json)
        },
        Commands::Predict { timestamp, x, y, z, frame, model, proba } => {
            let model = model.unwrap_or_else(|| settings.paths.model.clone());
            run_predict(&model, timestamp, x, y, z, frame, proba)
        },
        Commands::Inspect { model } => {
            let model = model.unwrap_or_else(|| settings.paths.model.clone());
            run_inspect(&model)
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_found() => {
            tracing::error!("{e}");
            eprintln!("Error: file not found. {e}");
            ExitCode::FAILURE
        },
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error occurred: {e}");
            ExitCode::FAILURE
        },
    }
}

fn run_train(settings: &Settings, json: bool) -> Result<(), PredictorError> {
    settings.validate()?;
    let report = train(settings)?;

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| PredictorError::invalid_argument(e.to_string()))?;
        println!("{text}");
    } else {
        println!("Model accuracy: {}", report.accuracy);
        println!("Model saved to '{}'", report.model_path.display());
    }

    Ok(())
}

fn run_predict(
    model: &Path,
    timestamp: f64,
    x: f64,
    y: f64,
    z: f64,
    frame: u64,
    proba: bool,
) -> Result<(), PredictorError> {
    let predictor = InputPredictor::load(model)?;

    if proba {
        for (label, p) in predictor.predict_proba(timestamp, x, y, z, frame)? {
            println!("{label}\t{p:.4}");
        }
    } else {
        println!("{}", predictor.predict_input(timestamp, x, y, z, frame)?);
    }

    Ok(())
}

fn run_inspect(model: &Path) -> Result<(), PredictorError> {
    let predictor = InputPredictor::load(model)?;
    let artifact = predictor.artifact();
    let trees = &artifact.forest.forest;

    println!("features: {}", artifact.feature_names.join(", "));
    println!("labels:   {}", artifact.labels.classes().join(", "));
    println!("trees:    {}", trees.len());
    if let Some(depth) = trees.iter().map(|tree| tree.root().depth()).max() {
        println!("depth:    {depth}");
    }
    println!("leaves:   {}", trees.iter().map(|tree| tree.root().leaves()).sum::<usize>());
    if artifact.accuracy.is_nan() {
        println!("accuracy: unknown");
    } else {
        println!("accuracy: {:.4}", artifact.accuracy);
    }

    Ok(())
}
