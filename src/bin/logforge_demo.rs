//! logforge demo driver
//! Trains the logistic regression on a toy or synthetic dataset and reports
//! predictions, accuracy, and the kernel tiers in use.

use anyhow::{ensure, Context};
use clap::{Parser, Subcommand};
use logforge::logging::{LogFormat, LogLevel, LoggingConfig};
use logforge::model::{FeatureMatrix, LogisticRegression, ModelConfig, TrainingReport};
use logforge::{init_kernels, CpuFeatures, KernelTier};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;

/// Class 1 above the line y = x, class 0 below
const SEPARABLE_X: [f32; 16] = [
    1.0, 3.0, //
    2.0, 4.0, //
    3.0, 5.0, //
    0.5, 2.5, //
    3.0, 1.0, //
    4.0, 2.0, //
    5.0, 3.0, //
    2.5, 0.5, //
];
const SEPARABLE_Y: [i32; 8] = [1, 1, 1, 1, 0, 0, 0, 0];

/// Generating weights for synthetic labels, cycled for other feature counts
const TRUE_WEIGHTS: [f32; 4] = [1.5, -2.0, 0.8, -1.2];
const TRUE_BIAS: f32 = 0.5;

#[derive(Parser, Debug)]
#[command(name = "logforge-demo", version)]
#[command(about = "Train and evaluate logistic regression on SIMD-dispatched kernels", long_about = None)]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train on the 8-point linearly separable dataset
    Separable {
        #[arg(long, default_value_t = 0.1)]
        lr: f32,
        #[arg(long, default_value_t = 1000)]
        epochs: usize,
    },
    /// Train on seeded Gaussian data with an 80/20 train/test split
    Synthetic {
        #[arg(long, default_value_t = 500)]
        samples: usize,
        #[arg(long, default_value_t = 4)]
        features: usize,
        #[arg(long, default_value_t = 0.05)]
        lr: f32,
        #[arg(long, default_value_t = 500)]
        epochs: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Show detected CPU features and the selected kernel tiers
    Tiers,
}

#[derive(Debug, Serialize)]
struct SeparableOutput {
    report: TrainingReport,
    probabilities: Vec<f32>,
    classes: Vec<i32>,
    accuracy: f32,
}

#[derive(Debug, Serialize)]
struct SyntheticOutput {
    report: TrainingReport,
    train_samples: usize,
    test_samples: usize,
    test_accuracy: f32,
    first_test_probability: f32,
    weights: Vec<f32>,
    bias: f32,
}

#[derive(Debug, Serialize)]
struct TiersOutput {
    features: String,
    dot_product: KernelTier,
    sigmoid: KernelTier,
    supported: Vec<KernelTier>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level: LogLevel = cli.log_level.parse()?;
    let log_config = LoggingConfig::from_env()
        .unwrap_or_default()
        .with_level(level)
        .with_format(if cli.json { LogFormat::Json } else { LogFormat::Human });
    logforge::init_with_config(&log_config)?;

    init_kernels();

    match cli.command {
        Commands::Separable { lr, epochs } => run_separable(lr, epochs, cli.json),
        Commands::Synthetic {
            samples,
            features,
            lr,
            epochs,
            seed,
        } => run_synthetic(samples, features, lr, epochs, seed, cli.json),
        Commands::Tiers => run_tiers(cli.json),
    }
}

fn run_separable(lr: f32, epochs: usize, json: bool) -> anyhow::Result<()> {
    let x = FeatureMatrix::new(&SEPARABLE_X, SEPARABLE_Y.len(), 2)?;
    let config = ModelConfig::new(2).with_learning_rate(lr).with_epochs(epochs);
    let mut model = LogisticRegression::new(config)?;

    let report = model.train(&x, &SEPARABLE_Y)?;

    let probabilities = model.predict_batch(&x)?;
    let classes = model.predict_class_batch(&x)?;
    let accuracy = model.accuracy(&x, &SEPARABLE_Y)?;

    if json {
        let output = SeparableOutput {
            report,
            probabilities,
            classes,
            accuracy,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("--- Predictions ---");
    let mut correct = 0;
    for (i, (row, &label)) in x.iter_rows().zip(SEPARABLE_Y.iter()).enumerate() {
        let prob = model.predict(row)?;
        let class = model.predict_class(row)?;
        println!(
            "Sample {}:  P(y=1) = {:.6}   class = {}   (true = {})",
            i, prob, class, label
        );
        if class == label {
            correct += 1;
        }
    }
    println!("\nAccuracy: {} / {}", correct, SEPARABLE_Y.len());

    println!("\n--- Batch predictions ---");
    for (i, (prob, class)) in probabilities.iter().zip(classes.iter()).enumerate() {
        println!("Sample {}:  prob = {:.6}   class = {}", i, prob, class);
    }
    println!("\nFinal loss: {:.6}", report.final_loss);
    Ok(())
}

/// Standard-normal features, labels from `x . w_true + b_true > 0`
fn synthetic_dataset(samples: usize, features: usize, seed: u64) -> (Vec<f32>, Vec<i32>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(samples * features);
    let mut y = Vec::with_capacity(samples);

    for _ in 0..samples {
        let row: Vec<f32> = (0..features)
            .map(|_| StandardNormal.sample(&mut rng))
            .collect();
        let z: f32 = row
            .iter()
            .zip(TRUE_WEIGHTS.iter().cycle())
            .map(|(v, w)| v * w)
            .sum::<f32>()
            + TRUE_BIAS;
        y.push(i32::from(z > 0.0));
        x.extend(row);
    }
    (x, y)
}

fn run_synthetic(
    samples: usize,
    features: usize,
    lr: f32,
    epochs: usize,
    seed: u64,
    json: bool,
) -> anyhow::Result<()> {
    ensure!(samples >= 5, "need at least 5 samples for an 80/20 split");
    ensure!(features > 0, "need at least one feature");

    let (x, y) = synthetic_dataset(samples, features, seed);
    let split = samples * 4 / 5;
    let (x_train, x_test) = x.split_at(split * features);
    let (y_train, y_test) = y.split_at(split);

    let train = FeatureMatrix::new(x_train, split, features)?;
    let test = FeatureMatrix::new(x_test, samples - split, features)?;

    let config = ModelConfig::new(features)
        .with_learning_rate(lr)
        .with_epochs(epochs);
    let mut model = LogisticRegression::new(config).context("building model")?;
    let report = model.train(&train, y_train).context("training")?;

    let test_accuracy = model.accuracy(&test, y_test)?;
    let first_test_probability = model.predict(test.row(0))?;

    if json {
        let output = SyntheticOutput {
            report,
            train_samples: split,
            test_samples: samples - split,
            test_accuracy,
            first_test_probability,
            weights: model.weights()[..features].to_vec(),
            bias: model.bias(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Trained on {} samples, tested on {}", split, samples - split);
    println!("Final training loss: {:.6}", report.final_loss);
    println!("Test accuracy: {:.2}%", test_accuracy * 100.0);
    println!(
        "Single prediction for first test sample: {:.6} (true = {})",
        first_test_probability, y_test[0]
    );
    println!("Weights: {:?}", &model.weights()[..features]);
    println!("Bias: {:.6}", model.bias());
    Ok(())
}

fn run_tiers(json: bool) -> anyhow::Result<()> {
    let kernels = logforge::kernels()?;
    let features = CpuFeatures::get();
    let output = TiersOutput {
        features: features.to_string(),
        dot_product: kernels.dot_tier(),
        sigmoid: kernels.sigmoid_tier(),
        supported: KernelTier::supported(&features),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.features);
        println!("dot_product : {}", output.dot_product);
        println!("sigmoid     : {}", output.sigmoid);
        let names: Vec<&str> = output.supported.iter().map(|t| t.name()).collect();
        println!("supported   : {}", names.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level_reports_tier_selection() {
        let cli = Cli::parse_from(["logforge-demo", "tiers"]);
        // The dispatcher reports its tier choice at info
        assert_eq!(cli.log_level.parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!(!cli.json);
    }

    #[test]
    fn test_log_level_flag_is_global() {
        let cli = Cli::parse_from(["logforge-demo", "separable", "--log-level", "debug"]);
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Separable { epochs: 1000, .. }));
    }
}
