//! revgraph CLI - train and evaluate review-rating graph models.
//!
//! # Usage
//!
//! ```bash
//! # Write the built-in toy dataset, or a seeded synthetic one
//! revgraph generate toy.json --toy
//! revgraph generate synth.json --users 500 --reviews 1000 --seed 7
//!
//! # Inspect a dataset
//! revgraph stats synth.json
//!
//! # Train with early stopping and write a JSON report
//! revgraph train synth.json --epochs 20 --batch-size 64 --report report.json
//!
//! # More logging
//! revgraph -vv train synth.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use candle_nn::VarMap;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use revgraph_core::{Dataset, SyntheticConfig};
use revgraph_nn::{
    ExecutionContext, GraphRatingModel, ModelConfig, OptimizerKind, TrainConfig, Trainer,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "revgraph")]
#[command(about = "Graph attention rating model for user reviews", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and report held-out RMSE/MAE
    Train {
        /// Dataset file (JSON)
        input: PathBuf,

        /// Training batch size (at least 2)
        #[arg(long, default_value = "128")]
        batch_size: usize,

        /// Evaluation batch size
        #[arg(long, default_value = "1000")]
        test_batch_size: usize,

        /// Embedding size
        #[arg(long, default_value = "64")]
        embed_dim: usize,

        /// Learning rate
        #[arg(long, default_value = "0.001")]
        lr: f64,

        /// Maximum number of epochs
        #[arg(long, default_value = "100")]
        epochs: usize,

        /// Non-improving epochs tolerated before stopping
        #[arg(long, default_value = "5")]
        patience: usize,

        /// Shuffle seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Optimizer: rmsprop or adamw
        #[arg(long, default_value = "rmsprop")]
        optimizer: OptimizerKind,

        /// Dropout probability
        #[arg(long, default_value = "0.5")]
        dropout: f32,

        /// Force CPU even when CUDA is available
        #[arg(long)]
        cpu: bool,

        /// Initial weights (safetensors) to resume from
        #[arg(long)]
        init_weights: Option<PathBuf>,

        /// Write the training report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show statistics about a dataset
    Stats {
        /// Dataset file (JSON)
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a toy or synthetic dataset
    Generate {
        /// Output file (JSON)
        output: PathBuf,

        /// Write the fixed 3-user, 3-review toy dataset
        #[arg(long)]
        toy: bool,

        /// Number of users
        #[arg(long, default_value = "100")]
        users: usize,

        /// Number of reviews
        #[arg(long, default_value = "200")]
        reviews: usize,

        /// Number of discrete rating values
        #[arg(long, default_value = "5")]
        ratings: usize,

        /// Reviews rated per user
        #[arg(long, default_value = "10")]
        history: usize,

        /// Random neighbors drawn per user
        #[arg(long, default_value = "5")]
        neighbors: usize,

        /// Random neighbors drawn per review
        #[arg(long, default_value = "3")]
        review_neighbors: usize,

        /// Fraction of samples held out
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train {
            input,
            batch_size,
            test_batch_size,
            embed_dim,
            lr,
            epochs,
            patience,
            seed,
            optimizer,
            dropout,
            cpu,
            init_weights,
            report,
        } => {
            let model_config = ModelConfig::default()
                .with_embed_dim(embed_dim)
                .with_dropout(dropout);
            let train_config = TrainConfig::default()
                .with_batch_size(batch_size)
                .with_test_batch_size(test_batch_size)
                .with_learning_rate(lr)
                .with_epochs(epochs)
                .with_patience(patience)
                .with_seed(seed)
                .with_optimizer(optimizer);
            cmd_train(
                &input,
                model_config,
                train_config,
                cpu,
                init_weights.as_deref(),
                report.as_deref(),
            )
        }
        Commands::Stats { input, json } => cmd_stats(&input, json),
        Commands::Generate {
            output,
            toy,
            users,
            reviews,
            ratings,
            history,
            neighbors,
            review_neighbors,
            test_fraction,
            seed,
        } => {
            let config = SyntheticConfig::default()
                .with_sizes(users, reviews, ratings)
                .with_interactions_per_user(history)
                .with_neighbors(neighbors, review_neighbors)
                .with_test_fraction(test_fraction)
                .with_seed(seed);
            cmd_generate(&output, toy, &config)
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let dataset = Dataset::from_json_file(path)
        .with_context(|| format!("Failed to load dataset {}", path.display()))?;

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(dataset)
}

fn cmd_train(
    input: &Path,
    model_config: ModelConfig,
    train_config: TrainConfig,
    cpu: bool,
    init_weights: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    let dataset = load_dataset(input)?;
    let (graph, train, test) = dataset
        .into_parts()
        .with_context(|| format!("Invalid dataset {}", input.display()))?;
    if test.is_empty() {
        bail!("{} has no test samples to evaluate on", input.display());
    }

    let ctx = if cpu {
        ExecutionContext::cpu()
    } else {
        ExecutionContext::cuda_if_available(0)?
    };
    info!(cuda = ctx.is_cuda(), "execution context");

    let mut varmap = VarMap::new();
    let mut model = GraphRatingModel::new(&model_config, &graph, ctx.var_builder(&varmap))
        .context("Failed to build model")?;
    if let Some(path) = init_weights {
        varmap
            .load(path)
            .with_context(|| format!("Failed to load weights {}", path.display()))?;
        info!(path = %path.display(), "loaded initial weights");
    }

    println!(
        "Training on {} samples, evaluating on {} (users={}, reviews={}, dim={})",
        train.len(),
        test.len(),
        graph.num_users(),
        graph.num_reviews(),
        model_config.embed_dim
    );

    let start = Instant::now();
    let mut trainer = Trainer::new(train_config, &varmap)?;
    let report = trainer.fit_with(&mut model, &train, &test, |record| {
        println!(
            "epoch {:>3}: loss {:.4}, rmse {:.4}, mae {:.4}",
            record.train.epoch, record.train.mean_loss, record.test.rmse, record.test.mae
        );
    })?;

    println!(
        "Best rmse/mae: {:.6} / {:.6} (epoch {}) in {:.2?}",
        report.best_rmse,
        report.best_mae,
        report.best_epoch,
        start.elapsed()
    );
    if report.stopped_early {
        println!("Stopped early after {} epochs", report.history.len());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn cmd_stats(input: &Path, json: bool) -> Result<()> {
    let dataset = load_dataset(input)?;
    dataset
        .validate()
        .with_context(|| format!("Invalid dataset {}", input.display()))?;
    let stats = dataset.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Dataset Statistics");
    println!("==================");
    println!("Users:            {}", stats.num_users);
    println!("Reviews:          {}", stats.num_reviews);
    println!("Rating values:    {}", stats.num_ratings);
    println!("Train samples:    {}", stats.num_train);
    println!("Test samples:     {}", stats.num_test);
    println!("Interactions:     {}", stats.num_interactions);
    println!("Avg user history: {:.2}", stats.mean_user_history);
    println!("Avg review hist.: {:.2}", stats.mean_review_history);
    println!("Cold-start users: {}", stats.cold_start_users);
    println!("Cold-start revs.: {}", stats.cold_start_reviews);
    println!("User edges:       {}", stats.user_edges);
    println!("Review edges:     {}", stats.review_edges);
    println!("Isolated users:   {}", stats.isolated_users);
    println!("Isolated reviews: {}", stats.isolated_reviews);

    Ok(())
}

fn cmd_generate(output: &Path, toy: bool, config: &SyntheticConfig) -> Result<()> {
    let dataset = if toy {
        Dataset::toy()
    } else {
        Dataset::synthetic(config).context("Failed to generate dataset")?
    };
    dataset
        .to_json_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} ({} users, {} reviews, {} train, {} test)",
        output.display(),
        dataset.num_users,
        dataset.num_reviews,
        dataset.train.len(),
        dataset.test.len()
    );
    Ok(())
}
