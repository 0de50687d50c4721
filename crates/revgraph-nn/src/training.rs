//! Training and evaluation driver.
//!
//! Each epoch shuffles the training samples with a seeded RNG, runs one
//! forward/backward/update per mini-batch, then scores the held-out
//! samples in evaluation mode. Training stops early once RMSE has failed to
//! improve for more than `patience` consecutive epochs.
//!
//! # Example
//!
//! ```rust,ignore
//! use candle_nn::VarMap;
//! use revgraph_core::Dataset;
//! use revgraph_nn::{ExecutionContext, GraphRatingModel, ModelConfig, TrainConfig, Trainer};
//!
//! let (graph, train, test) = Dataset::toy().into_parts()?;
//! let ctx = ExecutionContext::cpu();
//! let varmap = VarMap::new();
//! let mut model = GraphRatingModel::new(&ModelConfig::default(), &graph, ctx.var_builder(&varmap))?;
//!
//! let config = TrainConfig::default().with_batch_size(2).with_epochs(5);
//! let mut trainer = Trainer::new(config, &varmap)?;
//! let report = trainer.fit(&mut model, &train, &test)?;
//! println!("best rmse {:.4}", report.best_rmse);
//! ```

use candle_core::DType;
use candle_nn::VarMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use revgraph_core::sample::{batches, shuffled_batches};
use revgraph_core::Sample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics::RatingMetrics;
use crate::model::GraphRatingModel;
use crate::optim::{OptimizerKind, TrainOptimizer};

/// Training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Training batch size (default: 128). Must be at least 2.
    pub batch_size: usize,
    /// Evaluation batch size (default: 1000).
    pub test_batch_size: usize,
    /// Learning rate (default: 0.001).
    pub learning_rate: f64,
    /// Maximum number of epochs (default: 100).
    pub epochs: usize,
    /// Consecutive non-improving epochs tolerated before stopping
    /// (default: 5).
    pub patience: usize,
    /// Shuffle seed (default: 42).
    pub seed: u64,
    /// Optimizer (default: RMSprop).
    pub optimizer: OptimizerKind,
    /// RMSprop smoothing constant (default: 0.9).
    pub rms_alpha: f64,
    /// Log the running loss every this many batches (default: 100).
    pub log_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            test_batch_size: 1000,
            learning_rate: 0.001,
            epochs: 100,
            patience: 5,
            seed: 42,
            optimizer: OptimizerKind::RmsProp,
            rms_alpha: 0.9,
            log_every: 100,
        }
    }
}

impl TrainConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_test_batch_size(mut self, batch_size: usize) -> Self {
        self.test_batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_log_every(mut self, n: usize) -> Self {
        self.log_every = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "batch_size must be at least 2 for batch normalization, got {}",
                self.batch_size
            )));
        }
        if self.test_batch_size == 0 || self.epochs == 0 || self.log_every == 0 {
            return Err(Error::InvalidConfig(
                "test_batch_size, epochs and log_every must be non-zero".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.rms_alpha) {
            return Err(Error::InvalidConfig(format!(
                "rms_alpha must be in [0, 1), got {}",
                self.rms_alpha
            )));
        }
        Ok(())
    }
}

/// Outcome of one training epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean batch loss over the batches that ran.
    pub mean_loss: f64,
    /// Batches that ran.
    pub batches: usize,
    /// Batches skipped as too small.
    pub skipped: usize,
}

/// Training stats and held-out metrics of one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub train: EpochStats,
    pub test: RatingMetrics,
}

/// Summary of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub history: Vec<EpochRecord>,
    pub best_rmse: f64,
    pub best_mae: f64,
    /// 1-based epoch of the best RMSE.
    pub best_epoch: usize,
    pub stopped_early: bool,
}

/// Patience-based early stopping on RMSE.
///
/// An epoch improves when its RMSE is strictly below the best so far; the
/// MAE reported as best is the one from that same epoch.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: Option<(usize, RatingMetrics)>,
    endure: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: None,
            endure: 0,
        }
    }

    /// Record `metrics` for `epoch`; returns `true` when training should stop.
    pub fn update(&mut self, epoch: usize, metrics: RatingMetrics) -> bool {
        let improved = match self.best {
            None => metrics.rmse.is_finite(),
            Some((_, best)) => metrics.rmse < best.rmse,
        };
        if improved {
            self.best = Some((epoch, metrics));
            self.endure = 0;
        } else {
            self.endure += 1;
        }
        self.endure > self.patience
    }

    /// Best `(epoch, metrics)` so far.
    pub fn best(&self) -> Option<(usize, RatingMetrics)> {
        self.best
    }
}

/// Mini-batch trainer owning the optimizer state and shuffle RNG.
pub struct Trainer {
    config: TrainConfig,
    optimizer: TrainOptimizer,
    rng: ChaCha8Rng,
}

impl Trainer {
    /// Optimizes every variable in `varmap`, which must be the map the model
    /// was built on.
    pub fn new(config: TrainConfig, varmap: &VarMap) -> Result<Self> {
        config.validate()?;
        let optimizer = TrainOptimizer::new(
            config.optimizer,
            varmap.all_vars(),
            config.learning_rate,
            config.rms_alpha,
        )?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            optimizer,
            rng,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// One pass over `samples` in training mode.
    pub fn train_epoch(
        &mut self,
        model: &mut GraphRatingModel,
        samples: &[Sample],
        epoch: usize,
    ) -> Result<EpochStats> {
        model.train();
        let log_every = self.config.log_every;

        let mut total = 0.0f64;
        let mut window = 0.0f64;
        let mut ran = 0usize;
        let mut skipped = 0usize;

        for (i, batch) in shuffled_batches(samples, self.config.batch_size, &mut self.rng)
            .iter()
            .enumerate()
        {
            if batch.len() < 2 {
                warn!(epoch, batch = i, size = batch.len(), "skipping batch too small to train");
                skipped += 1;
                continue;
            }

            let loss = model.loss(&batch.users, &batch.reviews, &batch.ratings)?;
            let value = loss.to_dtype(DType::F32)?.to_scalar::<f32>()? as f64;
            if !value.is_finite() {
                return Err(Error::Training(format!(
                    "non-finite loss {value} at epoch {epoch}, batch {i}"
                )));
            }
            self.optimizer.backward_step(&loss)?;

            total += value;
            window += value;
            ran += 1;
            if ran % log_every == 0 {
                let running = window / log_every as f64;
                debug!(epoch, batch = i, loss = running, "training");
                window = 0.0;
            }
        }

        if ran == 0 {
            return Err(Error::Training(format!(
                "epoch {epoch}: no batch of at least 2 samples in {} training samples",
                samples.len()
            )));
        }

        let stats = EpochStats {
            epoch,
            mean_loss: total / ran as f64,
            batches: ran,
            skipped,
        };
        info!(epoch, loss = stats.mean_loss, batches = ran, skipped, "epoch done");
        Ok(stats)
    }

    /// Score `samples` in evaluation mode.
    pub fn evaluate(&self, model: &mut GraphRatingModel, samples: &[Sample]) -> Result<RatingMetrics> {
        model.eval();
        let mut predictions = Vec::with_capacity(samples.len());
        let mut targets = Vec::with_capacity(samples.len());
        for batch in batches(samples, self.config.test_batch_size) {
            predictions.extend(model.predict_vec(&batch.users, &batch.reviews)?);
            targets.extend_from_slice(&batch.ratings);
        }
        RatingMetrics::from_predictions(&predictions, &targets)
    }

    /// Train until `epochs` or early stopping.
    pub fn fit(
        &mut self,
        model: &mut GraphRatingModel,
        train: &[Sample],
        test: &[Sample],
    ) -> Result<TrainingReport> {
        self.fit_with(model, train, test, |_| {})
    }

    /// [`fit`](Self::fit), calling `on_epoch` after each evaluated epoch.
    pub fn fit_with<F>(
        &mut self,
        model: &mut GraphRatingModel,
        train: &[Sample],
        test: &[Sample],
        mut on_epoch: F,
    ) -> Result<TrainingReport>
    where
        F: FnMut(&EpochRecord),
    {
        if test.is_empty() {
            return Err(Error::InvalidConfig(
                "held-out samples are required for evaluation".to_string(),
            ));
        }

        let mut stopping = EarlyStopping::new(self.config.patience);
        let mut history = Vec::with_capacity(self.config.epochs);
        let mut stopped_early = false;

        for epoch in 1..=self.config.epochs {
            let stats = self.train_epoch(model, train, epoch)?;
            let metrics = self.evaluate(model, test)?;
            info!(epoch, rmse = metrics.rmse, mae = metrics.mae, "evaluation");

            let stop = stopping.update(epoch, metrics);
            let record = EpochRecord {
                train: stats,
                test: metrics,
            };
            on_epoch(&record);
            history.push(record);

            if stop {
                warn!(epoch, patience = self.config.patience, "early stopping");
                stopped_early = epoch < self.config.epochs;
                break;
            }
        }

        let (best_epoch, best) = stopping
            .best()
            .ok_or_else(|| Error::Training("no epoch produced a finite RMSE".to_string()))?;
        Ok(TrainingReport {
            history,
            best_rmse: best.rmse,
            best_mae: best.mae,
            best_epoch,
            stopped_early,
        })
    }
}
