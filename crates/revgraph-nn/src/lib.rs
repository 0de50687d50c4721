//! Graph attention encoders and rating head on candle.
//!
//! Predicts the rating a user assigns to a review from three learned
//! embedding tables (users, reviews, rating values) propagated over two
//! hops of graph structure:
//!
//! 1. **History** ([`history`]): each entity attends over its rated
//!    interactions with the opposite type, conditioned on the rating.
//! 2. **Interaction** ([`interaction`]): each entity attends over the
//!    history-encoded representations of its same-type neighbors.
//!
//! The two final representations meet in a batch-normalized regression
//! head ([`head`]).
//!
//! # Modules
//!
//! - [`embedding`]: ID-checked tables and the [`Embed`] capability
//! - [`attention`]: softmax attention over variable-size sets
//! - [`model`]: [`GraphRatingModel`] with `loss`, `predict` and train/eval mode
//! - [`optim`]: RMSprop and AdamW behind [`TrainOptimizer`]
//! - [`training`]: mini-batch [`Trainer`] with early stopping
//!
//! # Example
//!
//! ```rust,ignore
//! use candle_nn::VarMap;
//! use revgraph_core::Dataset;
//! use revgraph_nn::{ExecutionContext, GraphRatingModel, ModelConfig};
//!
//! let (graph, _train, test) = Dataset::toy().into_parts()?;
//! let ctx = ExecutionContext::cpu();
//! let varmap = VarMap::new();
//! let mut model = GraphRatingModel::new(&ModelConfig::default(), &graph, ctx.var_builder(&varmap))?;
//!
//! model.eval();
//! let scores = model.predict(&[0, 1], &[2, 0])?; // (2,)
//! ```

pub mod attention;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod head;
pub mod history;
pub mod interaction;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod training;

pub use attention::Attention;
pub use config::ModelConfig;
pub use context::ExecutionContext;
pub use embedding::{Embed, EmbeddingTable};
pub use error::{Error, Result};
pub use head::ScoringHead;
pub use history::{HistoryAggregator, HistoryEncoder};
pub use interaction::{InteractionAggregator, InteractionEncoder};
pub use metrics::RatingMetrics;
pub use model::{EntityEncoder, GraphRatingModel, Mode};
pub use optim::{OptimizerKind, ParamsRmsProp, RmsProp, TrainOptimizer};
pub use training::{EarlyStopping, EpochRecord, EpochStats, TrainConfig, Trainer, TrainingReport};
