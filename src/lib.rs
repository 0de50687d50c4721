//! `revgraph` predicts the rating a user gives a review with a two-hop
//! graph attention model.
//!
//! This crate re-exports the workspace:
//!
//! - [`data`]: histories, adjacency, samples and datasets (`revgraph-core`)
//! - [`model`]: encoders, scoring head, optimizers and trainer (`revgraph-nn`)
//!
//! # Example
//!
//! ```rust,no_run
//! use candle_nn::VarMap;
//! use revgraph::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (graph, train, test) = Dataset::toy().into_parts()?;
//! let ctx = ExecutionContext::cpu();
//! let varmap = VarMap::new();
//! let mut model = GraphRatingModel::new(&ModelConfig::default(), &graph, ctx.var_builder(&varmap))?;
//!
//! let mut trainer = Trainer::new(TrainConfig::default().with_batch_size(2).with_epochs(3), &varmap)?;
//! let report = trainer.fit(&mut model, &train, &test)?;
//! println!("rmse {:.4}, mae {:.4}", report.best_rmse, report.best_mae);
//! # Ok(())
//! # }
//! ```

pub mod data {
    pub use revgraph_core::*;
}

pub mod model {
    pub use revgraph_nn::*;
}

pub mod prelude {
    pub use revgraph_core::{Dataset, IdSpace, InteractionGraph, Sample, SyntheticConfig};
    pub use revgraph_nn::{
        Embed, ExecutionContext, GraphRatingModel, Mode, ModelConfig, OptimizerKind,
        RatingMetrics, TrainConfig, Trainer, TrainingReport,
    };
}
