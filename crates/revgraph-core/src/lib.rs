//! Data model for review-rating graphs.
//!
//! Two node types (users and reviews) connected in two ways:
//!
//! - **Histories**: each user's rated reviews and each review's raters, every
//!   interaction tagged with a discrete rating index ([`HistoryLists`]).
//! - **Adjacency**: same-type neighbor sets, user-user (social) and
//!   review-review (similarity) ([`Adjacency`]).
//!
//! Supervision comes as `(user, review, rating)` [`Sample`]s. A [`Dataset`]
//! bundles all of it and validates into an [`InteractionGraph`], the
//! read-only structure models are built from.
//!
//! # Example
//!
//! ```rust
//! use revgraph_core::{Dataset, IdSpace};
//!
//! let dataset = Dataset::toy();
//! let (graph, train, test) = dataset.into_parts()?;
//!
//! assert_eq!(graph.num_users(), 3);
//! assert_eq!(graph.adjacency(IdSpace::User).unwrap().neighbors(0), &[1, 2]);
//! assert_eq!(train.len() + test.len(), 6);
//! # Ok::<(), revgraph_core::Error>(())
//! ```

mod adjacency;
mod dataset;
mod error;
mod graph;
mod history;
mod ids;
pub mod sample;

pub use adjacency::Adjacency;
pub use dataset::{Dataset, DatasetStats, SyntheticConfig};
pub use error::{Error, Result};
pub use graph::{InteractionGraph, TableSizes};
pub use history::HistoryLists;
pub use ids::IdSpace;
pub use sample::{Sample, SampleBatch};
