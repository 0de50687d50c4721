//! The immutable graph bundle a model is built from.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::{Adjacency, HistoryLists, IdSpace};

/// Table sizes for the three ID spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSizes {
    pub users: usize,
    pub reviews: usize,
    pub ratings: usize,
}

impl TableSizes {
    pub fn len(&self, space: IdSpace) -> usize {
        match space {
            IdSpace::User => self.users,
            IdSpace::Review => self.reviews,
            IdSpace::Rating => self.ratings,
        }
    }
}

/// Validated histories and adjacency for both entity types.
///
/// Every list sits behind an `Arc`: encoders keep cheap read-only handles
/// for the lifetime of the model.
#[derive(Debug, Clone)]
pub struct InteractionGraph {
    sizes: TableSizes,
    user_history: Arc<HistoryLists>,
    review_history: Arc<HistoryLists>,
    user_adjacency: Arc<Adjacency>,
    review_adjacency: Arc<Adjacency>,
}

impl InteractionGraph {
    /// Validate and assemble the graph.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if any table is empty
    /// - `ShapeMismatch` if a history's row count differs from its table size,
    ///   or an adjacency has more rows than its table
    /// - `UnknownId` for any out-of-range counterpart, rating or neighbor
    pub fn new(
        sizes: TableSizes,
        user_history: HistoryLists,
        review_history: HistoryLists,
        user_adjacency: Adjacency,
        review_adjacency: Adjacency,
    ) -> Result<Self> {
        for space in [IdSpace::User, IdSpace::Review, IdSpace::Rating] {
            if sizes.len(space) == 0 {
                return Err(Error::InvalidConfig(format!("{space} table is empty")));
            }
        }
        let sides = [
            (
                IdSpace::User,
                &user_history,
                &user_adjacency,
                "user history rows vs user count",
            ),
            (
                IdSpace::Review,
                &review_history,
                &review_adjacency,
                "review history rows vs review count",
            ),
        ];
        for (space, history, adjacency, context) in sides {
            let n = sizes.len(space);
            if history.len() != n {
                return Err(Error::ShapeMismatch {
                    context,
                    expected: n,
                    got: history.len(),
                });
            }
            let counterpart = space
                .counterpart()
                .ok_or_else(|| Error::InvalidConfig(format!("{space} has no counterpart")))?;
            history.check_ids(counterpart, sizes.len(counterpart), sizes.ratings)?;
            adjacency.check_ids(space, n)?;
        }

        Ok(Self {
            sizes,
            user_history: Arc::new(user_history),
            review_history: Arc::new(review_history),
            user_adjacency: Arc::new(user_adjacency),
            review_adjacency: Arc::new(review_adjacency),
        })
    }

    pub fn sizes(&self) -> TableSizes {
        self.sizes
    }

    pub fn num_users(&self) -> usize {
        self.sizes.users
    }

    pub fn num_reviews(&self) -> usize {
        self.sizes.reviews
    }

    pub fn num_ratings(&self) -> usize {
        self.sizes.ratings
    }

    /// History of an entity type: reviews rated by users, or users who
    /// rated reviews. `Rating` has no history and yields `None`.
    pub fn history(&self, space: IdSpace) -> Option<Arc<HistoryLists>> {
        match space {
            IdSpace::User => Some(Arc::clone(&self.user_history)),
            IdSpace::Review => Some(Arc::clone(&self.review_history)),
            IdSpace::Rating => None,
        }
    }

    /// Same-type adjacency of an entity type.
    pub fn adjacency(&self, space: IdSpace) -> Option<Arc<Adjacency>> {
        match space {
            IdSpace::User => Some(Arc::clone(&self.user_adjacency)),
            IdSpace::Review => Some(Arc::clone(&self.review_adjacency)),
            IdSpace::Rating => None,
        }
    }
}
