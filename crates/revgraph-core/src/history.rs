//! Per-entity interaction histories.
//!
//! A history row lists the counterpart entities an entity interacted with
//! (the reviews a user rated, or the users who rated a review) together with
//! the rating index attached to each interaction:
//!
//! ```text
//! items[i]   = [c_1, c_2, ..., c_k]
//! ratings[i] = [r_1, r_2, ..., r_k]
//! ```
//!
//! Both lists are always the same length. Rows may be empty (cold start).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::IdSpace;

/// Parallel history lists for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHistory", into = "RawHistory")]
pub struct HistoryLists {
    items: Vec<Vec<u32>>,
    ratings: Vec<Vec<u32>>,
}

#[derive(Serialize, Deserialize)]
struct RawHistory {
    items: Vec<Vec<u32>>,
    ratings: Vec<Vec<u32>>,
}

impl TryFrom<RawHistory> for HistoryLists {
    type Error = Error;

    fn try_from(raw: RawHistory) -> Result<Self> {
        Self::new(raw.items, raw.ratings)
    }
}

impl From<HistoryLists> for RawHistory {
    fn from(h: HistoryLists) -> Self {
        Self {
            items: h.items,
            ratings: h.ratings,
        }
    }
}

impl HistoryLists {
    /// Build history lists, checking the parallel-length invariant.
    pub fn new(items: Vec<Vec<u32>>, ratings: Vec<Vec<u32>>) -> Result<Self> {
        if items.len() != ratings.len() {
            return Err(Error::ShapeMismatch {
                context: "history rows vs history-rating rows",
                expected: items.len(),
                got: ratings.len(),
            });
        }
        for (row_items, row_ratings) in items.iter().zip(&ratings) {
            if row_items.len() != row_ratings.len() {
                return Err(Error::ShapeMismatch {
                    context: "history row vs history-rating row",
                    expected: row_items.len(),
                    got: row_ratings.len(),
                });
            }
        }
        Ok(Self { items, ratings })
    }

    /// Histories for `n` entities, all empty.
    pub fn empty(n: usize) -> Self {
        Self {
            items: vec![Vec::new(); n],
            ratings: vec![Vec::new(); n],
        }
    }

    /// Build from one `(counterpart, rating)` list per entity.
    pub fn from_pairs<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (u32, u32)>,
    {
        let (items, ratings) = rows
            .into_iter()
            .map(|row| row.into_iter().unzip::<u32, u32, Vec<_>, Vec<_>>())
            .unzip();
        Self { items, ratings }
    }

    /// Number of entity rows.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Counterparts and rating indices of entity `id`.
    ///
    /// Returns `None` for an ID past the last row.
    pub fn get(&self, id: u32) -> Option<(&[u32], &[u32])> {
        let i = id as usize;
        Some((self.items.get(i)?.as_slice(), self.ratings.get(i)?.as_slice()))
    }

    /// Total number of recorded interactions.
    pub fn num_interactions(&self) -> usize {
        self.items.iter().map(Vec::len).sum()
    }

    /// Number of rows with no history.
    pub fn num_cold_start(&self) -> usize {
        self.items.iter().filter(|row| row.is_empty()).count()
    }

    /// Check every counterpart and rating index against their table sizes.
    pub fn check_ids(
        &self,
        counterpart: IdSpace,
        num_counterparts: usize,
        num_ratings: usize,
    ) -> Result<()> {
        for (row_items, row_ratings) in self.items.iter().zip(&self.ratings) {
            counterpart.check_all(row_items, num_counterparts)?;
            IdSpace::Rating.check_all(row_ratings, num_ratings)?;
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, row: u32, item: u32, rating: u32) {
        let i = row as usize;
        self.items[i].push(item);
        self.ratings[i].push(rating);
    }
}
