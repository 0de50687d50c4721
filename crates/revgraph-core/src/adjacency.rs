//! Same-type neighbor lists (user-user or review-review).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::IdSpace;

/// Secondary graph over one entity type.
///
/// Each row is a sorted, de-duplicated neighbor set. Entities past the
/// last stored row are isolated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct Adjacency {
    rows: Vec<Vec<u32>>,
}

impl From<Vec<Vec<u32>>> for Adjacency {
    fn from(rows: Vec<Vec<u32>>) -> Self {
        Self::new(rows)
    }
}

impl From<Adjacency> for Vec<Vec<u32>> {
    fn from(adj: Adjacency) -> Self {
        adj.rows
    }
}

impl Adjacency {
    pub fn new(mut rows: Vec<Vec<u32>>) -> Self {
        for row in &mut rows {
            row.sort_unstable();
            row.dedup();
        }
        Self { rows }
    }

    /// Adjacency with no edges.
    pub fn isolated() -> Self {
        Self::default()
    }

    /// Build an undirected adjacency over `n` entities from an edge list.
    ///
    /// Self-loops are dropped.
    pub fn from_undirected_edges(n: usize, edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut rows = vec![Vec::new(); n];
        for (a, b) in edges {
            if a == b {
                continue;
            }
            if let Some(row) = rows.get_mut(a as usize) {
                row.push(b);
            }
            if let Some(row) = rows.get_mut(b as usize) {
                row.push(a);
            }
        }
        Self::new(rows)
    }

    /// Neighbors of `id`; empty for isolated entities.
    pub fn neighbors(&self, id: u32) -> &[u32] {
        self.rows.get(id as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of stored rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of directed edges (each undirected edge counts twice).
    pub fn num_edges(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Number of linked pairs, whichever direction the links run.
    ///
    /// A mutual link counts once, as does a one-way link, so directed
    /// rows (trust graphs) are counted correctly.
    pub fn num_linked_pairs(&self) -> usize {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(a, row)| row.iter().map(move |&b| (a as u32, b)))
            .filter(|&(a, b)| a <= b || self.neighbors(b).binary_search(&a).is_err())
            .count()
    }

    /// Number of entities in `0..n` with no neighbors.
    pub fn num_isolated(&self, n: usize) -> usize {
        (0..n as u32).filter(|&i| self.neighbors(i).is_empty()).count()
    }

    /// Check the row count and every neighbor against a table of `n` entries.
    pub fn check_ids(&self, space: IdSpace, n: usize) -> Result<()> {
        if self.rows.len() > n {
            return Err(Error::ShapeMismatch {
                context: "adjacency rows vs table size",
                expected: n,
                got: self.rows.len(),
            });
        }
        self.rows
            .iter()
            .try_for_each(|row| space.check_all(row, n))
    }
}
