//! Second hop: aggregation over same-type neighbors.
//!
//! For entity `i` with neighbors `[n_1..n_k]` in the secondary graph:
//!
//! ```text
//! h_j     = upstream.embed(n_j)
//! a_j     = softmax_j(Attention(h_j, e(i)))
//! inter_i = sum_j a_j h_j            (zero vector when k = 0)
//! z_i     = ReLU(W [e(i) || inter_i])
//! ```
//!
//! `upstream` is injected at construction; in the full model it is the
//! history encoder of the same entity type.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::{linear, Linear, Module, VarBuilder};
use revgraph_core::Adjacency;

use crate::attention::Attention;
use crate::embedding::{Embed, EmbeddingTable};
use crate::error::{Error, Result};

/// Attention pooling of upstream neighbor representations.
pub struct InteractionAggregator<E> {
    upstream: E,
    anchors: EmbeddingTable,
    attention: Attention,
    dim: usize,
}

impl<E: Embed> InteractionAggregator<E> {
    pub fn new(upstream: E, anchors: EmbeddingTable, dropout: f32, vb: VarBuilder) -> Result<Self> {
        let dim = anchors.dim();
        if upstream.dim() != dim {
            return Err(Error::ShapeMismatch {
                context: "interaction aggregator upstream width",
                expected: dim,
                got: upstream.dim(),
            });
        }
        Ok(Self {
            attention: Attention::new(dim, dropout, vb.pp("att"))?,
            upstream,
            anchors,
            dim,
        })
    }

    pub fn upstream(&self) -> &E {
        &self.upstream
    }

    fn aggregate_one(&self, id: u32, adjacency: &Adjacency, train: bool) -> Result<Tensor> {
        let anchor = self.anchors.lookup(&[id])?;
        let neighbors = adjacency.neighbors(id);
        if neighbors.is_empty() {
            return Ok(Tensor::zeros(self.dim, anchor.dtype(), anchor.device())?);
        }
        let h = self.upstream.embed(neighbors, train)?;
        self.attention.pool(&h, &anchor, train)
    }

    /// One aggregated row per ID, `(ids.len(), dim)`.
    pub fn aggregate(&self, ids: &[u32], adjacency: &Adjacency, train: bool) -> Result<Tensor> {
        self.anchors.space().check_all(ids, self.anchors.len())?;
        if ids.is_empty() {
            let weights = self.anchors.lookup(&[])?;
            return Ok(Tensor::zeros((0, self.dim), weights.dtype(), weights.device())?);
        }
        let rows = ids
            .iter()
            .map(|&id| self.aggregate_one(id, adjacency, train))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }

    /// Eval-mode attention weights over `id`'s neighbors, in
    /// `adjacency.neighbors(id)` order. `None` for an isolated entity.
    pub fn attention_weights(&self, id: u32, adjacency: &Adjacency) -> Result<Option<Vec<f32>>> {
        let anchor = self.anchors.lookup(&[id])?;
        let neighbors = adjacency.neighbors(id);
        if neighbors.is_empty() {
            return Ok(None);
        }
        let h = self.upstream.embed(neighbors, false)?;
        self.attention.weights_vec(&h, &anchor).map(Some)
    }
}

/// Combines an entity's raw embedding with its aggregated neighborhood.
pub struct InteractionEncoder<E> {
    table: EmbeddingTable,
    aggregator: InteractionAggregator<E>,
    adjacency: Arc<Adjacency>,
    linear: Linear,
}

impl<E: Embed> InteractionEncoder<E> {
    pub fn new(
        table: EmbeddingTable,
        aggregator: InteractionAggregator<E>,
        adjacency: Arc<Adjacency>,
        vb: VarBuilder,
    ) -> Result<Self> {
        adjacency.check_ids(table.space(), table.len())?;
        let dim = table.dim();
        Ok(Self {
            linear: linear(dim * 2, dim, vb.pp("linear1"))?,
            table,
            aggregator,
            adjacency,
        })
    }

    pub fn aggregator(&self) -> &InteractionAggregator<E> {
        &self.aggregator
    }

    /// Aggregated neighborhood only.
    pub fn aggregate(&self, ids: &[u32], train: bool) -> Result<Tensor> {
        self.aggregator.aggregate(ids, &self.adjacency, train)
    }

    pub fn attention_weights(&self, id: u32) -> Result<Option<Vec<f32>>> {
        self.aggregator.attention_weights(id, &self.adjacency)
    }
}

impl<E: Embed> Embed for InteractionEncoder<E> {
    fn embed(&self, ids: &[u32], train: bool) -> Result<Tensor> {
        let self_feats = self.table.lookup(ids)?;
        let neigh_feats = self.aggregate(ids, train)?;
        let combined = Tensor::cat(&[&self_feats, &neigh_feats], 1)?;
        Ok(self.linear.forward(&combined)?.relu()?)
    }

    fn dim(&self) -> usize {
        self.table.dim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;
    use revgraph_core::IdSpace;

    const DIM: usize = 6;

    /// Interaction encoder over 4 users: 0-1-2 form a triangle, 3 is
    /// isolated. The raw table stands in for the upstream encoder.
    fn encoder(varmap: &VarMap) -> InteractionEncoder<EmbeddingTable> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        let users = EmbeddingTable::new(IdSpace::User, 4, DIM, vb.pp("u2e")).unwrap();
        let adjacency = Adjacency::from_undirected_edges(4, [(0, 1), (1, 2), (0, 2)]);
        let agg =
            InteractionAggregator::new(users.clone(), users.clone(), 0.5, vb.pp("agg")).unwrap();
        InteractionEncoder::new(users, agg, Arc::new(adjacency), vb.pp("enc")).unwrap()
    }

    #[test]
    fn test_embed_shape() {
        let varmap = VarMap::new();
        let enc = encoder(&varmap);
        assert_eq!(enc.embed(&[0, 3, 1], false).unwrap().dims(), &[3, DIM]);
    }

    #[test]
    fn test_isolated_entity_aggregates_to_zero() {
        let varmap = VarMap::new();
        let enc = encoder(&varmap);
        for train in [false, true] {
            let agg: Vec<Vec<f32>> = enc.aggregate(&[3], train).unwrap().to_vec2().unwrap();
            assert_eq!(agg, vec![vec![0.0; DIM]]);
        }
        assert!(enc.attention_weights(3).unwrap().is_none());
    }

    #[test]
    fn test_attention_weights_sum_to_one() {
        let varmap = VarMap::new();
        let enc = encoder(&varmap);
        for id in 0..3 {
            let w = enc.attention_weights(id).unwrap().unwrap();
            assert_eq!(w.len(), 2);
            assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unknown_id() {
        let varmap = VarMap::new();
        let enc = encoder(&varmap);
        assert!(matches!(
            enc.embed(&[4], false),
            Err(Error::UnknownId { id: 4, len: 4, .. })
        ));
    }

    #[test]
    fn test_upstream_width_must_match() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let narrow = EmbeddingTable::new(IdSpace::User, 4, 3, vb.pp("narrow")).unwrap();
        let users = EmbeddingTable::new(IdSpace::User, 4, DIM, vb.pp("u2e")).unwrap();
        assert!(InteractionAggregator::new(narrow, users, 0.0, vb.pp("agg")).is_err());
    }
}
