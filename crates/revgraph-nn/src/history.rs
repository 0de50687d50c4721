//! First hop: aggregation over an entity's rated interaction history.
//!
//! For entity `i` with history `[c_1..c_k]` and rating indices `[r_1..r_k]`:
//!
//! ```text
//! x_j   = ReLU(W_r2 ReLU(W_r1 [e(c_j) || e(r_j)]))
//! a_j   = softmax_j(Attention(x_j, e(i)))
//! agg_i = sum_j a_j x_j              (zero vector when k = 0)
//! h_i   = ReLU(W [e(i) || agg_i])
//! ```
//!
//! The user side aggregates reviews, the review side aggregates users; both
//! are instances of the same types built from different tables.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::{linear, Linear, Module, VarBuilder};
use revgraph_core::HistoryLists;

use crate::attention::Attention;
use crate::embedding::{Embed, EmbeddingTable};
use crate::error::{Error, Result};

/// Attention-weighted, rating-conditioned pooling of history items.
pub struct HistoryAggregator {
    counterparts: EmbeddingTable,
    ratings: EmbeddingTable,
    anchors: EmbeddingTable,
    w_r1: Linear,
    w_r2: Linear,
    attention: Attention,
    dim: usize,
}

impl HistoryAggregator {
    /// `anchors` is the table of the aggregating entities, `counterparts` the
    /// table their history items point into.
    pub fn new(
        counterparts: EmbeddingTable,
        ratings: EmbeddingTable,
        anchors: EmbeddingTable,
        dropout: f32,
        vb: VarBuilder,
    ) -> Result<Self> {
        let dim = anchors.dim();
        for table in [&counterparts, &ratings] {
            if table.dim() != dim {
                return Err(Error::ShapeMismatch {
                    context: "history aggregator table width",
                    expected: dim,
                    got: table.dim(),
                });
            }
        }
        Ok(Self {
            w_r1: linear(dim * 2, dim, vb.pp("w_r1"))?,
            w_r2: linear(dim, dim, vb.pp("w_r2"))?,
            attention: Attention::new(dim, dropout, vb.pp("att"))?,
            counterparts,
            ratings,
            anchors,
            dim,
        })
    }

    /// Rating-conditioned item features, `(k, dim)`.
    fn item_features(&self, items: &[u32], ratings: &[u32]) -> Result<Tensor> {
        let e_c = self.counterparts.lookup(items)?;
        let e_r = self.ratings.lookup(ratings)?;
        let x = Tensor::cat(&[&e_c, &e_r], 1)?;
        let x = self.w_r1.forward(&x)?.relu()?;
        Ok(self.w_r2.forward(&x)?.relu()?)
    }

    fn row<'h>(&self, id: u32, history: &'h HistoryLists) -> Result<(&'h [u32], &'h [u32])> {
        history.get(id).ok_or(Error::UnknownId {
            space: self.anchors.space(),
            id,
            len: history.len(),
        })
    }

    fn aggregate_one(&self, id: u32, history: &HistoryLists, train: bool) -> Result<Tensor> {
        let (items, ratings) = self.row(id, history)?;
        if items.is_empty() {
            let weights = self.anchors.lookup(&[id])?;
            return Ok(Tensor::zeros(self.dim, weights.dtype(), weights.device())?);
        }
        let x = self.item_features(items, ratings)?;
        let anchor = self.anchors.lookup(&[id])?;
        self.attention.pool(&x, &anchor, train)
    }

    /// One aggregated row per ID, `(ids.len(), dim)`.
    pub fn aggregate(&self, ids: &[u32], history: &HistoryLists, train: bool) -> Result<Tensor> {
        self.anchors.space().check_all(ids, self.anchors.len())?;
        if ids.is_empty() {
            let weights = self.anchors.lookup(&[])?;
            return Ok(Tensor::zeros((0, self.dim), weights.dtype(), weights.device())?);
        }
        let rows = ids
            .iter()
            .map(|&id| self.aggregate_one(id, history, train))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }

    /// Eval-mode attention weights over `id`'s history, `None` for an empty
    /// history.
    pub fn attention_weights(&self, id: u32, history: &HistoryLists) -> Result<Option<Vec<f32>>> {
        self.anchors.space().check(id, self.anchors.len())?;
        let (items, ratings) = self.row(id, history)?;
        if items.is_empty() {
            return Ok(None);
        }
        let x = self.item_features(items, ratings)?;
        let anchor = self.anchors.lookup(&[id])?;
        self.attention.weights_vec(&x, &anchor).map(Some)
    }
}

/// Combines an entity's own embedding with its aggregated history.
pub struct HistoryEncoder {
    table: EmbeddingTable,
    aggregator: HistoryAggregator,
    history: Arc<HistoryLists>,
    linear: Linear,
}

impl HistoryEncoder {
    pub fn new(
        table: EmbeddingTable,
        aggregator: HistoryAggregator,
        history: Arc<HistoryLists>,
        vb: VarBuilder,
    ) -> Result<Self> {
        if history.len() != table.len() {
            return Err(Error::ShapeMismatch {
                context: "history rows vs table size",
                expected: table.len(),
                got: history.len(),
            });
        }
        let dim = table.dim();
        Ok(Self {
            linear: linear(dim * 2, dim, vb.pp("linear1"))?,
            table,
            aggregator,
            history,
        })
    }

    pub fn aggregator(&self) -> &HistoryAggregator {
        &self.aggregator
    }

    /// Aggregated history only, before combination with the entity's own
    /// embedding.
    pub fn aggregate(&self, ids: &[u32], train: bool) -> Result<Tensor> {
        self.aggregator.aggregate(ids, &self.history, train)
    }

    pub fn attention_weights(&self, id: u32) -> Result<Option<Vec<f32>>> {
        self.aggregator.attention_weights(id, &self.history)
    }
}

impl Embed for HistoryEncoder {
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

    const DIM: usize = 8;

    /// User-side encoder over 3 users, 4 reviews, 5 rating slots. User 2 has
    /// no history.
    fn user_encoder(varmap: &VarMap) -> HistoryEncoder {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        let users = EmbeddingTable::new(IdSpace::User, 3, DIM, vb.pp("u2e")).unwrap();
        let reviews = EmbeddingTable::new(IdSpace::Review, 4, DIM, vb.pp("r2e")).unwrap();
        let ratings = EmbeddingTable::new(IdSpace::Rating, 5, DIM, vb.pp("rating2e")).unwrap();
        let history = HistoryLists::new(
            vec![vec![0, 1, 3], vec![2], vec![]],
            vec![vec![4, 2, 0], vec![3], vec![]],
        )
        .unwrap();
        let agg =
            HistoryAggregator::new(reviews, ratings, users.clone(), 0.5, vb.pp("agg")).unwrap();
        HistoryEncoder::new(users, agg, Arc::new(history), vb.pp("enc")).unwrap()
    }

    #[test]
    fn test_embed_shape() {
        let varmap = VarMap::new();
        let enc = user_encoder(&varmap);
        let out = enc.embed(&[0, 1, 2, 0], false).unwrap();
        assert_eq!(out.dims(), &[4, DIM]);
    }

    #[test]
    fn test_empty_history_aggregates_to_zero() {
        let varmap = VarMap::new();
        let enc = user_encoder(&varmap);
        for train in [false, true] {
            let agg: Vec<Vec<f32>> = enc.aggregate(&[2], train).unwrap().to_vec2().unwrap();
            assert_eq!(agg, vec![vec![0.0; DIM]]);
        }
    }

    #[test]
    fn test_attention_weights_sum_to_one() {
        let varmap = VarMap::new();
        let enc = user_encoder(&varmap);

        let w = enc.attention_weights(0).unwrap().unwrap();
        assert_eq!(w.len(), 3);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-5);

        let w = enc.attention_weights(1).unwrap().unwrap();
        assert_eq!(w.len(), 1);
        assert!((w[0] - 1.0).abs() < 1e-6);

        assert!(enc.attention_weights(2).unwrap().is_none());
    }

    #[test]
    fn test_unknown_anchor_id() {
        let varmap = VarMap::new();
        let enc = user_encoder(&varmap);
        assert!(matches!(
            enc.embed(&[3], false),
            Err(Error::UnknownId { id: 3, len: 3, .. })
        ));
    }

    #[test]
    fn test_history_rows_must_match_table() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let users = EmbeddingTable::new(IdSpace::User, 3, DIM, vb.pp("u2e")).unwrap();
        let reviews = EmbeddingTable::new(IdSpace::Review, 2, DIM, vb.pp("r2e")).unwrap();
        let ratings = EmbeddingTable::new(IdSpace::Rating, 2, DIM, vb.pp("rating2e")).unwrap();
        let agg =
            HistoryAggregator::new(reviews, ratings, users.clone(), 0.0, vb.pp("agg")).unwrap();
        let short = Arc::new(HistoryLists::empty(2));
        assert!(matches!(
            HistoryEncoder::new(users, agg, short, vb.pp("enc")),
            Err(Error::ShapeMismatch { expected: 3, got: 2, .. })
        ));
    }
}
