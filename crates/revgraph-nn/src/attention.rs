//! Attention over a variable-length set of items.
//!
//! Scores each item jointly with an anchor (the aggregating entity's own
//! embedding) and normalizes with a softmax across the set:
//!
//! ```text
//! s_j = w_3 ReLU(W_2 ReLU(W_1 [x_j || anchor]))
//! a_j = exp(s_j) / sum_l exp(s_l)
//! ```
//!
//! History aggregation and interaction aggregation each own independent
//! instances.

use candle_core::{Tensor, D};
use candle_nn::{linear, ops::softmax, Dropout, Linear, Module, ModuleT, VarBuilder};

use crate::error::{Error, Result};

pub struct Attention {
    att1: Linear,
    att2: Linear,
    att3: Linear,
    dropout: Dropout,
    dim: usize,
}

impl Attention {
    pub fn new(dim: usize, dropout: f32, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            att1: linear(dim * 2, dim, vb.pp("att1"))?,
            att2: linear(dim, dim, vb.pp("att2"))?,
            att3: linear(dim, 1, vb.pp("att3"))?,
            dropout: Dropout::new(dropout),
            dim,
        })
    }

    /// Normalized weights for `items` `(k, dim)` against `anchor` `(1, dim)`.
    ///
    /// Returns `(k, 1)`; the column sums to one. `k` must be at least one.
    pub fn weights(&self, items: &Tensor, anchor: &Tensor, train: bool) -> Result<Tensor> {
        let (k, width) = items.dims2()?;
        if k == 0 {
            return Err(Error::ShapeMismatch {
                context: "attention items",
                expected: 1,
                got: 0,
            });
        }
        if width != self.dim {
            return Err(Error::ShapeMismatch {
                context: "attention item width",
                expected: self.dim,
                got: width,
            });
        }

        let anchor = anchor.broadcast_as((k, self.dim))?.contiguous()?;
        let x = Tensor::cat(&[items, &anchor], 1)?;

        let x = self.att1.forward(&x)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        let x = self.att2.forward(&x)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        let scores = self.att3.forward(&x)?;

        Ok(softmax(&scores, 0)?)
    }

    /// Attention-weighted sum of `items`, shape `(dim,)`.
    pub fn pool(&self, items: &Tensor, anchor: &Tensor, train: bool) -> Result<Tensor> {
        let weights = self.weights(items, anchor, train)?;
        Ok(items.broadcast_mul(&weights)?.sum(0)?)
    }

    /// Eval-mode weights as a flat vector, for inspection.
    pub fn weights_vec(&self, items: &Tensor, anchor: &Tensor) -> Result<Vec<f32>> {
        Ok(self
            .weights(items, anchor, false)?
            .squeeze(D::Minus1)?
            .to_dtype(candle_core::DType::F32)?
            .to_vec1()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_weights_sum_to_one() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let att = Attention::new(8, 0.5, vb).unwrap();
        let anchor = Tensor::randn(0f32, 1f32, (1, 8), &device).unwrap();

        for k in [1usize, 2, 7] {
            let items = Tensor::randn(0f32, 1f32, (k, 8), &device).unwrap();
            let w = att.weights_vec(&items, &anchor).unwrap();
            assert_eq!(w.len(), k);
            let total: f32 = w.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "k={k}: sum {total}");
            assert!(w.iter().all(|&x| x >= 0.0));
        }
    }

    #[test]
    fn test_single_item_gets_full_weight() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let att = Attention::new(4, 0.0, vb).unwrap();
        let items = Tensor::randn(0f32, 1f32, (1, 4), &device).unwrap();
        let anchor = Tensor::randn(0f32, 1f32, (1, 4), &device).unwrap();

        let pooled: Vec<f32> = att.pool(&items, &anchor, false).unwrap().to_vec1().unwrap();
        let original: Vec<f32> = items.squeeze(0).unwrap().to_vec1().unwrap();
        for (a, b) in pooled.iter().zip(&original) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_items_rejected() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let att = Attention::new(4, 0.0, vb).unwrap();
        let items = Tensor::zeros((0, 4), DType::F32, &device).unwrap();
        let anchor = Tensor::zeros((1, 4), DType::F32, &device).unwrap();
        assert!(att.weights(&items, &anchor, false).is_err());
    }
}
