//! Rating regression head.
//!
//! ```text
//! x_u = W_uo2 Dropout(ReLU(BN_1(W_uo1 z_u)))
//! x_r = W_ro2 Dropout(ReLU(BN_2(W_ro1 z_r)))
//! x   = Dropout(ReLU(BN_3(W_ur1 [x_u || x_r])))
//! x   = Dropout(ReLU(BN_4(W_ur2 x)))
//! y   = W_ur3 x
//! ```

use candle_core::Tensor;
use candle_nn::{
    batch_norm, linear, BatchNorm, BatchNormConfig, Dropout, Linear, Module, ModuleT, VarBuilder,
};

use crate::config::ModelConfig;
use crate::error::{Error, Result};

pub struct ScoringHead {
    w_uo1: Linear,
    w_uo2: Linear,
    w_ro1: Linear,
    w_ro2: Linear,
    w_ur1: Linear,
    w_ur2: Linear,
    w_ur3: Linear,
    bn1: BatchNorm,
    bn2: BatchNorm,
    bn3: BatchNorm,
    bn4: BatchNorm,
    dropout: Dropout,
    dim: usize,
}

impl ScoringHead {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let dim = config.embed_dim;
        let hidden = config.head_hidden;
        let bn = BatchNormConfig {
            eps: 1e-5,
            remove_mean: true,
            affine: true,
            momentum: config.batch_norm_momentum,
        };
        Ok(Self {
            w_uo1: linear(dim, dim, vb.pp("w_uo1"))?,
            w_uo2: linear(dim, dim, vb.pp("w_uo2"))?,
            w_ro1: linear(dim, dim, vb.pp("w_ro1"))?,
            w_ro2: linear(dim, dim, vb.pp("w_ro2"))?,
            w_ur1: linear(dim * 2, dim, vb.pp("w_ur1"))?,
            w_ur2: linear(dim, hidden, vb.pp("w_ur2"))?,
            w_ur3: linear(hidden, 1, vb.pp("w_ur3"))?,
            bn1: batch_norm(dim, bn, vb.pp("bn1"))?,
            bn2: batch_norm(dim, bn, vb.pp("bn2"))?,
            bn3: batch_norm(dim, bn, vb.pp("bn3"))?,
            bn4: batch_norm(hidden, bn, vb.pp("bn4"))?,
            dropout: Dropout::new(config.dropout),
            dim,
        })
    }

    fn tower(
        &self,
        x: &Tensor,
        proj: &Linear,
        bn: &BatchNorm,
        out: &Linear,
        train: bool,
    ) -> Result<Tensor> {
        let x = proj.forward(x)?.apply_t(bn, train)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        Ok(out.forward(&x)?)
    }

    /// Scores for `(n, dim)` user and review representations, shape `(n,)`.
    pub fn forward(&self, users: &Tensor, reviews: &Tensor, train: bool) -> Result<Tensor> {
        let (n_users, user_width) = users.dims2()?;
        let (n_reviews, review_width) = reviews.dims2()?;
        if n_users != n_reviews {
            return Err(Error::ShapeMismatch {
                context: "scoring head review rows vs user rows",
                expected: n_users,
                got: n_reviews,
            });
        }
        for width in [user_width, review_width] {
            if width != self.dim {
                return Err(Error::ShapeMismatch {
                    context: "scoring head input width",
                    expected: self.dim,
                    got: width,
                });
            }
        }

        let x_u = self.tower(users, &self.w_uo1, &self.bn1, &self.w_uo2, train)?;
        let x_r = self.tower(reviews, &self.w_ro1, &self.bn2, &self.w_ro2, train)?;

        let x = Tensor::cat(&[&x_u, &x_r], 1)?;
        let x = self.w_ur1.forward(&x)?.apply_t(&self.bn3, train)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        let x = self.w_ur2.forward(&x)?.apply_t(&self.bn4, train)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        let scores = self.w_ur3.forward(&x)?;

        Ok(scores.squeeze(1)?)
    }
}
