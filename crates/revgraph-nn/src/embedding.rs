//! Embedding tables and the shared `Embed` capability.

use candle_core::{Device, Tensor};
use candle_nn::{embedding, Embedding, Module, VarBuilder};
use revgraph_core::IdSpace;

use crate::error::{Error, Result};

/// Anything that maps a batch of IDs to one `dim()`-wide row per ID.
///
/// Encoders are composed through this trait: an interaction aggregator owns
/// its upstream history encoder as an `E: Embed` instead of calling back
/// into it through a closure.
pub trait Embed {
    /// `(ids.len(), dim())` tensor. `train` selects training-mode behavior
    /// (dropout) in stochastic components.
    fn embed(&self, ids: &[u32], train: bool) -> Result<Tensor>;

    /// Output width.
    fn dim(&self) -> usize;
}

/// Learned lookup table for one ID space.
///
/// Cloning shares the underlying parameters: every clone reads and trains
/// the same weights.
#[derive(Clone)]
pub struct EmbeddingTable {
    space: IdSpace,
    inner: Embedding,
    len: usize,
    dim: usize,
}

impl EmbeddingTable {
    pub fn new(space: IdSpace, len: usize, dim: usize, vb: VarBuilder) -> Result<Self> {
        if len == 0 || dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "{space} table needs non-zero size, got {len} x {dim}"
            )));
        }
        let inner = embedding(len, dim, vb)?;
        Ok(Self {
            space,
            inner,
            len,
            dim,
        })
    }

    pub fn space(&self) -> IdSpace {
        self.space
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn device(&self) -> &Device {
        self.inner.embeddings().device()
    }

    /// Rows for `ids`, shape `(ids.len(), dim)`.
    ///
    /// Every ID is checked against the table length before the index tensor
    /// is built.
    pub fn lookup(&self, ids: &[u32]) -> Result<Tensor> {
        self.space.check_all(ids, self.len)?;
        if ids.is_empty() {
            let weights = self.inner.embeddings();
            return Ok(Tensor::zeros((0, self.dim), weights.dtype(), weights.device())?);
        }
        let index = Tensor::new(ids, self.device())?;
        Ok(self.inner.forward(&index)?)
    }
}

impl Embed for EmbeddingTable {
    fn embed(&self, ids: &[u32], _train: bool) -> Result<Tensor> {
        self.lookup(ids)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
