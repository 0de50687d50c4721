use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Embedding and hidden dimension `D`, shared by every table and layer
    /// (default: 64).
    pub embed_dim: usize,
    /// Dropout probability in attention and scoring layers (default: 0.5).
    pub dropout: f32,
    /// Batch-norm running-statistics momentum (default: 0.5).
    pub batch_norm_momentum: f64,
    /// Width of the last hidden layer of the scoring head (default: 16).
    pub head_hidden: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embed_dim: 64,
            dropout: 0.5,
            batch_norm_momentum: 0.5,
            head_hidden: 16,
        }
    }
}

impl ModelConfig {
    pub fn with_embed_dim(mut self, dim: usize) -> Self {
        self.embed_dim = dim;
        self
    }

    pub fn with_dropout(mut self, p: f32) -> Self {
        self.dropout = p;
        self
    }

    pub fn with_batch_norm_momentum(mut self, momentum: f64) -> Self {
        self.batch_norm_momentum = momentum;
        self
    }

    pub fn with_head_hidden(mut self, hidden: usize) -> Self {
        self.head_hidden = hidden;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.embed_dim == 0 || self.head_hidden == 0 {
            return Err(Error::InvalidConfig(
                "embed_dim and head_hidden must be non-zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(0.0..=1.0).contains(&self.batch_norm_momentum) {
            return Err(Error::InvalidConfig(format!(
                "batch_norm_momentum must be in [0, 1], got {}",
                self.batch_norm_momentum
            )));
        }
        Ok(())
    }
}
