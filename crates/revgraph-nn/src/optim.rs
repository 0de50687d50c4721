//! Optimizers.
//!
//! candle-nn ships SGD and AdamW. [`RmsProp`] adds RMSprop on the same
//! [`Optimizer`] trait:
//!
//! ```text
//! g   = grad + weight_decay * p
//! v   = alpha * v + (1 - alpha) * g^2
//! p  -= lr * g / (sqrt(v) + eps)
//! ```

use std::fmt;
use std::str::FromStr;

use candle_core::backprop::GradStore;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamsRmsProp {
    pub lr: f64,
    /// Smoothing constant of the squared-gradient average.
    pub alpha: f64,
    pub eps: f64,
    pub weight_decay: f64,
}

impl Default for ParamsRmsProp {
    fn default() -> Self {
        Self {
            lr: 0.01,
            alpha: 0.99,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

#[derive(Debug)]
struct VarRmsProp {
    var: Var,
    square_avg: Var,
}

#[derive(Debug)]
pub struct RmsProp {
    vars: Vec<VarRmsProp>,
    params: ParamsRmsProp,
}

impl RmsProp {
    pub fn params(&self) -> &ParamsRmsProp {
        &self.params
    }
}

impl Optimizer for RmsProp {
    type Config = ParamsRmsProp;

    fn new(vars: Vec<Var>, params: ParamsRmsProp) -> candle_core::Result<Self> {
        let vars = vars
            .into_iter()
            .filter(|var| var.dtype().is_float())
            .map(|var| {
                let square_avg = Var::zeros(var.shape(), var.dtype(), var.device())?;
                Ok(VarRmsProp { var, square_avg })
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self { vars, params })
    }

    fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.params.lr = lr;
    }

    fn step(&mut self, grads: &GradStore) -> candle_core::Result<()> {
        let ParamsRmsProp {
            lr,
            alpha,
            eps,
            weight_decay,
        } = self.params;
        for v in &self.vars {
            // Batch-norm running statistics live in the same VarMap but never
            // receive gradients.
            let Some(g) = grads.get(&v.var) else {
                continue;
            };
            let g = if weight_decay != 0.0 {
                (g + (v.var.as_tensor() * weight_decay)?)?
            } else {
                g.clone()
            };
            let square_avg =
                ((v.square_avg.as_tensor() * alpha)? + (g.sqr()? * (1.0 - alpha))?)?;
            let update = ((g / (square_avg.sqrt()? + eps)?)? * lr)?;
            v.var.set(&v.var.sub(&update)?)?;
            v.square_avg.set(&square_avg)?;
        }
        Ok(())
    }
}

/// Optimizer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    RmsProp,
    AdamW,
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptimizerKind::RmsProp => "rmsprop",
            OptimizerKind::AdamW => "adamw",
        })
    }
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rmsprop" => Ok(OptimizerKind::RmsProp),
            "adamw" => Ok(OptimizerKind::AdamW),
            other => Err(format!("unknown optimizer '{other}' (expected rmsprop or adamw)")),
        }
    }
}

/// Either optimizer behind one interface.
pub enum TrainOptimizer {
    RmsProp(RmsProp),
    AdamW(AdamW),
}

impl TrainOptimizer {
    /// `rms_alpha` only applies to RMSprop.
    pub fn new(kind: OptimizerKind, vars: Vec<Var>, lr: f64, rms_alpha: f64) -> Result<Self> {
        Ok(match kind {
            OptimizerKind::RmsProp => TrainOptimizer::RmsProp(RmsProp::new(
                vars,
                ParamsRmsProp {
                    lr,
                    alpha: rms_alpha,
                    ..Default::default()
                },
            )?),
            OptimizerKind::AdamW => TrainOptimizer::AdamW(AdamW::new(
                vars,
                ParamsAdamW {
                    lr,
                    ..Default::default()
                },
            )?),
        })
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            TrainOptimizer::RmsProp(_) => OptimizerKind::RmsProp,
            TrainOptimizer::AdamW(_) => OptimizerKind::AdamW,
        }
    }

    /// Backward pass on `loss`, then one parameter update.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            TrainOptimizer::RmsProp(opt) => opt.backward_step(loss)?,
            TrainOptimizer::AdamW(opt) => opt.backward_step(loss)?,
        }
        Ok(())
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            TrainOptimizer::RmsProp(opt) => opt.learning_rate(),
            TrainOptimizer::AdamW(opt) => opt.learning_rate(),
        }
    }
}
