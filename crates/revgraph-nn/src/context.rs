//! Explicit execution context: where tensors live and in what precision.

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};

use crate::error::Result;

/// Device and dtype threaded through model construction.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub device: Device,
    pub dtype: DType,
}

impl ExecutionContext {
    pub fn new(device: Device, dtype: DType) -> Self {
        Self { device, dtype }
    }

    /// CPU, `f32`.
    pub fn cpu() -> Self {
        Self::new(Device::Cpu, DType::F32)
    }

    /// CUDA device `ordinal` when compiled with CUDA support and available,
    /// CPU otherwise.
    pub fn cuda_if_available(ordinal: usize) -> Result<Self> {
        Ok(Self::new(Device::cuda_if_available(ordinal)?, DType::F32))
    }

    pub fn is_cuda(&self) -> bool {
        self.device.is_cuda()
    }

    /// Variable builder backed by `varmap` on this context.
    pub fn var_builder<'a>(&self, varmap: &'a VarMap) -> VarBuilder<'a> {
        VarBuilder::from_varmap(varmap, self.dtype, &self.device)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::cpu()
    }
}
