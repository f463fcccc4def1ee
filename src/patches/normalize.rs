//! Per-patch contrast normalization: center each patch, then scale it to
//! (at most) unit energy with a beta-regularized denominator.

use burn::tensor::{Tensor, TensorData, backend::Backend};
use serde::{Deserialize, Serialize};

use crate::error::{PatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Subtract each patch's own mean before scaling.
    pub remove_mean: bool,
    /// Floor the squared norm at `beta` instead of adding `beta` to it.
    pub hard_beta: bool,
    pub beta: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            remove_mean: true,
            hard_beta: true,
            beta: 0.01,
        }
    }
}

impl NormalizeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(PatchError::InvalidConfig(format!(
                "beta must be finite and >= 0, got {}",
                self.beta
            )));
        }
        if self.beta == 0.0 {
            log::warn!("beta = 0: constant patches will divide by zero");
        }
        Ok(())
    }
}

/// Contrast normalizer (stateless, nothing is kept between calls).
#[derive(Debug, Clone)]
pub struct PatchNormalizer {
    cfg: NormalizeConfig,
}

impl PatchNormalizer {
    pub fn new(cfg: NormalizeConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.cfg
    }

    /// Normalizes a patch batch (N, D); output has the same shape.
    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [n, d] = x.dims();
        log::debug!("normalizing {n} patches of dim {d}");

        // [N, D] -> [N, 1], broadcast back over the feature axis
        let centered = if self.cfg.remove_mean {
            let mean = x.clone().mean_dim(1);
            x - mean
        } else {
            x
        };

        let sq_norm = centered.clone().powf_scalar(2.0).sum_dim(1);
        let denom = if self.cfg.hard_beta {
            sq_norm.clamp_min(self.cfg.beta)
        } else {
            sq_norm.add_scalar(self.cfg.beta)
        };

        centered / denom.sqrt()
    }

    /// Same as [`forward`](Self::forward) for data whose rank is only known
    /// at runtime. Anything but a 2-D batch is a shape error.
    pub fn forward_data<B: Backend>(
        &self,
        data: TensorData,
        device: &B::Device,
    ) -> Result<Tensor<B, 2>> {
        if data.shape.len() != 2 {
            return Err(PatchError::Shape(data.shape.clone()));
        }
        let x = Tensor::<B, 2>::from_data(data.convert::<B::FloatElem>(), device);
        Ok(self.forward(x))
    }
}
