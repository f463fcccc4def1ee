//! Single hidden layer autoencoder used to learn filters from patches.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, activation::sigmoid, backend::Backend},
};

use super::Objective;

#[derive(Debug, Clone)]
pub struct AutoencoderConfig {
    pub in_dim: usize,
    pub hidden_dim: usize,
}

#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    encoder: Linear<B>,
    decoder: Linear<B>,
}

impl<B: Backend> Autoencoder<B> {
    pub fn init(cfg: &AutoencoderConfig, device: &B::Device) -> Self {
        Self {
            encoder: LinearConfig::new(cfg.in_dim, cfg.hidden_dim).init(device),
            decoder: LinearConfig::new(cfg.hidden_dim, cfg.in_dim).init(device),
        }
    }

    /// (N, in_dim) -> (N, hidden_dim), sigmoid codes.
    pub fn encode(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        sigmoid(self.encoder.forward(x))
    }

    /// Forward: (N, in_dim) -> (N, in_dim)
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decoder.forward(self.encode(x))
    }

    /// Encoder filters, one per row: (hidden_dim, in_dim).
    pub fn filters(&self) -> Tensor<B, 2> {
        self.encoder.weight.val().transpose()
    }

    fn weight_energy(&self) -> Tensor<B, 1> {
        let enc = self.encoder.weight.val().powf_scalar(2.0).sum();
        let dec = self.decoder.weight.val().powf_scalar(2.0).sum();
        enc + dec
    }
}

/// Mean (over patches) squared reconstruction error plus L2 weight decay.
#[derive(Debug, Clone, Copy)]
pub struct ReconstructionObjective {
    pub weight_decay: f64,
}

impl<B: Backend> Objective<B, Autoencoder<B>> for ReconstructionObjective {
    fn loss(&self, model: &Autoencoder<B>, batch: Tensor<B, 2>) -> Tensor<B, 1> {
        let recon = model.forward(batch.clone());
        let err = (recon - batch).powf_scalar(2.0).sum_dim(1).mean();
        if self.weight_decay > 0.0 {
            err + model.weight_energy().mul_scalar(self.weight_decay)
        } else {
            err
        }
    }
}
