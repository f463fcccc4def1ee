//! Downstream training on whitened patches. The optimizer is injected through
//! [`StochasticOptimizer`], so the whitening code never depends on it.

pub mod autoencoder;

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig},
    tensor::{
        ElementConversion, Int, Tensor, TensorData,
        backend::{AutodiffBackend, Backend},
    },
};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::error::{PatchError, Result};

pub use autoencoder::{Autoencoder, AutoencoderConfig, ReconstructionObjective};

/// Scalar loss of a model on one batch.
pub trait Objective<B: Backend, M> {
    fn loss(&self, model: &M, batch: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Step size and iteration count for one optimization run.
#[derive(Debug, Clone, Copy)]
pub struct TrainControls {
    pub step_size: f64,
    pub iterations: usize,
    /// Log the running loss every `log_every` steps, 0 disables.
    pub log_every: usize,
}

/// Parameters returned by an optimizer, with the loss seen at every step.
#[derive(Debug)]
pub struct Trained<M> {
    pub model: M,
    pub losses: Vec<f64>,
}

/// Minimizes an objective over a stream of batches, starting from `params`.
pub trait StochasticOptimizer<B: AutodiffBackend, M: AutodiffModule<B>> {
    fn minimize<O, S>(
        &mut self,
        objective: &O,
        params: M,
        stream: &mut S,
        controls: &TrainControls,
    ) -> Trained<M>
    where
        O: Objective<B, M>,
        S: Iterator<Item = Tensor<B, 2>>;
}

/// Plain stochastic gradient descent through burn's optimizer.
#[derive(Clone)]
pub struct SgdStrategy {
    config: SgdConfig,
}

impl SgdStrategy {
    pub fn new(config: SgdConfig) -> Self {
        Self { config }
    }
}

impl Default for SgdStrategy {
    fn default() -> Self {
        Self::new(SgdConfig::new())
    }
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> StochasticOptimizer<B, M> for SgdStrategy {
    fn minimize<O, S>(
        &mut self,
        objective: &O,
        params: M,
        stream: &mut S,
        controls: &TrainControls,
    ) -> Trained<M>
    where
        O: Objective<B, M>,
        S: Iterator<Item = Tensor<B, 2>>,
    {
        let mut optim = self.config.init::<B, M>();
        let mut model = params;
        let mut losses = Vec::with_capacity(controls.iterations);

        for step in 0..controls.iterations {
            let Some(batch) = stream.next() else {
                warn!("data stream ended after {step} of {} steps", controls.iterations);
                break;
            };

            let loss = objective.loss(&model, batch);
            losses.push(loss.clone().into_scalar().elem::<f64>());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(controls.step_size, model, grads);

            if controls.log_every > 0 && (step + 1) % controls.log_every == 0 {
                let window = &losses[losses.len().saturating_sub(controls.log_every)..];
                let mean = window.iter().sum::<f64>() / window.len() as f64;
                info!("step {:>6}/{}: loss {mean:.5}", step + 1, controls.iterations);
            }
        }

        Trained { model, losses }
    }
}

/// Endless stream of shuffled mini-batches drawn without replacement within
/// each pass over the rows.
pub struct MiniBatches<B: Backend> {
    data: Tensor<B, 2>,
    batch_size: usize,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl<B: Backend> MiniBatches<B> {
    pub fn new(data: Tensor<B, 2>, batch_size: usize, seed: u64) -> Result<Self> {
        let [n, _] = data.dims();
        if batch_size == 0 || batch_size > n {
            return Err(PatchError::InvalidConfig(format!(
                "batch size must be in 1..={n}, got {batch_size}"
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        Ok(Self {
            data,
            batch_size,
            order,
            cursor: 0,
            rng,
        })
    }
}

impl<B: Backend> Iterator for MiniBatches<B> {
    type Item = Tensor<B, 2>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor + self.batch_size > self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
        }
        let idx: Vec<i64> = self.order[self.cursor..self.cursor + self.batch_size]
            .iter()
            .map(|&i| i as i64)
            .collect();
        self.cursor += self.batch_size;

        let indices = Tensor::<B, 1, Int>::from_data(
            TensorData::new(idx, [self.batch_size]).convert::<B::IntElem>(),
            &self.data.device(),
        );
        Some(self.data.clone().select(0, indices))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub hidden_dim: usize,
    pub step_size: f64,
    pub iterations: usize,
    pub batch_size: usize,
    pub weight_decay: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 100,
            step_size: 0.1,
            iterations: 2_000,
            batch_size: 100,
            weight_decay: 1e-4,
            seed: 7,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 || self.batch_size == 0 {
            return Err(PatchError::InvalidConfig(
                "hidden_dim and batch_size must be > 0".into(),
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(PatchError::InvalidConfig(format!(
                "step_size must be finite and > 0, got {}",
                self.step_size
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(PatchError::InvalidConfig(format!(
                "weight_decay must be finite and >= 0, got {}",
                self.weight_decay
            )));
        }
        Ok(())
    }
}

/// Trains an autoencoder on patches (N, D) with whatever optimizer is given.
pub fn train_autoencoder<B, O>(
    patches: Tensor<B, 2>,
    cfg: &TrainingConfig,
    optimizer: &mut O,
) -> Result<Trained<Autoencoder<B>>>
where
    B: AutodiffBackend,
    O: StochasticOptimizer<B, Autoencoder<B>>,
{
    cfg.validate()?;
    let [n, d] = patches.dims();
    let device = patches.device();
    info!(
        "training autoencoder {d} -> {} -> {d} on {n} patches for {} steps",
        cfg.hidden_dim, cfg.iterations
    );

    let model = Autoencoder::init(
        &AutoencoderConfig {
            in_dim: d,
            hidden_dim: cfg.hidden_dim,
        },
        &device,
    );
    let mut stream = MiniBatches::new(patches, cfg.batch_size, cfg.seed)?;
    let objective = ReconstructionObjective {
        weight_decay: cfg.weight_decay,
    };
    let controls = TrainControls {
        step_size: cfg.step_size,
        iterations: cfg.iterations,
        log_every: (cfg.iterations / 10).max(1),
    };

    Ok(optimizer.minimize(&objective, model, &mut stream, &controls))
}
