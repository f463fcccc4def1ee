//! Raw patches -> contrast normalization -> ZCA fit + apply.

use burn::tensor::{Tensor, backend::Backend};
use log::{debug, info};

use crate::config::PipelineConfig;
use crate::diagnostics::{Histogram, log_eigenspectrum, squared_norms};
use crate::error::Result;
use crate::patches::PatchNormalizer;
use crate::whitening::{Whitening, WhiteningModel};

const NORM_HISTOGRAM_BINS: usize = 20;

pub struct PatchPipeline {
    normalizer: PatchNormalizer,
    whitening: Whitening,
}

impl PatchPipeline {
    pub fn new(cfg: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            normalizer: PatchNormalizer::new(cfg.normalize.clone())?,
            whitening: Whitening::new(cfg.whitening.clone())?,
        })
    }

    pub fn normalizer(&self) -> &PatchNormalizer {
        &self.normalizer
    }

    /// Normalizes raw patches (N, D), fits the whitening model on them and
    /// returns it with the whitened batch.
    pub fn prepare<B: Backend>(
        &self,
        raw: Tensor<B, 2>,
    ) -> Result<(WhiteningModel<B>, Tensor<B, 2>)> {
        let [n, d] = raw.dims();
        info!("preparing {n} patches of dim {d}");

        if log::log_enabled!(log::Level::Debug) {
            let raw_mean = raw.clone().mean_dim(1);
            let norms = squared_norms(raw.clone() - raw_mean);
            Histogram::new(&norms, NORM_HISTOGRAM_BINS)
                .log("squared patch norms before normalization");
        }

        let normalized = self.normalizer.forward(raw);
        let (model, whitened) = self.whitening.fit_transform(normalized)?;

        if let Some(eigenvalues) = model.eigenvalues() {
            log_eigenspectrum(eigenvalues, model.gamma());
        }
        debug!("whitened batch shape {:?}", whitened.dims());
        Ok((model, whitened))
    }

    /// Normalizes and whitens a further batch with an already fitted model.
    pub fn transform<B: Backend>(
        &self,
        model: &WhiteningModel<B>,
        raw: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>> {
        model.apply(self.normalizer.forward(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{covariance, frobenius_distance_to_identity};
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type B = NdArray<f64>;

    #[test]
    fn prepare_and_transform_agree_on_the_fit_batch() {
        let device = Default::default();
        let raw = Tensor::<B, 2>::random([200, 9], Distribution::Uniform(0.0, 1.0), &device);
        let pipeline = PatchPipeline::new(&PipelineConfig::default()).unwrap();

        let (model, whitened) = pipeline.prepare(raw.clone()).unwrap();
        let again = pipeline.transform(&model, raw).unwrap();

        let a: Vec<f64> = whitened.into_data().iter::<f64>().collect();
        let b: Vec<f64> = again.into_data().iter::<f64>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn whitened_output_is_close_to_decorrelated() {
        let device = Default::default();
        // Mixed uniform noise plus a shared component correlates the features.
        let base = Tensor::<B, 2>::random([500, 6], Distribution::Uniform(0.0, 1.0), &device);
        let shared = Tensor::<B, 2>::random([500, 1], Distribution::Uniform(0.0, 1.0), &device);
        let raw = base + shared.mul_scalar(2.0);

        let mut cfg = PipelineConfig::default();
        cfg.normalize.beta = 1e-3;
        cfg.whitening.gamma = 1e-6;
        let pipeline = PatchPipeline::new(&cfg).unwrap();
        let (_, whitened) = pipeline.prepare(raw).unwrap();

        let cov = covariance(whitened);
        // Row-wise mean removal leaves the constant direction with zero
        // variance, every other direction is whitened to unit variance.
        let dist = frobenius_distance_to_identity(&cov);
        assert!((dist - 1.0).abs() < 1e-3, "distance {dist}");
    }
}
