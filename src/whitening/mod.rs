//! ZCA whitening: fit a mean vector and a symmetric whitening matrix on a
//! reference batch, then apply them to any batch of the same dimension.
//!
//! The fit always runs in double precision on the CPU ([`Precise`]); the
//! fitted parameters are moved back onto the caller's backend and device.

pub mod eigen;
pub mod newton_schulz;

use burn::tensor::{Tensor, TensorData, backend::Backend};
use serde::{Deserialize, Serialize};

use crate::backend::Precise;
use crate::error::{PatchError, Result};
use crate::io::{from_precise, to_precise};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteningConfig {
    /// Added to every eigenvalue before inversion; bounds the gain of
    /// low-variance directions.
    pub gamma: f64,
    pub method: WhiteningMethod,
    pub solver: InverseSqrtSolver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhiteningMethod {
    /// `V diag(g) Vᵀ`: decorrelates and keeps the pixel basis.
    Zca,
    /// `V diag(g)`: decorrelates into the eigenbasis.
    Pca,
    /// Identity transform with zero mean.
    None,
}

/// How `(C + γI)^{-1/2}` is computed for ZCA. PCA always needs the eigenbasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InverseSqrtSolver {
    Eigen,
    NewtonSchulz {
        #[serde(default = "default_newton_schulz_iterations")]
        iterations: usize,
    },
}

fn default_newton_schulz_iterations() -> usize {
    newton_schulz::DEFAULT_ITERATIONS
}

impl Default for WhiteningConfig {
    fn default() -> Self {
        Self {
            gamma: 0.01,
            method: WhiteningMethod::Zca,
            solver: InverseSqrtSolver::Eigen,
        }
    }
}

impl WhiteningConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(PatchError::InvalidConfig(format!(
                "gamma must be finite and > 0, got {}",
                self.gamma
            )));
        }
        if let InverseSqrtSolver::NewtonSchulz { iterations: 0 } = self.solver {
            return Err(PatchError::InvalidConfig(
                "newton-schulz needs at least one iteration".into(),
            ));
        }
        Ok(())
    }
}

/// Whitening estimator (stateless). [`fit`](Self::fit) produces an immutable
/// [`WhiteningModel`].
#[derive(Debug, Clone)]
pub struct Whitening {
    cfg: WhiteningConfig,
}

impl Whitening {
    pub fn new(cfg: WhiteningConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &WhiteningConfig {
        &self.cfg
    }

    /// Fits mean and whitening matrix on a normalized batch (N, D).
    ///
    /// Requires `N > D`, otherwise the covariance is singular.
    pub fn fit<B: Backend>(&self, x: Tensor<B, 2>) -> Result<WhiteningModel<B>> {
        let [n, d] = x.dims();
        if n <= d {
            return Err(PatchError::TooFewPatches { n, d });
        }
        let device = x.device();
        let gamma = self.cfg.gamma;

        if self.cfg.method == WhiteningMethod::None {
            return Ok(WhiteningModel {
                mean: Tensor::zeros([d], &device),
                matrix: Tensor::eye(d, &device),
                gamma,
                eigenvalues: None,
            });
        }

        let x = to_precise(x);
        let mean = x.clone().mean_dim(0); // [1, D]
        let x_centered = x - mean.clone();

        // Unbiased covariance: (Xcᵀ Xc) / (n - 1)
        let cov = x_centered
            .clone()
            .transpose()
            .matmul(x_centered)
            .div_scalar((n - 1) as f64);
        log::debug!(
            "fitting {:?} whitening on {n} patches of dim {d}, gamma = {gamma}",
            self.cfg.method
        );

        let (matrix, eigenvalues) = match (self.cfg.method, self.cfg.solver) {
            (WhiteningMethod::Zca, InverseSqrtSolver::NewtonSchulz { iterations }) => {
                let eye = Tensor::<Precise, 2>::eye(d, &cov.device()).mul_scalar(gamma);
                (newton_schulz::inverse_sqrt_symmetric(cov + eye, iterations)?, None)
            }
            (method, _) => {
                let eig = eigen::symmetric_eigen(cov)?;
                warn_on_negative_spectrum(&eig.values, gamma);
                let gains: Vec<f64> = eig
                    .values
                    .iter()
                    .map(|l| 1.0 / (l + gamma).sqrt())
                    .collect();
                let matrix = if method == WhiteningMethod::Zca {
                    eigen::reconstruct(eig.vectors, &gains)
                } else {
                    let device = eig.vectors.device();
                    let scale = TensorData::new(gains, [d]);
                    let scale = Tensor::<Precise, 1>::from_data(scale, &device).reshape([1, d]);
                    eig.vectors * scale
                };
                (matrix, Some(eig.values))
            }
        };

        Ok(WhiteningModel {
            mean: from_precise(mean.reshape([d]), &device),
            matrix: from_precise(matrix, &device),
            gamma,
            eigenvalues,
        })
    }

    /// Fits on `x` and returns the model together with `x` whitened by it.
    pub fn fit_transform<B: Backend>(
        &self,
        x: Tensor<B, 2>,
    ) -> Result<(WhiteningModel<B>, Tensor<B, 2>)> {
        let model = self.fit(x.clone())?;
        let xw = model.apply(x)?;
        Ok((model, xw))
    }
}

fn warn_on_negative_spectrum(eigenvalues: &[f64], gamma: f64) {
    let bad = eigenvalues.iter().filter(|&&l| l + gamma <= 0.0).count();
    if bad > 0 {
        log::warn!("{bad} eigenvalues at or below -gamma, whitening matrix will contain NaN");
    }
}

/// Fitted whitening parameters. Immutable after [`Whitening::fit`].
#[derive(Debug, Clone)]
pub struct WhiteningModel<B: Backend> {
    mean: Tensor<B, 1>,
    matrix: Tensor<B, 2>,
    gamma: f64,
    eigenvalues: Option<Vec<f64>>,
}

impl<B: Backend> WhiteningModel<B> {
    pub fn dim(&self) -> usize {
        self.mean.dims()[0]
    }

    pub fn mean(&self) -> &Tensor<B, 1> {
        &self.mean
    }

    pub fn matrix(&self) -> &Tensor<B, 2> {
        &self.matrix
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Covariance spectrum seen during the fit, when an eigendecomposition ran.
    pub fn eigenvalues(&self) -> Option<&[f64]> {
        self.eigenvalues.as_deref()
    }

    /// Whitens a batch (N, D) with the fitted parameters.
    pub fn apply(&self, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        apply_whitening(x, self.mean.clone(), self.matrix.clone())
    }
}

/// `(x − mean) · matrix`. Inputs are consumed, never mutated in place.
///
/// `x` is (N, D), `mean` has length D and `matrix` has D rows; anything else
/// is a [`PatchError::DimensionMismatch`].
pub fn apply_whitening<B: Backend>(
    x: Tensor<B, 2>,
    mean: Tensor<B, 1>,
    matrix: Tensor<B, 2>,
) -> Result<Tensor<B, 2>> {
    let [_, d] = x.dims();
    let [mean_len] = mean.dims();
    let [rows, _] = matrix.dims();
    for actual in [d, rows] {
        if actual != mean_len {
            return Err(PatchError::DimensionMismatch {
                expected: mean_len,
                actual,
            });
        }
    }

    // Reshape explicitly to [1, D] so the subtraction broadcasts over rows.
    let x_centered = x - mean.reshape([1, d]);
    Ok(x_centered.matmul(matrix))
}
