//! Inverse square root of a symmetric positive definite matrix by the coupled
//! Newton-Schulz iteration, with no eigendecomposition.
//!
//! With `A` scaled by its Frobenius norm every eigenvalue lies in (0, 1], which
//! keeps the iteration inside its convergence region:
//!
//! ```text
//! Y₀ = A / ‖A‖,  Z₀ = I
//! T  = (3I − Zₖ Yₖ) / 2
//! Yₖ₊₁ = Yₖ T,   Zₖ₊₁ = T Zₖ
//! ```
//!
//! `Yₖ → (A/‖A‖)^{1/2}` and `Zₖ → (A/‖A‖)^{-1/2}`,
//! so `A^{-1/2} = Z / sqrt(‖A‖)`.
//!
//! Small eigenvalues relative to `‖A‖` converge slowly, so the result is
//! checked against `‖Z·A·Z − I‖_F` before it is returned.

use burn::tensor::{ElementConversion, Tensor};

use crate::backend::Precise;
use crate::error::{PatchError, Result};

/// Largest accepted `‖Z·A·Z − I‖_F`.
pub const RESIDUAL_TOLERANCE: f64 = 1e-6;

pub const DEFAULT_ITERATIONS: usize = 50;

pub fn inverse_sqrt_symmetric(
    a: Tensor<Precise, 2>,
    iterations: usize,
) -> Result<Tensor<Precise, 2>> {
    let [d, _] = a.dims();
    let device = a.device();

    let norm_val = frobenius(a.clone());
    let eye = Tensor::<Precise, 2>::eye(d, &device);

    let mut y = a.clone().div_scalar(norm_val);
    let mut z = eye.clone();
    for _ in 0..iterations {
        let t = (eye.clone().mul_scalar(3.0) - z.clone().matmul(y.clone())).div_scalar(2.0);
        y = y.matmul(t.clone());
        z = t.matmul(z);
    }
    let z = z.div_scalar(norm_val.sqrt());

    let residual = frobenius(z.clone().matmul(a).matmul(z.clone()) - eye);
    if residual.is_nan() || residual > RESIDUAL_TOLERANCE {
        return Err(PatchError::NotConverged {
            iterations,
            residual,
        });
    }
    log::debug!("newton-schulz converged in {iterations} iterations, residual {residual:.3e}");
    Ok(z)
}

fn frobenius(a: Tensor<Precise, 2>) -> f64 {
    a.powf_scalar(2.0).sum().sqrt().into_scalar().elem::<f64>()
}
