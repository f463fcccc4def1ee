//! Symmetric eigendecomposition of a covariance matrix via smartcore.

use burn::tensor::{Tensor, TensorData};
use smartcore::linalg::traits::evd::EVDDecomposable;

use crate::backend::Precise;
use crate::error::{PatchError, Result};
use crate::io::{dense_to_tensor, tensor_to_dense};

/// Eigen-pairs of a symmetric matrix. `vectors` holds one eigenvector per
/// column; no particular ordering of the pairs is promised.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    pub vectors: Tensor<Precise, 2>,
}

pub fn symmetric_eigen(a: Tensor<Precise, 2>) -> Result<SymmetricEigen> {
    let [rows, cols] = a.dims();
    if rows != cols {
        return Err(PatchError::DimensionMismatch {
            expected: rows,
            actual: cols,
        });
    }

    let dense = tensor_to_dense(a);
    let evd = dense.evd(true).map_err(|err| PatchError::Eigen(err.to_string()))?;

    Ok(SymmetricEigen {
        values: evd.d,
        vectors: dense_to_tensor(&evd.V),
    })
}

/// `V · diag(gains) · Vᵀ`, symmetrized to remove round-off asymmetry.
pub fn reconstruct(vectors: Tensor<Precise, 2>, gains: &[f64]) -> Tensor<Precise, 2> {
    let [d, _] = vectors.dims();
    let device = vectors.device();
    let scale = Tensor::<Precise, 1>::from_data(TensorData::new(gains.to_vec(), [d]), &device)
        .reshape([1, d]);

    // Scaling V's columns is V · diag(gains).
    let p = (vectors.clone() * scale).matmul(vectors.transpose());
    (p.clone() + p.transpose()).div_scalar(2.0)
}
