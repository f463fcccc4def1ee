//! Statistical properties of ZCA whitening on synthetic Gaussian patches.

use approx::assert_abs_diff_eq;
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use patch_whiten::diagnostics::{covariance, frobenius_distance_to_identity};
use patch_whiten::{Whitening, WhiteningConfig};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

type B = NdArray<f32>;

/// N samples of z · A with z ~ N(0, I). A is upper bidiagonal with a
/// diagonal of 3..=5 and ones above it, so cov = AᵀA is far from identity
/// and its smallest eigenvalue stays well above gamma.
fn correlated_gaussian(n: usize, d: usize, seed: u64) -> Tensor<B, 2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();

    let mut out = vec![0.0f32; n * d];
    for row in 0..n {
        let z: Vec<f64> = (0..d).map(|_| normal.sample(&mut rng)).collect();
        for j in 0..d {
            // (z · A)_j = z_j · A_jj + z_{j-1} · A_{j-1,j}
            let diag = 3.0 + (j % 3) as f64;
            let above = if j > 0 { z[j - 1] } else { 0.0 };
            out[row * d + j] = (z[j] * diag + above) as f32;
        }
    }
    Tensor::from_data(TensorData::new(out, [n, d]), &Default::default())
}

#[test]
fn gaussian_patches_whiten_to_near_identity_covariance() {
    let (n, d) = (1000, 64);
    let x = correlated_gaussian(n, d, 2024);

    let before = frobenius_distance_to_identity(&covariance(x.clone()));
    assert!(before > 10.0, "input should be far from white, got {before}");

    let whitening = Whitening::new(WhiteningConfig {
        gamma: 0.01,
        ..Default::default()
    })
    .unwrap();
    let (model, xw) = whitening.fit_transform(x).unwrap();
    assert_eq!(xw.dims(), [n, d]);

    let after = frobenius_distance_to_identity(&covariance(xw.clone()));
    assert!(after < 0.1, "whitened covariance is {after} away from identity");

    let means: Vec<f64> = xw.mean_dim(0).into_data().iter::<f64>().collect();
    for m in means {
        assert_abs_diff_eq!(m, 0.0, epsilon = 1e-4);
    }
    assert_eq!(model.eigenvalues().map(<[f64]>::len), Some(d));
}

#[test]
fn model_fitted_once_whitens_later_batches() {
    let d = 8;
    let fit_batch = correlated_gaussian(4000, d, 1);
    let later = correlated_gaussian(4000, d, 2);

    let model = Whitening::new(WhiteningConfig::default())
        .unwrap()
        .fit(fit_batch)
        .unwrap();
    let xw = model.apply(later).unwrap();

    // Held-out data from the same distribution is only approximately white.
    let dist = frobenius_distance_to_identity(&covariance(xw));
    assert!(dist < 0.5, "held-out distance {dist}");
}

#[test]
fn fitted_matrix_is_symmetric() {
    let model = Whitening::new(WhiteningConfig::default())
        .unwrap()
        .fit(correlated_gaussian(300, 12, 5))
        .unwrap();
    let p: Vec<f32> = model.matrix().clone().into_data().iter::<f32>().collect();
    for i in 0..12 {
        for j in 0..12 {
            assert_abs_diff_eq!(p[i * 12 + j], p[j * 12 + i], epsilon = 1e-6);
        }
    }
}
