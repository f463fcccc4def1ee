//! Informational statistics about patch batches and covariance spectra.
//! Nothing here feeds back into normalization or whitening.

use burn::tensor::{Tensor, backend::Backend};

use crate::io::to_precise;

/// Squared L2 norm of every patch (row).
pub fn squared_norms<B: Backend>(x: Tensor<B, 2>) -> Vec<f64> {
    x.powf_scalar(2.0).sum_dim(1).into_data().iter::<f64>().collect()
}

/// Unbiased covariance (D, D) of a batch, computed in double precision.
pub fn covariance<B: Backend>(x: Tensor<B, 2>) -> Vec<Vec<f64>> {
    let [n, d] = x.dims();
    let x = to_precise(x);
    let centered = x.clone() - x.mean_dim(0);
    let cov: Vec<f64> = centered
        .clone()
        .transpose()
        .matmul(centered)
        .div_scalar((n.max(2) - 1) as f64)
        .into_data()
        .iter::<f64>()
        .collect();
    cov.chunks(d).map(<[f64]>::to_vec).collect()
}

/// ‖C − I‖_F for a square matrix given as rows.
pub fn frobenius_distance_to_identity(c: &[Vec<f64>]) -> f64 {
    c.iter()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(move |(j, v)| if i == j { v - 1.0 } else { *v })
        })
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt()
}

/// Equal-width histogram over the finite values of a sample.
#[derive(Debug, Clone)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite
            .clone()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let mut counts = vec![0; bins];
        if min > max {
            return Self { min: 0.0, max: 0.0, counts };
        }
        let width = (max - min) / bins as f64;
        for v in finite {
            let idx = if width > 0.0 { ((v - min) / width) as usize } else { 0 };
            counts[idx.min(bins - 1)] += 1;
        }
        Self { min, max, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Logs one line per bin at debug level.
    pub fn log(&self, label: &str) {
        let bins = self.counts.len();
        let width = (self.max - self.min) / bins as f64;
        let peak = self.counts.iter().copied().max().unwrap_or(0).max(1);
        log::debug!("{label}: {} values in [{:.4}, {:.4}]", self.total(), self.min, self.max);
        for (i, count) in self.counts.iter().enumerate() {
            let lo = self.min + width * i as f64;
            let bar = "#".repeat(count * 40 / peak);
            log::debug!("  {lo:>12.4} | {count:>7} {bar}");
        }
    }
}

/// Summary of a covariance spectrum against the regularizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSummary {
    pub smallest: f64,
    pub largest: f64,
    /// Eigenvalues below gamma, i.e. directions whose gain is capped.
    pub below_gamma: usize,
}

impl SpectrumSummary {
    pub fn new(eigenvalues: &[f64], gamma: f64) -> Option<Self> {
        if eigenvalues.is_empty() {
            return None;
        }
        let smallest = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        let largest = eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let below_gamma = eigenvalues.iter().filter(|&&l| l < gamma).count();
        Some(Self {
            smallest,
            largest,
            below_gamma,
        })
    }

    /// Condition number of the regularized covariance.
    pub fn condition(&self, gamma: f64) -> f64 {
        (self.largest + gamma) / (self.smallest + gamma)
    }
}

pub fn log_eigenspectrum(eigenvalues: &[f64], gamma: f64) {
    match SpectrumSummary::new(eigenvalues, gamma) {
        Some(s) => log::debug!(
            "eigenspectrum: {} values in [{:.3e}, {:.3e}], {} below gamma = {gamma}, \
             condition {:.3e}",
            eigenvalues.len(),
            s.smallest,
            s.largest,
            s.below_gamma,
            s.condition(gamma)
        ),
        None => log::debug!("eigenspectrum: empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn squared_norms_per_row() {
        let x = Tensor::<B, 2>::from_data(
            TensorData::new(vec![3.0f32, 4.0, 1.0, 0.0], [2, 2]),
            &Default::default(),
        );
        assert_eq!(squared_norms(x), vec![25.0, 1.0]);
    }

    #[test]
    fn histogram_counts_every_finite_value() {
        let h = Histogram::new(&[0.0, 0.1, 0.5, 0.9, 1.0, f64::NAN], 2);
        assert_eq!(h.counts, vec![2, 3]);
        assert_eq!(h.total(), 5);
        assert_eq!((h.min, h.max), (0.0, 1.0));
    }

    #[test]
    fn histogram_of_constant_sample_uses_first_bin() {
        let h = Histogram::new(&[2.0; 4], 3);
        assert_eq!(h.counts, vec![4, 0, 0]);
    }

    #[test]
    fn spectrum_summary_counts_small_eigenvalues() {
        let s = SpectrumSummary::new(&[1e-4, 0.5, 2.0], 0.01).unwrap();
        assert_eq!(s.below_gamma, 1);
        assert_abs_diff_eq!(s.condition(0.01), 2.01 / 0.0101, epsilon = 1e-9);
        assert!(SpectrumSummary::new(&[], 0.01).is_none());
    }

    #[test]
    fn frobenius_distance_of_identity_is_zero() {
        let eye = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(frobenius_distance_to_identity(&eye), 0.0);
        let off = vec![vec![1.0, 0.3], vec![0.4, 1.0]];
        assert_abs_diff_eq!(frobenius_distance_to_identity(&off), 0.5, epsilon = 1e-12);
    }
}
