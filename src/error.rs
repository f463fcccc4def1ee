//! Crate-wide error type.

/// Errors raised by normalization, whitening, sampling and io.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("expected a 2-D patch batch (N, D), got shape {0:?}")]
    Shape(Vec<usize>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("whitening needs more patches than features, got n = {n}, d = {d}")]
    TooFewPatches { n: usize, d: usize },

    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("eigendecomposition failed: {0}")]
    Eigen(String),

    #[error("no convergence after {iterations} iterations, residual {residual:.3e}")]
    NotConverged { iterations: usize, residual: f64 },

    #[error("invalid input data: {0}")]
    Data(String),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to render TOML: {0}")]
    ConfigRender(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, PatchError>;
