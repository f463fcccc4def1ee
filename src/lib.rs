#![recursion_limit = "256"]

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod patches;
pub mod pipeline;
pub mod training;
pub mod whitening;

pub use backend::{AutoBackend, Precise, TrainBackend, get_device};
pub use config::PipelineConfig;
pub use error::{PatchError, Result};
pub use patches::{NormalizeConfig, PatchNormalizer, PatchSampler, SamplingConfig};
pub use pipeline::PatchPipeline;
pub use training::{SgdStrategy, StochasticOptimizer, TrainingConfig};
pub use whitening::{Whitening, WhiteningConfig, WhiteningMethod, WhiteningModel, apply_whitening};

use std::sync::Once;
static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(|| {
        // RUST_LOG wins, "info" otherwise
        let env = env_logger::Env::default().default_filter_or("info");

        // don't panic if called multiple times across binaries
        let _ = env_logger::Builder::from_env(env).try_init();
    });
}
