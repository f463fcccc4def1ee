pub mod normalize;
pub mod sampler;

pub use normalize::{NormalizeConfig, PatchNormalizer};
pub use sampler::{PatchSampler, SamplingConfig};
