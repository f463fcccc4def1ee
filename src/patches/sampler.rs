//! Random fixed-size patch sampling from an image batch (E, C, H, W).

use burn::tensor::{Tensor, TensorData, backend::Backend};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::{PatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub patch_height: usize,
    pub patch_width: usize,
    pub count: usize,
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            patch_height: 8,
            patch_width: 8,
            count: 10_000,
            seed: 42,
        }
    }
}

/// Draws patches uniformly over images and positions. Patches are flattened
/// channel-major, then row, then column.
#[derive(Debug, Clone)]
pub struct PatchSampler {
    patch_height: usize,
    patch_width: usize,
    seed: u64,
}

impl PatchSampler {
    pub fn new(patch_height: usize, patch_width: usize, seed: u64) -> Self {
        Self {
            patch_height,
            patch_width,
            seed,
        }
    }

    pub fn from_config(cfg: &SamplingConfig) -> Self {
        Self::new(cfg.patch_height, cfg.patch_width, cfg.seed)
    }

    pub fn sample<B: Backend>(&self, images: Tensor<B, 4>, count: usize) -> Result<Tensor<B, 2>> {
        let [e, c, h, w] = images.dims();
        let (ph, pw) = (self.patch_height, self.patch_width);

        if count == 0 {
            return Err(PatchError::InvalidConfig("patch count must be > 0".into()));
        }
        if e == 0 || c == 0 {
            return Err(PatchError::Data(format!("empty image batch {:?}", [e, c, h, w])));
        }
        if ph == 0 || pw == 0 || ph > h || pw > w {
            return Err(PatchError::InvalidConfig(format!(
                "patch {ph}x{pw} does not fit in images of {h}x{w}"
            )));
        }

        let device = images.device();
        let pixels: Vec<B::FloatElem> = images
            .into_data()
            .to_vec()
            .map_err(|err| PatchError::Data(format!("{err:?}")))?;

        let d = c * ph * pw;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = Vec::with_capacity(count * d);
        for _ in 0..count {
            let img = rng.random_range(0..e);
            let top = rng.random_range(0..=h - ph);
            let left = rng.random_range(0..=w - pw);
            for ch in 0..c {
                let plane = (img * c + ch) * h * w;
                for y in top..top + ph {
                    let row = plane + y * w;
                    out.extend_from_slice(&pixels[row + left..row + left + pw]);
                }
            }
        }

        log::debug!("sampled {count} patches of {c}x{ph}x{pw} from {e} images");
        Ok(Tensor::from_data(TensorData::new(out, [count, d]), &device))
    }
}
