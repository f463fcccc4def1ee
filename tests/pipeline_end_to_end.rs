//! Images -> patches -> normalization -> whitening -> autoencoder -> filter grid.

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use patch_whiten::io::{FilterLayout, images_from_bytes, save_filter_grid};
use patch_whiten::training::train_autoencoder;
use patch_whiten::{PatchPipeline, PatchSampler, PipelineConfig, SgdStrategy, TrainingConfig};
use rand::{Rng, SeedableRng, rngs::StdRng};

type AB = Autodiff<NdArray<f32>>;

/// Smooth ramps plus noise, so neighbouring pixels are strongly correlated.
fn synthetic_images(count: usize, side: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = Vec::with_capacity(count * side * side);
    for _ in 0..count {
        let (gx, gy): (f64, f64) = (rng.random_range(-6.0..6.0), rng.random_range(-6.0..6.0));
        let offset: f64 = rng.random_range(60.0..190.0);
        for y in 0..side {
            for x in 0..side {
                let noise: f64 = rng.random_range(-10.0..10.0);
                let v = offset + gx * x as f64 + gy * y as f64 + noise;
                bytes.push(v.clamp(0.0, 255.0) as u8);
            }
        }
    }
    bytes
}

#[test]
fn full_pipeline_produces_filters() {
    let device = Default::default();
    let side = 16;
    let bytes = synthetic_images(30, side, 11);
    let images = images_from_bytes::<AB>(&bytes, [30, 1, side, side], &device).unwrap();

    let patches = PatchSampler::new(6, 6, 3).sample(images, 400).unwrap();
    assert_eq!(patches.dims(), [400, 36]);

    let mut cfg = PipelineConfig::default();
    cfg.normalize.beta = 0.01;
    let pipeline = PatchPipeline::new(&cfg).unwrap();
    let (model, whitened) = pipeline.prepare(patches).unwrap();
    assert_eq!(model.dim(), 36);
    assert_eq!(whitened.dims(), [400, 36]);

    let training = TrainingConfig {
        hidden_dim: 9,
        step_size: 0.01,
        iterations: 40,
        batch_size: 50,
        weight_decay: 1e-4,
        seed: 5,
    };
    let trained = train_autoencoder(whitened, &training, &mut SgdStrategy::default()).unwrap();
    assert_eq!(trained.losses.len(), 40);
    assert!(trained.losses.iter().all(|l| l.is_finite()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filters.png");
    let layout = FilterLayout {
        channels: 1,
        height: 6,
        width: 6,
    };
    save_filter_grid(&path, trained.model.filters(), layout).unwrap();
    assert!(path.exists());
}

#[test]
fn too_few_patches_for_the_dimension_is_an_error() {
    let device = Default::default();
    let bytes = synthetic_images(4, 8, 1);
    let images = images_from_bytes::<AB>(&bytes, [4, 1, 8, 8], &device).unwrap();
    let patches = PatchSampler::new(8, 8, 0).sample(images, 32).unwrap();

    let pipeline = PatchPipeline::new(&PipelineConfig::default()).unwrap();
    let err = pipeline.prepare(patches).unwrap_err();
    assert!(matches!(err, patch_whiten::PatchError::TooFewPatches { n: 32, d: 64 }));
}
