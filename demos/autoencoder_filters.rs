//! Learn autoencoder filters on raw and on ZCA-whitened patches and write both
//! filter grids as PNG files.
//!
//! ```text
//! cargo run --release --example autoencoder_filters -- [config.toml] [images.bin E C H W]
//! ```
//!
//! Without an image dump, smooth synthetic images are generated.

use std::path::{Path, PathBuf};

use anyhow::Context;
use burn::tensor::{Distribution, Tensor, backend::Backend};
use log::info;
use patch_whiten::{
    PatchPipeline, PatchSampler, PipelineConfig, SgdStrategy, TrainBackend,
    backend::{get_device, log_backend_info},
    io::{FilterLayout, images_from_bytes, save_filter_grid},
    training::train_autoencoder,
};

type Device = <TrainBackend as Backend>::Device;

fn synthetic_images(device: &Device) -> Tensor<TrainBackend, 4> {
    // Box-blurred noise: strong local pixel correlations, like natural images.
    let noise =
        Tensor::<TrainBackend, 4>::random([64, 1, 34, 34], Distribution::Uniform(0.0, 1.0), device);
    let mut blurred = noise.clone().slice([0..64, 0..1, 0..32, 0..32]);
    for dy in 0..3 {
        for dx in 0..3 {
            if dy + dx > 0 {
                blurred = blurred + noise.clone().slice([0..64, 0..1, dy..dy + 32, dx..dx + 32]);
            }
        }
    }
    blurred.div_scalar(9.0)
}

fn load_images(args: &[String], device: &Device) -> anyhow::Result<Tensor<TrainBackend, 4>> {
    let Some(path) = args.get(2) else {
        info!("no image dump given, using synthetic images");
        return Ok(synthetic_images(device));
    };
    let dims: Vec<usize> = args[3..]
        .iter()
        .map(|a| a.parse::<usize>())
        .collect::<Result<_, _>>()
        .context("image shape must be four integers: E C H W")?;
    let [e, c, h, w] = dims[..] else {
        anyhow::bail!("image shape must be four integers: E C H W");
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {path}"))?;
    Ok(images_from_bytes(&bytes, [e, c, h, w], device)?)
}

fn main() -> anyhow::Result<()> {
    patch_whiten::init();
    log_backend_info();

    let args: Vec<String> = std::env::args().collect();
    let cfg = match args.get(1) {
        Some(path) => PipelineConfig::load(Path::new(path))?,
        None => PipelineConfig::default(),
    };

    let device = get_device();
    let images = load_images(&args, &device)?;
    let [_, channels, _, _] = images.dims();

    let sampling = &cfg.sampling;
    let patches = PatchSampler::from_config(sampling).sample(images, sampling.count)?;
    let layout = FilterLayout {
        channels,
        height: sampling.patch_height,
        width: sampling.patch_width,
    };

    let pipeline = PatchPipeline::new(&cfg)?;
    let normalized = pipeline.normalizer().forward(patches.clone());
    let (_, whitened) = pipeline.prepare(patches)?;

    let out_dir = PathBuf::from("filters");
    std::fs::create_dir_all(&out_dir)?;

    for (name, data) in [("raw", normalized), ("whitened", whitened)] {
        info!("training on {name} patches");
        let trained = train_autoencoder(data, &cfg.training, &mut SgdStrategy::default())?;
        let last = trained.losses.last().copied().unwrap_or(f64::NAN);
        info!("{name}: final loss {last:.5}");
        save_filter_grid(&out_dir.join(format!("{name}.png")), trained.model.filters(), layout)?;
    }

    Ok(())
}
