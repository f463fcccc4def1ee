//! Backend selection with automatic GPU detection for Burn 0.18

use burn::backend::Autodiff;
use burn::prelude::*;
use log::info;

#[cfg(not(any(feature = "cpu", feature = "wgpu", feature = "cuda")))]
compile_error!("enable one of the `cpu`, `wgpu` or `cuda` features");

// Define backend types based on enabled features
#[cfg(feature = "cuda")]
pub type AutoBackend = burn_cuda::Cuda<f32>;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
pub type AutoBackend = burn_wgpu::Wgpu<f32, i32>;

#[cfg(all(feature = "cpu", not(any(feature = "cuda", feature = "wgpu"))))]
pub type AutoBackend = burn_ndarray::NdArray<f32>;

/// Backend used when an autoencoder is trained on whitened patches.
pub type TrainBackend = Autodiff<AutoBackend>;

/// Double precision CPU backend. Covariance estimation and the inverse
/// square root of the covariance always run here, whatever `AutoBackend` is.
pub type Precise = burn_ndarray::NdArray<f64>;

/// Get the best available device
pub fn get_device() -> <AutoBackend as Backend>::Device {
    #[cfg(feature = "cuda")]
    {
        info!("Using CUDA backend (NVIDIA GPU)");
        burn_cuda::CudaDevice::default()
    }

    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    {
        info!("Using WGPU backend (GPU via Vulkan/Metal/DX12)");
        burn_wgpu::WgpuDevice::default()
    }

    #[cfg(all(feature = "cpu", not(any(feature = "cuda", feature = "wgpu"))))]
    {
        info!("Using NdArray backend (CPU)");
        Default::default()
    }
}

/// Device of the double precision backend.
pub fn precise_device() -> <Precise as Backend>::Device {
    Default::default()
}

/// Log which backend the crate was compiled against.
pub fn log_backend_info() {
    #[cfg(feature = "cuda")]
    info!("backend: CUDA, patch batches on GPU 0, whitening fit on CPU (f64)");

    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    info!("backend: WGPU, patch batches on GPU, whitening fit on CPU (f64)");

    #[cfg(all(feature = "cpu", not(any(feature = "cuda", feature = "wgpu"))))]
    info!("backend: NdArray (CPU); rebuild with --features wgpu or cuda for GPU batches");
}
