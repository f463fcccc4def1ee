use std::path::Path;

use burn::tensor::{Tensor, TensorData, backend::Backend};
use image::{Rgb, RgbImage};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::backend::{Precise, precise_device};
use crate::error::{PatchError, Result};

/// Load from Vec<Vec<f64>> into a Burn Tensor (N, D).
pub fn load_from_vec<B: Backend>(data: Vec<Vec<f64>>, device: &B::Device) -> Result<Tensor<B, 2>> {
    if data.is_empty() || data[0].is_empty() {
        return Err(PatchError::Data("input vector cannot be empty".into()));
    }

    let nrows = data.len();
    let ncols = data[0].len();
    if data.iter().any(|row| row.len() != ncols) {
        return Err(PatchError::Data("inconsistent row lengths in input vector".into()));
    }

    let flat_data: Vec<f64> = data.into_iter().flatten().collect();
    let tensor_data = TensorData::new(flat_data, vec![nrows, ncols]);
    Ok(Tensor::from_data(tensor_data.convert::<B::FloatElem>(), device))
}

/// Build an image batch (E, C, H, W) from planar u8 pixels, scaled to [0, 1].
///
/// The byte layout is the one used by raw CIFAR-style dumps once the label
/// bytes are stripped: image-major, then channel planes, then rows.
pub fn images_from_bytes<B: Backend>(
    bytes: &[u8],
    shape: [usize; 4],
    device: &B::Device,
) -> Result<Tensor<B, 4>> {
    let expected: usize = shape.iter().product();
    if expected == 0 {
        return Err(PatchError::Data(format!("empty image shape {shape:?}")));
    }
    if bytes.len() != expected {
        return Err(PatchError::Data(format!(
            "expected {expected} bytes for shape {shape:?}, got {}",
            bytes.len()
        )));
    }

    let values: Vec<f32> = bytes.iter().map(|&b| f32::from(b) / 255.0).collect();
    let tensor_data = TensorData::new(values, shape);
    Ok(Tensor::from_data(tensor_data.convert::<B::FloatElem>(), device))
}

/// Copy a tensor into the double precision backend.
pub fn to_precise<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<Precise, D> {
    let shape = x.dims();
    let values: Vec<f64> = x.into_data().iter::<f64>().collect();
    Tensor::from_data(TensorData::new(values, shape), &precise_device())
}

/// Copy a double precision tensor back onto a caller's backend and device.
pub fn from_precise<B: Backend, const D: usize>(
    x: Tensor<Precise, D>,
    device: &B::Device,
) -> Tensor<B, D> {
    Tensor::from_data(x.into_data().convert::<B::FloatElem>(), device)
}

/// Convert a (D, D) double precision tensor into a smartcore DenseMatrix.
pub fn tensor_to_dense(x: Tensor<Precise, 2>) -> DenseMatrix<f64> {
    let [nrows, ncols] = x.dims();
    let values: Vec<f64> = x.into_data().iter::<f64>().collect();
    DenseMatrix::from_iterator(values.into_iter(), nrows, ncols, 0)
}

/// Convert a smartcore DenseMatrix back into a row-major tensor.
pub fn dense_to_tensor(matrix: &DenseMatrix<f64>) -> Tensor<Precise, 2> {
    let (nrows, ncols) = matrix.shape();
    let mut row_major_data = Vec::with_capacity(nrows * ncols);
    for r in 0..nrows {
        for c in 0..ncols {
            row_major_data.push(*matrix.get((r, c)));
        }
    }
    Tensor::from_data(TensorData::new(row_major_data, [nrows, ncols]), &precise_device())
}

/// Layout of a single flattened filter: channel planes of `height × width`.
#[derive(Debug, Clone, Copy)]
pub struct FilterLayout {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FilterLayout {
    pub fn dim(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// Render filters (K, C·H·W) as a tiled PNG, one min-max scaled tile per
/// filter, separated by a one pixel black border.
pub fn save_filter_grid<B: Backend>(
    path: &Path,
    filters: Tensor<B, 2>,
    layout: FilterLayout,
) -> Result<()> {
    let [k, d] = filters.dims();
    if layout.channels != 1 && layout.channels != 3 {
        return Err(PatchError::InvalidConfig(format!(
            "filter grids need 1 or 3 channels, got {}",
            layout.channels
        )));
    }
    if d != layout.dim() {
        return Err(PatchError::DimensionMismatch {
            expected: layout.dim(),
            actual: d,
        });
    }
    if k == 0 {
        return Err(PatchError::Data("no filters to render".into()));
    }

    let cols = ((k as f64).sqrt().ceil() as usize).max(1);
    let rows = k.div_ceil(cols);
    let (h, w) = (layout.height, layout.width);
    let plane = h * w;

    let mut img = RgbImage::new((cols * (w + 1) + 1) as u32, (rows * (h + 1) + 1) as u32);
    let values: Vec<f32> = filters.into_data().iter::<f32>().collect();

    for (idx, filter) in values.chunks(d).enumerate() {
        let lo = filter.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = filter.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let span = (hi - lo).max(f32::EPSILON);
        let scale = |v: f32| (((v - lo) / span) * 255.0).round().clamp(0.0, 255.0) as u8;

        let ox = 1 + (idx % cols) * (w + 1);
        let oy = 1 + (idx / cols) * (h + 1);
        for y in 0..h {
            for x in 0..w {
                let at = y * w + x;
                let rgb = if layout.channels == 1 {
                    let g = scale(filter[at]);
                    [g, g, g]
                } else {
                    [
                        scale(filter[at]),
                        scale(filter[plane + at]),
                        scale(filter[2 * plane + at]),
                    ]
                };
                img.put_pixel((ox + x) as u32, (oy + y) as u32, Rgb(rgb));
            }
        }
    }

    img.save(path)?;
    log::info!("wrote {k} filters ({rows}x{cols} grid) to {}", path.display());
    Ok(())
}
