//! Reciprocal-space 3D FFT engine for SCPN Spectral Core.
//!
//! The native path decomposes each transform into three axis passes of
//! workgroup-local mixed-radix 1D FFTs (radices 2, 3, 5, 7) generated as
//! specialized WGSL; the vendor path delegates to rustfft for shapes the
//! native kernels cannot take. Both are unnormalized: a forward transform
//! followed by an inverse multiplies every value by xsize*ysize*zsize.

use std::sync::Arc;

use spectral_gpu::{GpuBuffer, GpuContext};
use spectral_types::config::{BackendKind, TransformConfig};
use spectral_types::error::SpectralResult;

pub mod codegen;
pub mod dimension;
pub mod engine;
pub mod packing;
pub mod radix;
pub mod vendor;

pub use dimension::{find_legal_dimension, is_legal_dimension};
pub use engine::{GpuFft3D, TransformPlan};
pub use vendor::RustFft3D;

/// A 3D FFT backend of fixed shape. The two implementations, the native
/// mixed-radix engine and the vendor delegate, satisfy the same contract
/// and are interchangeable behind this trait.
pub trait Fft3D {
    fn shape(&self) -> (usize, usize, usize);

    fn real_to_complex(&self) -> bool;

    /// Complex capacity both the input and output buffer must have.
    fn buffer_capacity(&self) -> usize {
        let (x, y, z) = self.shape();
        transform_capacity(x, y, z, self.real_to_complex())
    }

    /// Perform a transform. `input` is read and then used as scratch; its
    /// contents do not survive the call. `output` holds the result: the
    /// full complex grid, or for real-to-complex forward the non-redundant
    /// xsize*ysize*(zsize/2+1) half.
    fn exec_fft(&self, input: &GpuBuffer, output: &GpuBuffer, forward: bool)
        -> SpectralResult<()>;
}

/// Complex elements each transform buffer must hold for a given shape.
/// Real-mode buffers are sized for the half grid, which also covers the
/// packed intermediates and the tightly packed real data.
pub fn transform_capacity(
    xsize: usize,
    ysize: usize,
    zsize: usize,
    real_to_complex: bool,
) -> usize {
    if real_to_complex {
        xsize * ysize * (zsize / 2 + 1)
    } else {
        xsize * ysize * zsize
    }
}

/// Whether the native engine can service this shape on this device.
pub fn native_shape_supported(context: &GpuContext, config: &TransformConfig) -> bool {
    let max_len = context.max_local_fft_len();
    let legal = config
        .grid_resolution
        .iter()
        .all(|&n| is_legal_dimension(n) && n <= max_len);
    legal && (!config.real_to_complex || config.ysize() % 2 == 0)
}

/// Build the FFT backend for `config`: the native engine when the shape
/// allows it, the vendor delegate otherwise (or whichever the config
/// forces).
pub fn plan_fft3d(
    context: &Arc<GpuContext>,
    config: &TransformConfig,
) -> SpectralResult<Box<dyn Fft3D>> {
    let native = |context: &Arc<GpuContext>| -> SpectralResult<Box<dyn Fft3D>> {
        Ok(Box::new(GpuFft3D::new(
            context.clone(),
            config.xsize(),
            config.ysize(),
            config.zsize(),
            config.real_to_complex,
        )?))
    };
    let vendor = |context: &Arc<GpuContext>| -> SpectralResult<Box<dyn Fft3D>> {
        Ok(Box::new(RustFft3D::new(
            context.clone(),
            config.xsize(),
            config.ysize(),
            config.zsize(),
            config.real_to_complex,
        )?))
    };
    match config.backend {
        BackendKind::Native => native(context),
        BackendKind::Vendor => vendor(context),
        BackendKind::Auto => {
            if native_shape_supported(context, config) {
                native(context)
            } else {
                vendor(context)
            }
        }
    }
}
