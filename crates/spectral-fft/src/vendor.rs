//! Vendor-library FFT backend.
//!
//! Delegates the whole 3D transform to rustfft on the host: download the
//! device buffer, run one pass per axis, upload the result. Accepts any
//! axis size, including lengths the native engine rejects, so it is the
//! fallback for shapes with unsupported prime factors or axes beyond the
//! workgroup-local capacity. Convention matches the native engine:
//! unnormalized in both directions.

use std::sync::Arc;

use ndarray::{s, Array3, Axis};
use num_complex::Complex32;
use rustfft::FftPlanner;
use spectral_gpu::{GpuBuffer, GpuContext};
use spectral_types::error::{SpectralError, SpectralResult};

use crate::packing::half_depth;
use crate::{transform_capacity, Fft3D};

/// 3D FFT backend delegating to rustfft.
pub struct RustFft3D {
    context: Arc<GpuContext>,
    xsize: usize,
    ysize: usize,
    zsize: usize,
    real_to_complex: bool,
}

impl RustFft3D {
    pub fn new(
        context: Arc<GpuContext>,
        xsize: usize,
        ysize: usize,
        zsize: usize,
        real_to_complex: bool,
    ) -> SpectralResult<Self> {
        for (axis, n) in [("xsize", xsize), ("ysize", ysize), ("zsize", zsize)] {
            if n == 0 {
                return Err(SpectralError::Configuration(format!("{axis} must be > 0")));
            }
        }
        Ok(Self {
            context,
            xsize,
            ysize,
            zsize,
            real_to_complex,
        })
    }

    fn check_buffers(&self, input: &GpuBuffer, output: &GpuBuffer) -> SpectralResult<()> {
        if input.id() == output.id() {
            return Err(SpectralError::InvalidArgument(
                "in-place transforms are not supported; input and output buffers must be distinct"
                    .to_string(),
            ));
        }
        let required =
            transform_capacity(self.xsize, self.ysize, self.zsize, self.real_to_complex);
        for (name, buffer) in [("input", input), ("output", output)] {
            if buffer.capacity_complex() < required {
                return Err(SpectralError::InvalidArgument(format!(
                    "{name} buffer holds {} complex values, transform requires {required}",
                    buffer.capacity_complex()
                )));
            }
        }
        Ok(())
    }
}

impl Fft3D for RustFft3D {
    fn shape(&self) -> (usize, usize, usize) {
        (self.xsize, self.ysize, self.zsize)
    }

    fn real_to_complex(&self) -> bool {
        self.real_to_complex
    }

    fn exec_fft(&self, input: &GpuBuffer, output: &GpuBuffer, forward: bool) -> SpectralResult<()> {
        self.check_buffers(input, output)?;
        let (x, y, z) = (self.xsize, self.ysize, self.zsize);
        let zh = half_depth(z);

        if !self.real_to_complex {
            let data = self.context.download_complex(input, x * y * z)?;
            let mut grid = Array3::from_shape_vec((x, y, z), data)
                .expect("downloaded grid must match the plan shape");
            transform_axes(&mut grid, forward);
            let flat: Vec<Complex32> = grid.iter().copied().collect();
            self.context.upload_complex(output, &flat)
        } else if forward {
            let reals = self.context.download_real(input, x * y * z)?;
            let mut grid = Array3::from_shape_vec(
                (x, y, z),
                reals.iter().map(|&r| Complex32::new(r, 0.0)).collect(),
            )
            .expect("downloaded grid must match the plan shape");
            transform_axes(&mut grid, true);
            // Keep only the non-redundant z half, matching the native
            // engine's output layout.
            let half: Vec<Complex32> = grid.slice(s![.., .., ..zh]).iter().copied().collect();
            self.context.upload_complex(output, &half)
        } else {
            let half_flat = self.context.download_complex(input, x * y * zh)?;
            let half = Array3::from_shape_vec((x, y, zh), half_flat)
                .expect("downloaded grid must match the plan shape");
            let mut grid = expand_half_grid(&half, z);
            transform_axes(&mut grid, false);
            let reals: Vec<f32> = grid.iter().map(|c| c.re).collect();
            self.context.upload_real(output, &reals)
        }
    }
}

/// Run one unnormalized rustfft pass along every axis of the grid.
fn transform_axes(grid: &mut Array3<Complex32>, forward: bool) {
    let mut planner = FftPlanner::new();
    for axis in 0..3 {
        let len = grid.shape()[axis];
        let fft = if forward {
            planner.plan_fft_forward(len)
        } else {
            planner.plan_fft_inverse(len)
        };
        let mut line = vec![Complex32::new(0.0, 0.0); len];
        for mut lane in grid.lanes_mut(Axis(axis)) {
            for (slot, value) in line.iter_mut().zip(lane.iter()) {
                *slot = *value;
            }
            fft.process(&mut line);
            for (value, slot) in lane.iter_mut().zip(line.iter()) {
                *value = *slot;
            }
        }
    }
}

/// Rebuild the full complex grid from the stored non-redundant z half
/// using the 3D Hermitian symmetry of real-input spectra:
/// F(x, y, k) = conj(F((X-x) mod X, (Y-y) mod Y, Z-k)).
fn expand_half_grid(half: &Array3<Complex32>, zsize: usize) -> Array3<Complex32> {
    let (x, y, zh) = half.dim();
    let mut full = Array3::from_elem((x, y, zsize), Complex32::new(0.0, 0.0));
    for i in 0..x {
        for j in 0..y {
            for k in 0..zsize {
                full[[i, j, k]] = if k < zh {
                    half[[i, j, k]]
                } else {
                    half[[(x - i) % x, (y - j) % y, zsize - k]].conj()
                };
            }
        }
    }
    full
}
