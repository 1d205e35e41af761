//! Compute context for the spectral engine, backed by wgpu.
//!
//! Owns the device/queue pair and provides the three services the FFT
//! engine depends on: storage-buffer allocation, WGSL compilation from
//! source, and ordered dispatch on a single command stream. The engine
//! never touches wgpu internals beyond this surface.

use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::Complex32;
use spectral_types::error::{SpectralError, SpectralResult};
use tracing::debug;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Device-resident storage buffer holding complex (or tightly packed real)
/// grid data. The id is process-unique and used for alias detection.
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
    capacity_complex: usize,
    id: u64,
}

impl GpuBuffer {
    /// Capacity in complex (vec2<f32>) elements.
    pub fn capacity_complex(&self) -> usize {
        self.capacity_complex
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Handle to the GPU device and its ordered command queue.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    limits: wgpu::Limits,
}

impl GpuContext {
    /// Acquire a high-performance adapter and create a device/queue pair.
    ///
    /// Returns `Err` if no suitable GPU adapter is found.
    pub fn new() -> SpectralResult<Self> {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| SpectralError::Gpu("No suitable GPU adapter found".to_string()))?;

        let info = adapter.get_info();
        debug!(
            adapter = %info.name,
            backend = ?info.backend,
            "acquired GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("spectral-gpu"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| SpectralError::Gpu(format!("GPU device request failed: {e}")))?;

        let limits = device.limits();
        Ok(Self {
            device,
            queue,
            limits,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Longest 1D transform the device can hold in one workgroup: one
    /// invocation per data point and 16 bytes of workgroup storage per
    /// point (two vec2<f32> ping-pong slots).
    pub fn max_local_fft_len(&self) -> usize {
        let by_invocations = self.limits.max_compute_invocations_per_workgroup as usize;
        let by_width = self.limits.max_compute_workgroup_size_x as usize;
        let by_storage = self.limits.max_compute_workgroup_storage_size as usize / 16;
        by_invocations.min(by_width).min(by_storage)
    }

    /// Allocate a storage buffer sized for `capacity_complex` complex values.
    pub fn create_complex_buffer(&self, label: &str, capacity_complex: usize) -> GpuBuffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity_complex * 8) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        GpuBuffer {
            buffer,
            capacity_complex,
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Compile a WGSL compute program from source.
    pub fn compile(&self, label: &str, source: &str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
    }

    pub fn upload_complex(&self, buffer: &GpuBuffer, data: &[Complex32]) -> SpectralResult<()> {
        if data.len() > buffer.capacity_complex {
            return Err(SpectralError::InvalidArgument(format!(
                "upload of {} complex values into buffer of capacity {}",
                data.len(),
                buffer.capacity_complex
            )));
        }
        self.queue
            .write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(data));
        Ok(())
    }

    pub fn upload_real(&self, buffer: &GpuBuffer, data: &[f32]) -> SpectralResult<()> {
        if data.len() > buffer.capacity_complex * 2 {
            return Err(SpectralError::InvalidArgument(format!(
                "upload of {} real values into buffer of capacity {} complex",
                data.len(),
                buffer.capacity_complex
            )));
        }
        self.queue
            .write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(data));
        Ok(())
    }

    pub fn download_complex(&self, buffer: &GpuBuffer, len: usize) -> SpectralResult<Vec<Complex32>> {
        let bytes = self.download_bytes(buffer, len * 8)?;
        Ok(bytemuck::cast_slice(&bytes).to_vec())
    }

    pub fn download_real(&self, buffer: &GpuBuffer, len: usize) -> SpectralResult<Vec<f32>> {
        let bytes = self.download_bytes(buffer, len * 4)?;
        Ok(bytemuck::cast_slice(&bytes).to_vec())
    }

    fn download_bytes(&self, buffer: &GpuBuffer, size: usize) -> SpectralResult<Vec<u8>> {
        if size > buffer.capacity_complex * 8 {
            return Err(SpectralError::InvalidArgument(format!(
                "download of {size} bytes from buffer of {} bytes",
                buffer.capacity_complex * 8
            )));
        }
        // wgpu requires copy sizes in multiples of 4; complex/real elements
        // always satisfy this.
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("spectral-staging"),
            size: size as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("spectral-download"),
            });
        encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &staging, 0, size as u64);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| SpectralError::Gpu(format!("GPU download channel error: {e}")))?
            .map_err(|e| SpectralError::Gpu(format!("GPU buffer map failed: {e}")))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }
}

/// Check if a GPU adapter is available without creating a full context.
pub fn gpu_available() -> bool {
    let instance = wgpu::Instance::default();
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Get GPU adapter info string.
pub fn gpu_info() -> Option<String> {
    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;
    let info = adapter.get_info();
    Some(format!(
        "{} ({:?}, {:?})",
        info.name, info.backend, info.device_type
    ))
}
