// ─────────────────────────────────────────────────────────────────────
// SCPN Spectral Core — Native Transform Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! GPU-native mixed-radix 3D FFT engine.
//!
//! A transform is three passes of workgroup-local 1D FFTs, one per axis,
//! ping-ponging between the caller's two buffers so the final pass always
//! lands in the output buffer. Real-to-complex shapes add the packing
//! dispatches around the z pass. All kernels are specialized and compiled
//! at construction; `exec_fft` only records dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use spectral_gpu::{GpuBuffer, GpuContext};
use spectral_types::error::{SpectralError, SpectralResult};
use tracing::debug;

use crate::codegen::{self, LineAddressing};
use crate::dimension::is_legal_dimension;
use crate::packing::half_depth;
use crate::radix::StagePlan;
use crate::{transform_capacity, Fft3D};

/// Immutable transform shape, fixed at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    pub xsize: usize,
    pub ysize: usize,
    pub zsize: usize,
    pub real_to_complex: bool,
}

impl TransformPlan {
    /// Validate sizes for the native engine: nonzero, legal prime
    /// factorizations, and (real mode) an even ysize for row pairing.
    pub fn new(
        xsize: usize,
        ysize: usize,
        zsize: usize,
        real_to_complex: bool,
    ) -> SpectralResult<Self> {
        for (axis, n) in [("xsize", xsize), ("ysize", ysize), ("zsize", zsize)] {
            if n == 0 {
                return Err(SpectralError::Configuration(format!(
                    "{axis} must be > 0"
                )));
            }
            if !is_legal_dimension(n) {
                return Err(SpectralError::Configuration(format!(
                    "{axis} = {n} has prime factors outside {{2, 3, 5, 7}}; \
                     use find_legal_dimension or the vendor backend"
                )));
            }
        }
        if real_to_complex && ysize % 2 != 0 {
            return Err(SpectralError::Configuration(format!(
                "real-to-complex packing pairs z-rows along y; ysize must be even, got {ysize}"
            )));
        }
        Ok(Self {
            xsize,
            ysize,
            zsize,
            real_to_complex,
        })
    }

    /// z extent of the grid the x/y passes see.
    fn depth(&self) -> usize {
        if self.real_to_complex {
            half_depth(self.zsize)
        } else {
            self.zsize
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn len(self, plan: &TransformPlan) -> usize {
        match self {
            Axis::X => plan.xsize,
            Axis::Y => plan.ysize,
            Axis::Z => plan.zsize,
        }
    }
}

/// Cache key for one compiled 1D transform program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProgramKey {
    axis: Axis,
    forward: bool,
    real_mode: bool,
}

/// A compiled 1D transform pipeline plus its twiddle table.
struct KernelProgram {
    pipeline: wgpu::ComputePipeline,
    twiddles: GpuBuffer,
    dispatch: (u32, u32),
}

/// The four packing pipelines of a real-to-complex plan.
struct PackPrograms {
    pack_forward: wgpu::ComputePipeline,
    unpack_forward: wgpu::ComputePipeline,
    fold_backward: wgpu::ComputePipeline,
    unpack_backward: wgpu::ComputePipeline,
    dispatch: (u32, u32),
}

/// Native mixed-radix 3D FFT engine. Holds only immutable state after
/// construction; serializing concurrent `exec_fft` calls on one instance
/// is the caller's responsibility.
pub struct GpuFft3D {
    context: Arc<GpuContext>,
    plan: TransformPlan,
    transform_layout: wgpu::BindGroupLayout,
    pack_layout: wgpu::BindGroupLayout,
    programs: HashMap<ProgramKey, KernelProgram>,
    packing: Option<PackPrograms>,
}

impl GpuFft3D {
    /// Create an engine for transforms of one fixed shape.
    ///
    /// All shape checks happen here so no partially built engine exists:
    /// illegal sizes are `Configuration` errors, legal sizes beyond the
    /// device's workgroup-local capacity are `Unsupported` (route those to
    /// the vendor backend).
    pub fn new(
        context: Arc<GpuContext>,
        xsize: usize,
        ysize: usize,
        zsize: usize,
        real_to_complex: bool,
    ) -> SpectralResult<Self> {
        let plan = TransformPlan::new(xsize, ysize, zsize, real_to_complex)?;

        let max_len = context.max_local_fft_len();
        for (axis, len) in [("xsize", xsize), ("ysize", ysize), ("zsize", zsize)] {
            if len > max_len {
                return Err(SpectralError::Unsupported(format!(
                    "{axis} = {len} exceeds the device's {max_len}-point workgroup-local \
                     transform capacity; use the vendor backend for this shape"
                )));
            }
        }

        let device = context.device();
        let transform_layout = storage_layout(device, "fft-transform-layout", &[true, false, true]);
        let pack_layout = storage_layout(device, "fft-pack-layout", &[true, false]);

        let mut engine = Self {
            context,
            plan,
            transform_layout,
            pack_layout,
            programs: HashMap::new(),
            packing: None,
        };
        engine.build_programs()?;
        Ok(engine)
    }

    pub fn plan(&self) -> &TransformPlan {
        &self.plan
    }

    /// Build and cache every kernel variant this plan can dispatch.
    fn build_programs(&mut self) -> SpectralResult<()> {
        let real = self.plan.real_to_complex;
        for forward in [true, false] {
            for axis in [Axis::X, Axis::Y, Axis::Z] {
                let key = ProgramKey {
                    axis,
                    forward,
                    real_mode: real,
                };
                let program = self.build_transform(key)?;
                self.programs.insert(key, program);
            }
        }

        if real {
            let plan = &self.plan;
            let (x, y, z) = (plan.xsize, plan.ysize, plan.zsize);
            self.packing = Some(PackPrograms {
                pack_forward: self.build_pack(
                    "fft-pack-forward",
                    &codegen::pack_forward_shader(x, y, z),
                    "pack_forward",
                ),
                unpack_forward: self.build_pack(
                    "fft-unpack-forward",
                    &codegen::unpack_forward_shader(x, y, z),
                    "unpack_forward",
                ),
                fold_backward: self.build_pack(
                    "fft-fold-backward",
                    &codegen::fold_backward_shader(x, y, z),
                    "fold_backward",
                ),
                unpack_backward: self.build_pack(
                    "fft-unpack-backward",
                    &codegen::unpack_backward_shader(x, y, z),
                    "unpack_backward",
                ),
                dispatch: (x as u32, (y / 2) as u32),
            });
        }
        Ok(())
    }

    fn build_transform(&self, key: ProgramKey) -> SpectralResult<KernelProgram> {
        let len = key.axis.len(&self.plan);
        let stage_plan = StagePlan::new(len, key.forward)?;
        let addressing = self.addressing(key.axis);
        let label = format!(
            "fft-{:?}-{}-{}",
            key.axis,
            if key.forward { "forward" } else { "inverse" },
            if key.real_mode { "real" } else { "complex" }
        );
        debug!(
            %label,
            len,
            radices = ?stage_plan.stages.iter().map(|s| s.radix).collect::<Vec<_>>(),
            "compiling transform kernel"
        );

        let source = codegen::transform_shader(&stage_plan, &addressing);
        let pipeline = self.build_pipeline(&label, &source, "fft_line", &self.transform_layout);

        // A unit-length plan has an empty table; keep one slot so the
        // binding stays valid.
        let twiddles = self
            .context
            .create_complex_buffer(&label, stage_plan.twiddles.len().max(1));
        self.context
            .upload_complex(&twiddles, &stage_plan.twiddles)?;

        Ok(KernelProgram {
            pipeline,
            twiddles,
            dispatch: addressing.dispatch,
        })
    }

    fn build_pack(&self, label: &str, source: &str, entry: &str) -> wgpu::ComputePipeline {
        self.build_pipeline(label, source, entry, &self.pack_layout)
    }

    fn build_pipeline(
        &self,
        label: &str,
        source: &str,
        entry: &str,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::ComputePipeline {
        let device = self.context.device();
        let module = self.context.compile(label, source);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    /// Line layout for a transform pass along `axis` under this plan.
    fn addressing(&self, axis: Axis) -> LineAddressing {
        let plan = &self.plan;
        let (x, y, z) = (plan.xsize, plan.ysize, plan.zsize);
        let depth = plan.depth();
        match axis {
            Axis::Z if plan.real_to_complex => {
                let pairs = y / 2;
                LineAddressing {
                    label: "z packed rows".to_string(),
                    base_expr: format!("(group_id.x * {pairs}u + group_id.y) * {z}u"),
                    stride: 1,
                    dispatch: (x as u32, pairs as u32),
                }
            }
            Axis::Z => LineAddressing {
                label: "z lines".to_string(),
                base_expr: format!("(group_id.x * {y}u + group_id.y) * {z}u"),
                stride: 1,
                dispatch: (x as u32, y as u32),
            },
            Axis::Y => LineAddressing {
                label: "y lines".to_string(),
                base_expr: format!("group_id.x * {}u + group_id.y", y * depth),
                stride: depth,
                dispatch: (x as u32, depth as u32),
            },
            Axis::X => LineAddressing {
                label: "x lines".to_string(),
                base_expr: format!("group_id.x * {depth}u + group_id.y"),
                stride: y * depth,
                dispatch: (y as u32, depth as u32),
            },
        }
    }

    fn program(&self, axis: Axis, forward: bool) -> SpectralResult<&KernelProgram> {
        let key = ProgramKey {
            axis,
            forward,
            real_mode: self.plan.real_to_complex,
        };
        self.programs.get(&key).ok_or_else(|| {
            SpectralError::Gpu(format!("kernel program missing for {key:?}"))
        })
    }

    /// Record and submit the dispatch pipeline for one transform call.
    fn run(&self, input: &GpuBuffer, output: &GpuBuffer, forward: bool) -> SpectralResult<()> {
        if input.id() == output.id() {
            return Err(SpectralError::InvalidArgument(
                "in-place transforms are not supported; input and output buffers must be distinct"
                    .to_string(),
            ));
        }
        let plan = &self.plan;
        let required = transform_capacity(plan.xsize, plan.ysize, plan.zsize, plan.real_to_complex);
        for (name, buffer) in [("input", input), ("output", output)] {
            if buffer.capacity_complex() < required {
                return Err(SpectralError::InvalidArgument(format!(
                    "{name} buffer holds {} complex values, transform requires {required}",
                    buffer.capacity_complex()
                )));
            }
        }

        struct Step<'a> {
            pipeline: &'a wgpu::ComputePipeline,
            layout: &'a wgpu::BindGroupLayout,
            twiddles: Option<&'a GpuBuffer>,
            dispatch: (u32, u32),
        }
        let mut steps: Vec<Step> = Vec::with_capacity(5);

        // Forward order is x, y, z for complex grids; real grids must
        // transform the packed z axis first and expand it last.
        let axes: Vec<Axis> = if plan.real_to_complex {
            if forward {
                vec![Axis::Z, Axis::X, Axis::Y]
            } else {
                vec![Axis::Y, Axis::X, Axis::Z]
            }
        } else if forward {
            vec![Axis::X, Axis::Y, Axis::Z]
        } else {
            vec![Axis::Z, Axis::Y, Axis::X]
        };

        for axis in axes {
            if plan.real_to_complex && axis == Axis::Z {
                let packing = self.packing.as_ref().ok_or_else(|| {
                    SpectralError::Gpu("packing programs missing for real plan".to_string())
                })?;
                let z_program = self.program(Axis::Z, forward)?;
                if forward {
                    steps.push(Step {
                        pipeline: &packing.pack_forward,
                        layout: &self.pack_layout,
                        twiddles: None,
                        dispatch: packing.dispatch,
                    });
                    steps.push(Step {
                        pipeline: &z_program.pipeline,
                        layout: &self.transform_layout,
                        twiddles: Some(&z_program.twiddles),
                        dispatch: z_program.dispatch,
                    });
                    steps.push(Step {
                        pipeline: &packing.unpack_forward,
                        layout: &self.pack_layout,
                        twiddles: None,
                        dispatch: packing.dispatch,
                    });
                } else {
                    steps.push(Step {
                        pipeline: &packing.fold_backward,
                        layout: &self.pack_layout,
                        twiddles: None,
                        dispatch: packing.dispatch,
                    });
                    steps.push(Step {
                        pipeline: &z_program.pipeline,
                        layout: &self.transform_layout,
                        twiddles: Some(&z_program.twiddles),
                        dispatch: z_program.dispatch,
                    });
                    steps.push(Step {
                        pipeline: &packing.unpack_backward,
                        layout: &self.pack_layout,
                        twiddles: None,
                        dispatch: packing.dispatch,
                    });
                }
            } else {
                let program = self.program(axis, forward)?;
                steps.push(Step {
                    pipeline: &program.pipeline,
                    layout: &self.transform_layout,
                    twiddles: Some(&program.twiddles),
                    dispatch: program.dispatch,
                });
            }
        }
        // Strict two-buffer alternation: an odd step count lands the final
        // write in the caller's output buffer.
        debug_assert!(steps.len() % 2 == 1);

        let device = self.context.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("fft-exec"),
        });
        for (index, step) in steps.iter().enumerate() {
            let (src, dst) = if index % 2 == 0 {
                (input, output)
            } else {
                (output, input)
            };
            let mut entries = vec![
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.raw().as_entire_binding(),
                },
            ];
            if let Some(twiddles) = step.twiddles {
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: twiddles.raw().as_entire_binding(),
                });
            }
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("fft-step"),
                layout: step.layout,
                entries: &entries,
            });
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("fft-step"),
                timestamp_writes: None,
            });
            pass.set_pipeline(step.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(step.dispatch.0, step.dispatch.1, 1);
        }
        self.context.queue().submit(Some(encoder.finish()));
        Ok(())
    }
}

impl Fft3D for GpuFft3D {
    fn shape(&self) -> (usize, usize, usize) {
        (self.plan.xsize, self.plan.ysize, self.plan.zsize)
    }

    fn real_to_complex(&self) -> bool {
        self.plan.real_to_complex
    }

    fn exec_fft(&self, input: &GpuBuffer, output: &GpuBuffer, forward: bool) -> SpectralResult<()> {
        self.run(input, output, forward)
    }
}

/// Bind group layout of compute-storage buffers; `read_only` per binding.
fn storage_layout(
    device: &wgpu::Device,
    label: &str,
    read_only: &[bool],
) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = read_only
        .iter()
        .enumerate()
        .map(|(binding, &read_only)| wgpu::BindGroupLayoutEntry {
            binding: binding as u32,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral_gpu::gpu_available;

    #[test]
    fn test_plan_rejects_illegal_sizes() {
        assert!(TransformPlan::new(11, 8, 8, false).is_err());
        assert!(TransformPlan::new(8, 0, 8, false).is_err());
        assert!(TransformPlan::new(8, 8, 26, false).is_err());
    }

    #[test]
    fn test_plan_rejects_odd_y_in_real_mode() {
        assert!(TransformPlan::new(8, 9, 8, true).is_err());
        assert!(TransformPlan::new(8, 9, 8, false).is_ok());
    }

    #[test]
    fn test_plan_accepts_odd_z_in_real_mode() {
        let plan = TransformPlan::new(8, 6, 7, true).expect("odd zsize is legal");
        assert_eq!(plan.depth(), 4);
    }

    #[test]
    fn test_construction_rejects_illegal_size() {
        if !gpu_available() {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }
        let context = Arc::new(GpuContext::new().expect("adapter available"));
        let result = GpuFft3D::new(context, 8, 11, 8, false);
        assert!(matches!(result, Err(SpectralError::Configuration(_))));
    }

    #[test]
    fn test_construction_rejects_over_capacity_axis() {
        if !gpu_available() {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }
        let context = Arc::new(GpuContext::new().expect("adapter available"));
        let too_long = crate::dimension::find_legal_dimension(context.max_local_fft_len() + 1);
        let result = GpuFft3D::new(context, too_long, 4, 4, false);
        assert!(matches!(result, Err(SpectralError::Unsupported(_))));
    }

    #[test]
    fn test_exec_rejects_aliased_buffers() {
        if !gpu_available() {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }
        let context = Arc::new(GpuContext::new().expect("adapter available"));
        let engine = GpuFft3D::new(context.clone(), 4, 4, 4, false).expect("legal shape");
        let buffer = context.create_complex_buffer("aliased", 64);
        let result = engine.exec_fft(&buffer, &buffer, true);
        assert!(matches!(result, Err(SpectralError::InvalidArgument(_))));
    }

    #[test]
    fn test_exec_rejects_undersized_buffers() {
        if !gpu_available() {
            eprintln!("Skipping GPU test: no adapter available");
            return;
        }
        let context = Arc::new(GpuContext::new().expect("adapter available"));
        let engine = GpuFft3D::new(context.clone(), 4, 4, 4, false).expect("legal shape");
        let input = context.create_complex_buffer("in", 64);
        let output = context.create_complex_buffer("out", 63);
        let result = engine.exec_fft(&input, &output, true);
        assert!(matches!(result, Err(SpectralError::InvalidArgument(_))));
    }
}
