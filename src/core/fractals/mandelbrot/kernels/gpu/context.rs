use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::core::actions::cancellation::CancelToken;
use crate::core::data::capabilities::GpuInfo;
use crate::core::data::run_parameters::Precision;
use crate::core::fractals::mandelbrot::errors::GpuError;
use crate::core::fractals::mandelbrot::kernels::gpu::shader::{
    GridUniforms, UNIFORM_BUFFER_SIZE, shader_source,
};
use crate::core::util::calculate_gpu_bands::{
    BLOCK_HEIGHT, BLOCK_WIDTH, BatchBudget, calculate_band_rows, row_bands,
};
use crate::core::util::pixel_to_complex_coords::ViewportMapping;

const CELL_BYTES: u64 = std::mem::size_of::<u32>() as u64;

/// Device-resident result buffers, sized for one pixel count.
struct DeviceCells {
    pixel_count: usize,
    storage: wgpu::Buffer,
    staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl DeviceCells {
    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        pixel_count: usize,
    ) -> Result<Self, GpuError> {
        let bytes = pixel_count as u64 * CELL_BYTES;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let storage = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape-grid cells"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape-grid staging"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        if let Some(error) = validation.or(out_of_memory) {
            return Err(GpuError::Allocation {
                bytes,
                message: error.to_string(),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("escape-grid bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: storage.as_entire_binding(),
                },
            ],
        });

        debug!(pixel_count, bytes, "allocated device cell buffers");

        Ok(Self {
            pixel_count,
            storage,
            staging,
            bind_group,
        })
    }
}

/// Host side of the GPU backend: one device, a pipeline per supported
/// precision and result buffers kept alive between runs of the same size.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: GpuInfo,
    bind_group_layout: wgpu::BindGroupLayout,
    single_pipeline: wgpu::ComputePipeline,
    double_pipeline: Option<wgpu::ComputePipeline>,
    uniform_buffer: wgpu::Buffer,
    cells: Option<DeviceCells>,
    budget: BatchBudget,
    max_workgroups_per_dimension: u32,
    max_binding_bytes: u64,
}

impl GpuContext {
    /// Opens the default high-performance adapter and builds both pipelines.
    pub fn probe(budget: BatchBudget) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        let adapter_f64 = adapter.features().contains(wgpu::Features::SHADER_F64);
        let required_features = if adapter_f64 {
            wgpu::Features::SHADER_F64
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("escape-grid device"),
                required_features,
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            warn!(%error, "uncaptured GPU error");
        }));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("escape-grid bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("escape-grid pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let single_pipeline = create_pipeline(&device, &pipeline_layout, Precision::Single)?;

        let double_pipeline = if adapter_f64 {
            match create_pipeline(&device, &pipeline_layout, Precision::Double) {
                Ok(pipeline) => Some(pipeline),
                Err(err) => {
                    warn!(%err, "double precision GPU kernel unavailable");
                    None
                }
            }
        } else {
            None
        };

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape-grid uniforms"),
            size: UNIFORM_BUFFER_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let limits = device.limits();
        let info = GpuInfo {
            name: adapter_info.name,
            driver: format!("{:?} {}", adapter_info.backend, adapter_info.driver),
            supports_f64: double_pipeline.is_some(),
        };

        info!(
            adapter = %info.name,
            driver = %info.driver,
            supports_f64 = info.supports_f64,
            "GPU adapter ready"
        );

        Ok(Self {
            device,
            queue,
            info,
            bind_group_layout,
            single_pipeline,
            double_pipeline,
            uniform_buffer,
            cells: None,
            budget,
            max_workgroups_per_dimension: limits.max_compute_workgroups_per_dimension,
            max_binding_bytes: u64::from(limits.max_storage_buffer_binding_size),
        })
    }

    #[must_use]
    pub fn info(&self) -> &GpuInfo {
        &self.info
    }

    /// Computes `cells` (row-major, `width * height`) on the device in bands
    /// sized by the batch budget, checking `cancel` between bands. Only rows
    /// of completed bands are copied back; the rest of `cells` is untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn compute<C: CancelToken>(
        &mut self,
        cells: &mut [u32],
        width: usize,
        height: usize,
        mapping: &ViewportMapping,
        max_iterations: u32,
        precision: Precision,
        cancel: &C,
    ) -> Result<(), GpuError> {
        let pipeline = match precision {
            Precision::Single => &self.single_pipeline,
            Precision::Double => self
                .double_pipeline
                .as_ref()
                .ok_or(GpuError::DoublePrecisionUnsupported)?,
        };

        let pixel_count = cells.len();
        if pixel_count == 0 {
            return Ok(());
        }

        let too_large = GpuError::GridTooLarge { width, height };
        let (Ok(width_u32), Ok(height_u32), Ok(_)) = (
            u32::try_from(width),
            u32::try_from(height),
            u32::try_from(pixel_count),
        ) else {
            return Err(too_large);
        };

        let workgroups_x = width_u32.div_ceil(BLOCK_WIDTH as u32);
        if workgroups_x > self.max_workgroups_per_dimension {
            return Err(too_large);
        }

        let bytes = pixel_count as u64 * CELL_BYTES;
        if bytes > self.max_binding_bytes {
            return Err(GpuError::Allocation {
                bytes,
                message: format!("exceeds the {} byte storage binding limit", self.max_binding_bytes),
            });
        }

        let resident = match self.cells.take() {
            Some(resident) if resident.pixel_count == pixel_count => resident,
            _ => DeviceCells::allocate(
                &self.device,
                &self.bind_group_layout,
                &self.uniform_buffer,
                pixel_count,
            )?,
        };
        let resident = self.cells.insert(resident);

        let band_rows = calculate_band_rows(width, self.budget, precision, max_iterations)
            .min(self.max_workgroups_per_dimension as usize * BLOCK_HEIGHT);
        let mut completed_rows = 0;

        for band in row_bands(height, band_rows) {
            if cancel.is_cancelled() {
                debug!(completed_rows, "GPU run cancelled between bands");
                break;
            }

            let uniforms = GridUniforms {
                width: width_u32,
                height: height_u32,
                row_offset: band.start as u32,
                max_iterations,
                precision,
                mapping: *mapping,
            };
            self.queue.write_buffer(&self.uniform_buffer, 0, &uniforms.to_bytes());

            let workgroups_y = band.len().div_ceil(BLOCK_HEIGHT) as u32;
            debug!(rows = ?band, workgroups_x, workgroups_y, "dispatching GPU band");

            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("escape-grid band"),
            });

            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("escape-grid band pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &resident.bind_group, &[]);
                pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
            }

            self.queue.submit(std::iter::once(encoder.finish()));
            self.device.poll(wgpu::Maintain::Wait);

            completed_rows = band.end;
        }

        read_back(
            &self.device,
            &self.queue,
            resident,
            &mut cells[..completed_rows * width],
        )
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    precision: Precision,
) -> Result<wgpu::ComputePipeline, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("escape-grid kernel"),
        source: wgpu::ShaderSource::Wgsl(shader_source(precision).into()),
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("escape-grid pipeline"),
        layout: Some(layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(GpuError::ShaderCompilation {
            precision,
            message: error.to_string(),
        }),
        None => Ok(pipeline),
    }
}

/// Copies the leading `host.len()` cells of the device buffer into `host`.
fn read_back(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    resident: &DeviceCells,
    host: &mut [u32],
) -> Result<(), GpuError> {
    if host.is_empty() {
        return Ok(());
    }

    let bytes = host.len() as u64 * CELL_BYTES;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("escape-grid read back"),
    });
    encoder.copy_buffer_to_buffer(&resident.storage, 0, &resident.staging, 0, bytes);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = resident.staging.slice(..bytes);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device.poll(wgpu::Maintain::Wait);

    receiver
        .recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    {
        let data = slice.get_mapped_range();
        bytemuck::cast_slice_mut::<u32, u8>(host).copy_from_slice(&data);
    }

    resident.staging.unmap();

    Ok(())
}
