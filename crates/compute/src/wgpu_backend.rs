//! GPU implementation of [`ComputeBackend`] built on [`wgpu`].
//!
//! The raymarch kernel is compiled once at start-up; blit pipelines are
//! built lazily per destination format. Work is submitted to the device
//! queue and never waited on except by [`ComputeBackend::read_image`].
//! Initialization fails if no adapter with compute support is found.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::layout::{self, names, FrameBlock};
use crate::{
    reflect, BufferHandle, BufferView, ComputeBackend, ComputeError, ImageDesc, ImageFormat,
    ImageHandle, Kernel, KernelParams, ResourceStats,
};

const BLIT_SHADER: &str = include_str!("../../../shaders/blit.wgsl");

struct GpuBuffer {
    buffer: wgpu::Buffer,
}

struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: ImageDesc,
}

#[derive(Default)]
struct Resources {
    next_id: u64,
    buffers: HashMap<u64, GpuBuffer>,
    images: HashMap<u64, GpuImage>,
    stats: ResourceStats,
}

impl Resources {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn image(&self, handle: ImageHandle) -> Result<&GpuImage, ComputeError> {
        self.images.get(&handle.0).ok_or(ComputeError::UnknownImage(handle))
    }
}

/// GPU-backed implementation of [`ComputeBackend`].
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    raymarch_layout: wgpu::BindGroupLayout,
    raymarch_pipeline: wgpu::ComputePipeline,
    blit_layout: wgpu::BindGroupLayout,
    blit_pipeline_layout: wgpu::PipelineLayout,
    blit_shader: wgpu::ShaderModule,
    // Mutex for interior mutability with &self in blit
    blit_pipelines: Mutex<HashMap<wgpu::TextureFormat, Arc<wgpu::RenderPipeline>>>,
    resources: Mutex<Resources>,
}

impl WgpuBackend {
    /// Opens the adapter selected by `WGPU_BACKEND` / `WGPU_ADAPTER_NAME`,
    /// or the system default.
    pub fn try_new() -> Result<Self, ComputeError> {
        let backends = wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all);
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = pollster::block_on(wgpu::util::initialize_adapter_from_env_or_default(&instance, None))
            .ok_or(ComputeError::BackendUnavailable)?;

        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            tracing::warn!("adapter {:?} lacks compute shader support", adapter.get_info().name);
            return Err(ComputeError::BackendUnavailable);
        }
        let info = adapter.get_info();
        tracing::info!("wgpu adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("raymarch-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|_| ComputeError::BackendUnavailable)?;

        let raymarch_entries = [
            wgpu::BindGroupLayoutEntry {
                binding: layout::TEXTURE_SOURCE,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: layout::STORAGE_DEST,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba32Float,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: layout::STORAGE_SHAPES,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: layout::UNIFORM_FRAME,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<FrameBlock>() as u64),
                },
                count: None,
            },
        ];
        let kernel = Kernel::Raymarch;
        debug_assert_eq!(raymarch_entries.len() as u32, kernel.binding_count());
        let raymarch_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raymarch bind group layout"),
            entries: &raymarch_entries,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.label()),
            source: wgpu::ShaderSource::Wgsl(kernel.source().into()),
        });
        let raymarch_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raymarch pipeline layout"),
            bind_group_layouts: &[&raymarch_layout],
            push_constant_ranges: &[],
        });
        let raymarch_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("raymarch pipeline"),
            layout: Some(&raymarch_pipeline_layout),
            module: &shader,
            entry_point: kernel.entry_point(),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit pipeline layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            raymarch_layout,
            raymarch_pipeline,
            blit_layout,
            blit_pipeline_layout,
            blit_shader,
            blit_pipelines: Mutex::new(HashMap::new()),
            resources: Mutex::new(Resources::default()),
        })
    }

    fn blit_pipeline(&self, format: wgpu::TextureFormat) -> Arc<wgpu::RenderPipeline> {
        let mut cache = self.blit_pipelines.lock();
        cache
            .entry(format)
            .or_insert_with(|| {
                tracing::debug!("building blit pipeline for {format:?}");
                Arc::new(self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("blit pipeline"),
                    layout: Some(&self.blit_pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &self.blit_shader,
                        entry_point: "vs_main",
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        buffers: &[],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &self.blit_shader,
                        entry_point: "fs_main",
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                }))
            })
            .clone()
    }
}

const fn texture_format(format: ImageFormat) -> wgpu::TextureFormat {
    match format {
        ImageFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        ImageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

const fn extent(desc: &ImageDesc) -> wgpu::Extent3d {
    wgpu::Extent3d { width: desc.width, height: desc.height, depth_or_array_layers: 1 }
}

fn copy_view(texture: &wgpu::Texture) -> wgpu::ImageCopyTexture<'_> {
    wgpu::ImageCopyTexture {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    }
}

impl ComputeBackend for WgpuBackend {
    fn kernel_thread_group_size(&self, kernel: &Kernel) -> Result<[u32; 3], ComputeError> {
        reflect::workgroup_size(kernel)
    }

    fn create_buffer(&self, label: &str, view: &BufferView<'_>) -> Result<BufferHandle, ComputeError> {
        view.validate()?;
        // wgpu rejects zero-sized bindings; the kernel clamps to shape_count anyway
        let padding;
        let contents = if view.element_count() == 0 {
            padding = vec![0u8; view.element_size_in_bytes];
            &padding[..]
        } else {
            view.data
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let mut resources = self.resources.lock();
        let id = resources.allocate_id();
        resources.buffers.insert(id, GpuBuffer { buffer });
        resources.stats.buffers_allocated += 1;
        resources.stats.bytes_uploaded += view.data.len() as u64;
        tracing::trace!("buffer `{label}` #{id}: {} elements", view.element_count());
        Ok(BufferHandle(id))
    }

    fn release_buffer(&self, buffer: BufferHandle) {
        let mut resources = self.resources.lock();
        if let Some(released) = resources.buffers.remove(&buffer.0) {
            released.buffer.destroy();
            resources.stats.buffers_released += 1;
        } else {
            tracing::warn!("release of unknown buffer {buffer:?}");
        }
    }

    fn create_image(&self, label: &str, desc: ImageDesc) -> Result<ImageHandle, ComputeError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(ComputeError::Allocation(format!("image `{label}` has zero area")));
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(ComputeError::Allocation(format!(
                "image `{label}` is {}x{}, device limit is {max}",
                desc.width, desc.height
            )));
        }

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::RENDER_ATTACHMENT;
        if desc.random_write {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(&desc),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut resources = self.resources.lock();
        let id = resources.allocate_id();
        resources.images.insert(id, GpuImage { texture, view, desc });
        resources.stats.images_allocated += 1;
        tracing::debug!("image `{label}` #{id}: {}x{} {:?}", desc.width, desc.height, desc.format);
        Ok(ImageHandle(id))
    }

    fn write_image(&self, image: ImageHandle, pixels: &[[f32; 4]]) -> Result<(), ComputeError> {
        let resources = self.resources.lock();
        let target = resources.image(image)?;
        let desc = target.desc;
        if pixels.len() != desc.pixel_count() {
            return Err(ComputeError::ShapeMismatch("pixel count does not match image size"));
        }

        let mut bytes = Vec::with_capacity(pixels.len() * desc.format.bytes_per_pixel() as usize);
        for pixel in pixels {
            desc.format.encode_into(*pixel, &mut bytes);
        }
        self.queue.write_texture(
            copy_view(&target.texture),
            &bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * desc.format.bytes_per_pixel()),
                rows_per_image: Some(desc.height),
            },
            extent(&desc),
        );
        Ok(())
    }

    fn read_image(&self, image: ImageHandle) -> Result<Vec<[f32; 4]>, ComputeError> {
        let (desc, staging, padded_row) = {
            let resources = self.resources.lock();
            let source = resources.image(image)?;
            let desc = source.desc;
            let bpp = desc.format.bytes_per_pixel();
            let padded_row = (desc.width * bpp).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
                * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

            let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("image readback"),
                size: u64::from(padded_row) * u64::from(desc.height),
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback") });
            encoder.copy_texture_to_buffer(
                copy_view(&source.texture),
                wgpu::ImageCopyBuffer {
                    buffer: &staging,
                    layout: wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row),
                        rows_per_image: Some(desc.height),
                    },
                },
                extent(&desc),
            );
            self.queue.submit(Some(encoder.finish()));
            (desc, staging, padded_row)
        };

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // receiver outlives the poll below
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| ComputeError::Readback)?.map_err(|_| ComputeError::Readback)?;

        let bpp = desc.format.bytes_per_pixel() as usize;
        let row_bytes = desc.width as usize * bpp;
        let mapped = slice.get_mapped_range();
        let pixels = mapped
            .chunks_exact(padded_row as usize)
            .flat_map(|row| row[..row_bytes].chunks_exact(bpp).map(|px| desc.format.decode(px)))
            .collect();
        drop(mapped);
        staging.unmap();
        Ok(pixels)
    }

    fn release_image(&self, image: ImageHandle) {
        let mut resources = self.resources.lock();
        if let Some(released) = resources.images.remove(&image.0) {
            released.texture.destroy();
            resources.stats.images_released += 1;
        } else {
            tracing::warn!("release of unknown image {image:?}");
        }
    }

    fn image_desc(&self, image: ImageHandle) -> Result<ImageDesc, ComputeError> {
        Ok(self.resources.lock().image(image)?.desc)
    }

    fn dispatch(&self, kernel: &Kernel, params: &KernelParams, groups: [u32; 3]) -> Result<(), ComputeError> {
        let pipeline = match kernel {
            Kernel::Raymarch => &self.raymarch_pipeline,
        };
        let frame = FrameBlock::from_params(params)?;
        let source = params.image(names::SOURCE)?;
        let destination = params.image(names::DESTINATION)?;
        let shapes = params.buffer(names::SHAPES)?;

        let mut resources = self.resources.lock();
        let src = resources.image(source)?;
        let dst = resources.image(destination)?;
        if !dst.desc.random_write {
            return Err(ComputeError::NotWritable(destination));
        }
        if dst.desc.format != ImageFormat::Rgba32Float {
            return Err(ComputeError::FormatMismatch { expected: ImageFormat::Rgba32Float, actual: dst.desc.format });
        }
        if src.desc.size() != dst.desc.size() {
            return Err(ComputeError::ImageSizeMismatch { expected: dst.desc.size(), actual: src.desc.size() });
        }
        let shape_buffer = &resources.buffers.get(&shapes.0).ok_or(ComputeError::UnknownBuffer(shapes))?.buffer;

        let uniforms = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame uniforms"),
            contents: bytemuck::bytes_of(&frame),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raymarch bind group"),
            layout: &self.raymarch_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: layout::TEXTURE_SOURCE,
                    resource: wgpu::BindingResource::TextureView(&src.view),
                },
                wgpu::BindGroupEntry {
                    binding: layout::STORAGE_DEST,
                    resource: wgpu::BindingResource::TextureView(&dst.view),
                },
                wgpu::BindGroupEntry { binding: layout::STORAGE_SHAPES, resource: shape_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: layout::UNIFORM_FRAME, resource: uniforms.as_entire_binding() },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("raymarch") });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("raymarch pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        self.queue.submit(Some(encoder.finish()));

        resources.stats.dispatches += 1;
        tracing::trace!("raymarch dispatched, groups {groups:?}");
        Ok(())
    }

    fn blit(&self, source: ImageHandle, destination: ImageHandle) -> Result<(), ComputeError> {
        if source == destination {
            return Err(ComputeError::SameImage(source));
        }
        let mut resources = self.resources.lock();
        let src = resources.image(source)?;
        let dst = resources.image(destination)?;
        let pipeline = self.blit_pipeline(texture_format(dst.desc.format));

        let scale = [
            src.desc.width as f32 / dst.desc.width as f32,
            src.desc.height as f32 / dst.desc.height as f32,
            0.0,
            0.0,
        ];
        let params = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit params"),
            contents: bytemuck::cast_slice(&scale),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit bind group"),
            layout: &self.blit_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&src.view) },
                wgpu::BindGroupEntry { binding: 1, resource: params.as_entire_binding() },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("blit") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));

        resources.stats.blits += 1;
        Ok(())
    }

    fn stats(&self) -> ResourceStats {
        self.resources.lock().stats
    }
}
