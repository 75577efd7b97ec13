//! wgpu execution of the viewport's frame plans. The renderer owns the GPU
//! resources (surface, pipelines, buffers, the overlay texture) and walks
//! each plan pass by pass: set the pass's viewport and scissor rectangle,
//! load or clear the attachments exactly as the pass says, and draw the
//! primary or helper scene with the active or PIP camera. The 2D overlay is
//! blitted over the finished frame at the end.

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::{cast_slice, Pod, Zeroable};
use glam::Mat4;
use meshmark_model::MeshVertex;
use meshmark_viewport::compositor::{FramePass, FramePlan, PassCamera, PassScene};
use meshmark_viewport::Viewport;
use wgpu::util::DeviceExt;
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::shaders::{
    LINE_SHADER_SOURCE, MARKER_SHADER_SOURCE, MESH_SHADER_SOURCE, OVERLAY_SHADER_SOURCE,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Marker radius as a clip-space offset; keeps markers a constant size on
/// screen under both projections.
const MARKER_SIZE: f32 = 0.02;

const MARKER_PALETTE: [[f32; 3]; 6] = [
    [0.95, 0.55, 0.25],
    [0.30, 0.75, 0.95],
    [0.85, 0.35, 0.55],
    [0.45, 0.85, 0.40],
    [0.90, 0.80, 0.30],
    [0.65, 0.50, 0.95],
];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PassUniforms {
    clip_from_local: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct LineVertex {
    position: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MarkerCorner {
    corner: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MarkerInstance {
    centre: [f32; 3],
    size: f32,
    color: [f32; 3],
    _padding: f32,
}

const MARKER_CORNERS: [MarkerCorner; 6] = [
    MarkerCorner { corner: [-0.5, -0.5] },
    MarkerCorner { corner: [0.5, -0.5] },
    MarkerCorner { corner: [-0.5, 0.5] },
    MarkerCorner { corner: [-0.5, 0.5] },
    MarkerCorner { corner: [0.5, -0.5] },
    MarkerCorner { corner: [0.5, 0.5] },
];

struct UniformBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    /// Identity of the uploaded mesh, so re-uploads only happen on swap.
    mesh_ptr: usize,
}

pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth_view: wgpu::TextureView,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,
    overlay_pipeline: wgpu::RenderPipeline,
    overlay_bind_group_layout: wgpu::BindGroupLayout,
    overlay_sampler: wgpu::Sampler,
    overlay_texture: wgpu::Texture,
    overlay_bind_group: wgpu::BindGroup,
    overlay_generation: u64,
    active_uniform: UniformBinding,
    pip_uniform: UniformBinding,
    mesh_buffers: Option<MeshBuffers>,
    line_vertex_buffer: wgpu::Buffer,
    line_capacity: usize,
    line_count: u32,
    marker_corner_buffer: wgpu::Buffer,
    marker_instance_buffer: wgpu::Buffer,
    marker_capacity: usize,
    marker_count: u32,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("creating wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .context("requesting wgpu adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("meshmark-viewer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("requesting wgpu device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Mailbox)
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, size);

        let pass_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("pass-uniform-layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let active_uniform = create_uniform_binding(&device, &pass_bind_group_layout, "active");
        let pip_uniform = create_uniform_binding(&device, &pass_bind_group_layout, "pip");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&pass_bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER_SOURCE)),
        });
        let mesh_pipeline = create_scene_pipeline(
            &device,
            &pipeline_layout,
            &mesh_shader,
            surface_format,
            "mesh-pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<MeshVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
            }],
        );

        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(LINE_SHADER_SOURCE)),
        });
        let line_pipeline = create_scene_pipeline(
            &device,
            &pipeline_layout,
            &line_shader,
            surface_format,
            "line-pipeline",
            wgpu::PrimitiveTopology::LineList,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<LineVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            }],
        );

        let marker_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("marker-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(MARKER_SHADER_SOURCE)),
        });
        let marker_pipeline = create_scene_pipeline(
            &device,
            &pipeline_layout,
            &marker_shader,
            surface_format,
            "marker-pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MarkerCorner>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MarkerInstance>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        1 => Float32x3,
                        2 => Float32,
                        3 => Float32x3,
                    ],
                },
            ],
        );

        let overlay_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("overlay-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        let overlay_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("overlay-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let overlay_texture = create_overlay_texture(&device, size);
        let overlay_bind_group = create_overlay_bind_group(
            &device,
            &overlay_bind_group_layout,
            &overlay_texture,
            &overlay_sampler,
        );

        let overlay_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(OVERLAY_SHADER_SOURCE)),
        });
        let overlay_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("overlay-pipeline-layout"),
                bind_group_layouts: &[&overlay_bind_group_layout],
                push_constant_ranges: &[],
            });
        let overlay_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay-pipeline"),
            layout: Some(&overlay_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &overlay_shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &overlay_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let marker_corner_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker-corner-buffer"),
            contents: cast_slice(&MARKER_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let line_capacity = 16usize;
        let line_vertex_buffer = create_vertex_buffer::<LineVertex>(
            &device,
            "line-vertex-buffer",
            line_capacity,
        );
        let marker_capacity = 16usize;
        let marker_instance_buffer = create_vertex_buffer::<MarkerInstance>(
            &device,
            "marker-instance-buffer",
            marker_capacity,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth_view,
            mesh_pipeline,
            line_pipeline,
            marker_pipeline,
            overlay_pipeline,
            overlay_bind_group_layout,
            overlay_sampler,
            overlay_texture,
            overlay_bind_group,
            overlay_generation: 0,
            active_uniform,
            pip_uniform,
            mesh_buffers: None,
            line_vertex_buffer,
            line_capacity,
            line_count: 0,
            marker_corner_buffer,
            marker_instance_buffer,
            marker_capacity,
            marker_count: 0,
        })
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, new_size);
        self.overlay_texture = create_overlay_texture(&self.device, new_size);
        self.overlay_bind_group = create_overlay_bind_group(
            &self.device,
            &self.overlay_bind_group_layout,
            &self.overlay_texture,
            &self.overlay_sampler,
        );
        // Force a re-upload into the recreated texture.
        self.overlay_generation = 0;
    }

    /// Execute one frame plan.
    pub fn render(&mut self, plan: &FramePlan, viewport: &Viewport) -> Result<(), SurfaceError> {
        self.sync_scene_buffers(viewport);
        self.sync_overlay(viewport);

        let world_from_local = viewport.scene().world_from_local();
        let active = uniforms_for(viewport.rig().active_view_projection(), world_from_local);
        let pip = uniforms_for(viewport.rig().pip.view_projection(), world_from_local);
        self.queue
            .write_buffer(&self.active_uniform.buffer, 0, cast_slice(&[active]));
        self.queue
            .write_buffer(&self.pip_uniform.buffer, 0, cast_slice(&[pip]));

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("meshmark-viewer-encoder"),
            });

        for pass in &plan.passes {
            self.encode_pass(&mut encoder, &view, pass);
        }

        {
            let mut overlay_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            overlay_pass.set_pipeline(&self.overlay_pipeline);
            overlay_pass.set_bind_group(0, &self.overlay_bind_group, &[]);
            overlay_pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        pass: &FramePass,
    ) {
        let color_load = match pass.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = if pass.clear_depth {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let rect = pass.rect;
        rpass.set_viewport(
            rect.x as f32,
            rect.y as f32,
            rect.width as f32,
            rect.height as f32,
            0.0,
            1.0,
        );
        rpass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);

        let uniform = match pass.camera {
            PassCamera::Active => &self.active_uniform,
            PassCamera::Pip => &self.pip_uniform,
        };

        match pass.scene {
            PassScene::Primary => {
                if let Some(mesh) = self.mesh_buffers.as_ref() {
                    rpass.set_pipeline(&self.mesh_pipeline);
                    rpass.set_bind_group(0, &uniform.bind_group, &[]);
                    rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
                if self.marker_count > 0 {
                    rpass.set_pipeline(&self.marker_pipeline);
                    rpass.set_bind_group(0, &uniform.bind_group, &[]);
                    rpass.set_vertex_buffer(0, self.marker_corner_buffer.slice(..));
                    let byte_len =
                        self.marker_count as u64 * std::mem::size_of::<MarkerInstance>() as u64;
                    rpass.set_vertex_buffer(1, self.marker_instance_buffer.slice(0..byte_len));
                    rpass.draw(0..MARKER_CORNERS.len() as u32, 0..self.marker_count);
                }
            }
            PassScene::Helper => {
                if self.line_count > 0 {
                    rpass.set_pipeline(&self.line_pipeline);
                    rpass.set_bind_group(0, &uniform.bind_group, &[]);
                    let byte_len =
                        self.line_count as u64 * std::mem::size_of::<LineVertex>() as u64;
                    rpass.set_vertex_buffer(0, self.line_vertex_buffer.slice(0..byte_len));
                    rpass.draw(0..self.line_count, 0..1);
                }
            }
        }
    }

    /// Re-upload mesh, line, and marker buffers when the scene content
    /// changed since the last frame.
    fn sync_scene_buffers(&mut self, viewport: &Viewport) {
        let scene = viewport.scene();

        match scene.mesh() {
            None => self.mesh_buffers = None,
            Some(mesh) => {
                let mesh_ptr = std::rc::Rc::as_ptr(mesh) as usize;
                let stale = self
                    .mesh_buffers
                    .as_ref()
                    .map_or(true, |buffers| buffers.mesh_ptr != mesh_ptr);
                if stale {
                    let vertex_buffer =
                        self.device
                            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("mesh-vertex-buffer"),
                                contents: cast_slice(&mesh.vertices),
                                usage: wgpu::BufferUsages::VERTEX,
                            });
                    let index_buffer =
                        self.device
                            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("mesh-index-buffer"),
                                contents: cast_slice(&mesh.indices),
                                usage: wgpu::BufferUsages::INDEX,
                            });
                    log::debug!(
                        "uploaded mesh: {} vertices, {} indices",
                        mesh.vertices.len(),
                        mesh.indices.len()
                    );
                    self.mesh_buffers = Some(MeshBuffers {
                        vertex_buffer,
                        index_buffer,
                        index_count: mesh.indices.len() as u32,
                        mesh_ptr,
                    });
                }
            }
        }

        let line_vertices: Vec<LineVertex> = scene
            .connectivity_views()
            .iter()
            .flat_map(|edge| {
                [
                    LineVertex {
                        position: edge.start_position.to_array(),
                    },
                    LineVertex {
                        position: edge.end_position.to_array(),
                    },
                ]
            })
            .collect();
        if line_vertices.len() > self.line_capacity {
            self.line_capacity = line_vertices.len().next_power_of_two();
            self.line_vertex_buffer = create_vertex_buffer::<LineVertex>(
                &self.device,
                "line-vertex-buffer",
                self.line_capacity,
            );
        }
        if !line_vertices.is_empty() {
            self.queue
                .write_buffer(&self.line_vertex_buffer, 0, cast_slice(&line_vertices));
        }
        self.line_count = line_vertices.len() as u32;

        let marker_instances: Vec<MarkerInstance> = scene
            .landmark_views()
            .iter()
            .map(|landmark| MarkerInstance {
                centre: landmark.position.to_array(),
                size: MARKER_SIZE,
                color: MARKER_PALETTE[landmark.index as usize % MARKER_PALETTE.len()],
                _padding: 0.0,
            })
            .collect();
        if marker_instances.len() > self.marker_capacity {
            self.marker_capacity = marker_instances.len().next_power_of_two();
            self.marker_instance_buffer = create_vertex_buffer::<MarkerInstance>(
                &self.device,
                "marker-instance-buffer",
                self.marker_capacity,
            );
        }
        if !marker_instances.is_empty() {
            self.queue.write_buffer(
                &self.marker_instance_buffer,
                0,
                cast_slice(&marker_instances),
            );
        }
        self.marker_count = marker_instances.len() as u32;
    }

    /// Upload the overlay pixels when its generation moved on.
    fn sync_overlay(&mut self, viewport: &Viewport) {
        let overlay = viewport.overlay();
        if overlay.generation() == self.overlay_generation {
            return;
        }
        let overlay_size = overlay.size();
        if overlay_size.width != self.size.width || overlay_size.height != self.size.height {
            // The overlay resize lands on the next frame's upload.
            return;
        }
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.overlay_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            overlay.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * overlay_size.width),
                rows_per_image: Some(overlay_size.height),
            },
            wgpu::Extent3d {
                width: overlay_size.width,
                height: overlay_size.height,
                depth_or_array_layers: 1,
            },
        );
        self.overlay_generation = overlay.generation();
    }
}

fn uniforms_for(view_projection: Mat4, world_from_local: Mat4) -> PassUniforms {
    PassUniforms {
        clip_from_local: (view_projection * world_from_local).to_cols_array_2d(),
    }
}

fn create_uniform_binding(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
) -> UniformBinding {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<PassUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    UniformBinding { buffer, bind_group }
}

fn create_vertex_buffer<T>(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (capacity * std::mem::size_of::<T>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_view(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth-texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_overlay_texture(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("overlay-texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_overlay_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("overlay-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    label: &str,
    topology: wgpu::PrimitiveTopology,
    buffers: &[wgpu::VertexBufferLayout],
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}
