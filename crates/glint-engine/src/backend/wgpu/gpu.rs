use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{
    AttributeSlot, Backend, BufferId, BufferKind, ContextConfig, FrameStatus, ProgramId, Topology, UniformSlot,
};
use crate::error::RenderError;
use crate::paint::Color;
use crate::shader::ProgramDesc;

use super::pipeline::{build_pipeline, PipelineKey, ProgramRecord, DEPTH_FORMAT};
use super::surface::{choose_alpha_mode, choose_surface_format, surface_error_action, SurfaceErrorAction};
use super::GpuInit;

/// Backend that renders to a winit window through wgpu.
///
/// Owns the wgpu core objects and the swapchain configuration:
/// - creates Instance/Adapter/Device/Queue and configures the surface
/// - keeps programs, buffers and the render pipelines built for them
/// - records draws between `begin_frame` and `end_frame`, then encodes them
///   into a single render pass and presents
pub struct WgpuBackend {
    // Keeps the surface's window alive; the surface borrows it for `'static`.
    _window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    clear_color: Color,
    depth: Option<wgpu::TextureView>,
    depth_test: bool,

    next_id: u32,
    programs: HashMap<ProgramId, ProgramRecord>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    bindings: Bindings,
    frame: Option<ActiveFrame>,
}

#[derive(Default)]
struct Bindings {
    program: Option<ProgramId>,
    attributes: BTreeMap<AttributeSlot, (BufferId, u32)>,
    index: Option<BufferId>,
    uniforms: BTreeMap<UniformSlot, [f32; 16]>,
}

/// A single acquired frame and the draws recorded into it.
///
/// Holding the surface texture prevents acquisition of subsequent frames, so
/// this only lives between `begin_frame` and `end_frame`.
struct ActiveFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    clear: bool,
    draws: Vec<RecordedDraw>,
}

struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: Option<wgpu::BindGroup>,
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    count: u32,
}

impl WgpuBackend {
    /// Creates the device and configures a surface for `window`.
    pub async fn new(window: Arc<Window>, init: GpuInit, context: &ContextConfig) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("glint device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb).context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &config);
        }

        log::info!(
            "wgpu adapter `{}` ({:?}), surface format {format:?}",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self {
            _window: window,
            surface,
            device,
            queue,
            config,
            size,
            clear_color: context.clear_color,
            depth: None,
            depth_test: context.depth_test,
            next_id: 0,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            pipelines: HashMap::new(),
            bindings: Bindings::default(),
            frame: None,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn has_area(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    fn recreate_depth(&mut self) {
        if !self.depth_test || !self.has_area() {
            self.depth = None;
            return;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glint depth"),
            size: wgpu::Extent3d {
                width: self.config.width,
                height: self.config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.depth = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
    }

    fn record_draw(&mut self, topology: Topology, count: u32, indexed: bool) {
        if self.frame.is_none() {
            log::warn!("draw outside of a frame ignored");
            return;
        }
        let Some(program_id) = self.bindings.program else {
            log::error!("draw without an active program dropped");
            return;
        };
        let Some(program) = self.programs.get(&program_id) else {
            log::error!("draw with destroyed program {program_id:?} dropped");
            return;
        };

        let mut layout = Vec::with_capacity(program.attributes.len());
        let mut vertex_buffers = Vec::with_capacity(program.attributes.len());
        for attr in &program.attributes {
            let bound = self
                .bindings
                .attributes
                .get(&AttributeSlot(attr.location))
                .and_then(|&(id, components)| self.buffers.get(&id).map(|b| (b, components)));
            let Some((buffer, components)) = bound else {
                log::error!("attribute `{}` has no buffer bound; draw dropped", attr.name);
                return;
            };
            layout.push((attr.location, components));
            vertex_buffers.push(buffer.clone());
        }

        let index_buffer = if indexed {
            let Some(buffer) = self.bindings.index.and_then(|id| self.buffers.get(&id)) else {
                log::error!("indexed draw without an index buffer dropped");
                return;
            };
            Some(buffer.clone())
        } else {
            None
        };

        // Per-draw uniform buffers: uniforms are captured at draw time.
        let bind_group = (!program.uniform_bindings.is_empty()).then(|| {
            let uniform_buffers: Vec<(u32, wgpu::Buffer)> = program
                .uniform_bindings
                .iter()
                .map(|&binding| {
                    let value = self
                        .bindings
                        .uniforms
                        .get(&UniformSlot(binding))
                        .copied()
                        .unwrap_or_else(|| Mat4::IDENTITY.to_cols_array());
                    let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("glint uniform"),
                        contents: bytemuck::cast_slice(&value),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    (binding, buffer)
                })
                .collect();

            let entries: Vec<wgpu::BindGroupEntry<'_>> = uniform_buffers
                .iter()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect();

            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glint uniforms"),
                layout: &program.bind_group_layout,
                entries: &entries,
            })
        });

        let key = PipelineKey {
            program: program_id,
            topology,
            attributes: layout,
            indexed,
        };
        let pipeline = self
            .pipelines
            .entry(key)
            .or_insert_with_key(|key| build_pipeline(&self.device, program, key, self.config.format, self.depth_test))
            .clone();

        if let Some(frame) = self.frame.as_mut() {
            frame.draws.push(RecordedDraw {
                pipeline,
                bind_group,
                vertex_buffers,
                index_buffer,
                count,
            });
        }
    }
}

impl Backend for WgpuBackend {
    fn configure(&mut self, config: &ContextConfig) {
        self.clear_color = config.clear_color;
        self.depth_test = config.depth_test;
        self.pipelines.clear();
        self.recreate_depth();
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> std::result::Result<ProgramId, String> {
        let id = ProgramId(self.next_id());
        let record = ProgramRecord::new(&self.device, desc);
        self.programs.insert(id, record);
        log::debug!(
            "program {id:?} created ({} attributes, {} uniforms)",
            desc.attributes.len(),
            desc.uniforms.len()
        );
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.programs.remove(&id);
        self.pipelines.retain(|key, _| key.program != id);
        if self.bindings.program == Some(id) {
            self.bindings = Bindings::default();
        }
    }

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> BufferId {
        let id = BufferId(self.next_id());
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glint geometry"),
            contents,
            usage,
        });
        self.buffers.insert(id, buffer);
        id
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        // Draws already recorded hold their own reference until submission.
        self.buffers.remove(&id);
        self.bindings.attributes.retain(|_, (buffer, _)| *buffer != id);
        if self.bindings.index == Some(id) {
            self.bindings.index = None;
        }
    }

    fn begin_frame(&mut self) -> std::result::Result<FrameStatus, RenderError> {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is open; previous frame discarded");
            self.frame = None;
        }
        if !self.has_area() {
            return Ok(FrameStatus::Skipped);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                return match surface_error_action(&err) {
                    SurfaceErrorAction::Reconfigure => {
                        log::warn!("surface {err}; reconfiguring");
                        self.surface.configure(&self.device, &self.config);
                        Ok(FrameStatus::Skipped)
                    }
                    SurfaceErrorAction::SkipFrame => {
                        log::debug!("surface {err}; frame skipped");
                        Ok(FrameStatus::Skipped)
                    }
                    SurfaceErrorAction::Fatal => {
                        log::error!("surface {err}");
                        Err(RenderError::SurfaceLost)
                    }
                };
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.frame = Some(ActiveFrame {
            surface_texture,
            view,
            clear: false,
            draws: Vec::new(),
        });
        Ok(FrameStatus::Ready)
    }

    fn clear(&mut self) {
        match self.frame.as_mut() {
            // Draws before the clear are wiped by it.
            Some(frame) => {
                frame.clear = true;
                frame.draws.clear();
            }
            None => log::warn!("clear outside of a frame ignored"),
        }
    }

    fn use_program(&mut self, id: ProgramId) {
        if self.bindings.program != Some(id) {
            self.bindings = Bindings {
                program: Some(id),
                ..Bindings::default()
            };
        }
    }

    fn bind_attribute(&mut self, slot: AttributeSlot, buffer: BufferId, components: u32) {
        self.bindings.attributes.insert(slot, (buffer, components));
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.bindings.index = Some(buffer);
    }

    fn set_uniform_mat4(&mut self, slot: UniformSlot, value: [f32; 16]) {
        self.bindings.uniforms.insert(slot, value);
    }

    fn draw(&mut self, topology: Topology, vertex_count: u32) {
        self.record_draw(topology, vertex_count, false);
    }

    fn draw_indexed(&mut self, topology: Topology, index_count: u32) {
        self.record_draw(topology, index_count, true);
    }

    fn end_frame(&mut self) -> std::result::Result<(), RenderError> {
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glint frame encoder"),
            });

        {
            let c = self.clear_color;
            let load = if frame.clear {
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(c.r),
                    g: f64::from(c.g),
                    b: f64::from(c.b),
                    a: f64::from(c.a),
                })
            } else {
                wgpu::LoadOp::Load
            };

            let depth_stencil_attachment =
                self.depth
                    .as_ref()
                    .map(|view| wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    });

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glint pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &frame.draws {
                rpass.set_pipeline(&draw.pipeline);
                if let Some(bind_group) = &draw.bind_group {
                    rpass.set_bind_group(0, bind_group, &[]);
                }
                for (i, buffer) in draw.vertex_buffers.iter().enumerate() {
                    rpass.set_vertex_buffer(i as u32, buffer.slice(..));
                }
                match &draw.index_buffer {
                    Some(index) => {
                        rpass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint16);
                        rpass.draw_indexed(0..draw.count, 0, 0..1);
                    }
                    None => rpass.draw(0..draw.count, 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = PhysicalSize::new(width, height);

        // wgpu does not support configuring a 0x0 surface; defer until it has area.
        if !self.has_area() {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.recreate_depth();
    }
}
