//! WGPU-based rendering backend
//!
//! [`RenderEngine`] draws a [`SceneDescription`] in two passes: a depth pass
//! from the key light into the shadow map, then the main pass with the debug
//! grid, the shadow-catching ground and the code card. A [`FrameOverlay`]
//! such as the UI is recorded into the same command buffer afterwards.
//!
//! Device loss is detected through the device-lost callback and through
//! out-of-memory errors; both surface as [`RenderError::ContextLost`] and
//! [`RenderEngine::recover`] rebuilds the device and every GPU resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;

use super::backend::{FrameOverlay, RenderBackend, Rendered};
use super::pipeline_manager::{PipelineConfig, PipelineManager};
use super::render_pass_ext::{DrawMesh, DrawTally, MeshBuffers};
use crate::error::{EngineError, RenderError, RenderResult};
use crate::gfx::geometry;
use crate::gfx::resources::{
    GlobalBindings, MaterialBindings, ObjectBindings, ShadowBindings, Texture, TextureResource,
};
use crate::gfx::scene::{GridSpec, GroundPlane, SceneDescription, CARD_SIZE};
use crate::performance::RendererCounters;

const SHADOW_PIPELINE: &str = "Shadow";
const CODE_PIPELINE: &str = "Code";
const GROUND_PIPELINE: &str = "Ground";
const GRID_PIPELINE: &str = "Grid";

/// Everything created from the device. Dropped and rebuilt on recovery.
struct GpuResources {
    pipelines: PipelineManager,
    globals: GlobalBindings,
    shadow: ShadowBindings,
    object: ObjectBindings,
    material: MaterialBindings,
    depth: TextureResource,
    code_texture: Option<TextureResource>,
    card: MeshBuffers,
    ground: Option<(GroundPlane, MeshBuffers)>,
    grid: Option<(GridSpec, MeshBuffers)>,
    max_texture_size: u32,
}

impl GpuResources {
    fn new(
        device: &Arc<wgpu::Device>,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        shadow_map_size: u32,
    ) -> Result<Self, String> {
        let max_texture_size = device.limits().max_texture_dimension_2d;
        let globals = GlobalBindings::new(device);
        let shadow = ShadowBindings::new(device, shadow_map_size.min(max_texture_size));
        let object = ObjectBindings::new(device);
        let material = MaterialBindings::new(device);
        let depth = TextureResource::create_depth_texture(device, width, height, "Depth Texture");

        let mut pipelines = PipelineManager::new(device.clone());
        pipelines.load_shader("shadow.wgsl", include_str!("shaders/shadow.wgsl"));
        pipelines.load_shader("code.wgsl", include_str!("shaders/code.wgsl"));
        pipelines.load_shader("ground.wgsl", include_str!("shaders/ground.wgsl"));
        pipelines.load_shader("grid.wgsl", include_str!("shaders/grid.wgsl"));

        pipelines.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default_with_shader("shadow.wgsl")
                .with_label("Shadow Pipeline")
                .with_bind_group_layouts(vec![
                    globals.layout().clone(),
                    object.layout().clone(),
                ])
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT, true)
                .with_depth_bias(wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                })
                .with_vertex_only(),
        );

        let code = PipelineConfig::default_with_shader("code.wgsl")
            .with_bind_group_layouts(vec![
                globals.layout().clone(),
                material.layout().clone(),
                object.layout().clone(),
            ])
            .with_depth(TextureResource::DEPTH_FORMAT, true)
            .with_color_target(format, Some(wgpu::BlendState::ALPHA_BLENDING));
        // The card is visible from both sides while it rotates
        pipelines.register_pipeline(
            CODE_PIPELINE,
            code.with_label("Code Pipeline").with_cull_mode(None),
        );

        pipelines.register_pipeline(
            GROUND_PIPELINE,
            PipelineConfig::default_with_shader("ground.wgsl")
                .with_label("Ground Pipeline")
                .with_bind_group_layouts(vec![
                    globals.layout().clone(),
                    shadow.layout().clone(),
                ])
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT, false)
                .with_color_target(format, Some(wgpu::BlendState::ALPHA_BLENDING)),
        );

        pipelines.register_pipeline(
            GRID_PIPELINE,
            PipelineConfig::default_with_shader("grid.wgsl")
                .with_label("Grid Pipeline")
                .with_bind_group_layouts(vec![globals.layout().clone()])
                .with_primitive_topology(wgpu::PrimitiveTopology::LineList)
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT, true)
                .with_color_target(format, Some(wgpu::BlendState::REPLACE)),
        );

        pipelines
            .create_all_pipelines()
            .map_err(|errors| errors.join("; "))?;
        log::debug!("{} render pipelines ready", pipelines.pipeline_count());

        let card_data = geometry::generate_card(CARD_SIZE);
        let card = MeshBuffers::new(device, "Card", &card_data.to_vertices(), &card_data.indices);

        Ok(Self {
            pipelines,
            globals,
            shadow,
            object,
            material,
            depth,
            code_texture: None,
            card,
            ground: None,
            grid: None,
            max_texture_size,
        })
    }

    /// Builds ground and grid meshes to match the scene, dropping them when
    /// the scene no longer has them.
    fn sync_environment(&mut self, device: &wgpu::Device, scene: &SceneDescription) {
        match scene.ground {
            Some(ground) if self.ground.as_ref().map(|(g, _)| *g) != Some(ground) => {
                let data = geometry::generate_ground(ground.size, ground.height);
                let mesh = MeshBuffers::new(device, "Ground", &data.to_vertices(), &data.indices);
                self.ground = Some((ground, mesh));
            }
            Some(_) => {}
            None => self.ground = None,
        }

        match scene.grid {
            Some(grid) if self.grid.as_ref().map(|(g, _)| *g) != Some(grid) => {
                let data = geometry::generate_grid_lines(grid.size, grid.divisions, grid.height);
                let mesh = MeshBuffers::new(device, "Grid", &data.to_vertices(), &data.indices);
                self.grid = Some((grid, mesh));
            }
            Some(_) => {}
            None => self.grid = None,
        }
    }

    /// Records the shadow and main passes into `encoder`, drawing into
    /// `target`. Returns the number of draw calls.
    fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &SceneDescription,
    ) -> RenderResult<DrawTally> {
        self.globals.update(queue, scene);
        self.object.update(queue, scene);
        self.material.update(queue, &scene.material);
        self.shadow
            .ensure_size(device, scene.shadow_map_size.min(self.max_texture_size));
        self.sync_environment(device, scene);

        let pipeline = |name: &str| {
            self.pipelines
                .get_pipeline(name)
                .ok_or_else(|| RenderError::Backend(format!("pipeline '{name}' is missing")))
        };
        let material_group = self.material.bind_group().ok_or(RenderError::NoTexture)?;
        let code_pipeline = pipeline(CODE_PIPELINE)?;
        let mut tally = DrawTally::default();

        // PASS 1: depth from the key light
        if scene.shadows {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.shadow.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            shadow_pass.set_pipeline(pipeline(SHADOW_PIPELINE)?);
            shadow_pass.set_bind_group(0, self.globals.bind_group(), &[]);
            shadow_pass.set_bind_group(1, self.object.bind_group(), &[]);
            shadow_pass.draw_mesh(&self.card);
            tally.triangles(self.card.index_count);
        }

        // PASS 2: grid, shadow catcher, then the (possibly transparent) card
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.background_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.globals.bind_group(), &[]);

            if let Some((_, grid)) = &self.grid {
                render_pass.set_pipeline(pipeline(GRID_PIPELINE)?);
                render_pass.draw_mesh(grid);
                tally.lines();
            }

            if let (true, Some((_, ground))) = (scene.shadows, &self.ground) {
                render_pass.set_pipeline(pipeline(GROUND_PIPELINE)?);
                render_pass.set_bind_group(1, self.shadow.bind_group(), &[]);
                render_pass.draw_mesh(ground);
                tally.triangles(ground.index_count);
            }

            render_pass.set_pipeline(code_pipeline);
            render_pass.set_bind_group(1, material_group, &[]);
            render_pass.set_bind_group(2, self.object.bind_group(), &[]);
            render_pass.draw_mesh(&self.card);
            tally.triangles(self.card.index_count);
        }

        Ok(tally)
    }

    /// GPU memory held by the resources this renderer created.
    fn memory_bytes(&self) -> u64 {
        let textures = self.depth.byte_size()
            + self.shadow.byte_size()
            + self.code_texture.as_ref().map_or(0, TextureResource::byte_size);
        let meshes = self.card.byte_size()
            + self.ground.as_ref().map_or(0, |(_, mesh)| mesh.byte_size())
            + self.grid.as_ref().map_or(0, |(_, mesh)| mesh.byte_size());
        textures + meshes + self.globals.buffer_size() + self.object.buffer_size()
    }

    fn destroy(mut self) {
        self.material.clear();
        if let Some(code_texture) = self.code_texture.take() {
            code_texture.texture.destroy();
        }
        self.depth.texture.destroy();
    }
}

/// Core rendering engine for one window surface.
pub struct RenderEngine {
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,
    /// Set from wgpu callbacks when the device is gone
    device_lost: Arc<AtomicBool>,
    gpu: Option<GpuResources>,
    shadow_map_size: u32,
}

impl RenderEngine {
    /// Creates a render engine for the given window.
    ///
    /// This doubles as the capability probe: any failure to get an adapter,
    /// a device or a configured surface is reported as
    /// [`EngineError::UnsupportedEnvironment`].
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    /// * `shadow_map_size` - Initial shadow map resolution
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        shadow_map_size: u32,
    ) -> Result<RenderEngine, EngineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| EngineError::UnsupportedEnvironment(format!("no surface: {e}")))?;

        let (adapter, device, queue) = request_device(&instance, &surface)
            .await
            .map_err(EngineError::UnsupportedEnvironment)?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| {
                EngineError::UnsupportedEnvironment("surface has no usable format".to_string())
            })?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let device = Arc::new(device);
        let queue = Arc::new(queue);
        let device_lost = watch_device(&device);

        let gpu = GpuResources::new(&device, format, config.width, config.height, shadow_map_size)
            .map_err(EngineError::UnsupportedEnvironment)?;

        let info = adapter.get_info();
        log::info!(
            "render engine ready on {} ({:?}), surface {:?} {}x{}",
            info.name,
            info.backend,
            format,
            config.width,
            config.height
        );

        Ok(RenderEngine {
            instance,
            surface,
            device,
            queue,
            config,
            present_modes: surface_capabilities.present_modes,
            device_lost,
            gpu: Some(gpu),
            shadow_map_size,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Used for creating compatible render targets and the UI renderer.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn check_device(&self) -> RenderResult<()> {
        if self.device_lost.load(Ordering::SeqCst) {
            return Err(RenderError::ContextLost("GPU device lost".to_string()));
        }
        Ok(())
    }

    fn resources(&mut self) -> RenderResult<&mut GpuResources> {
        self.gpu
            .as_mut()
            .ok_or_else(|| RenderError::ContextLost("GPU resources released".to_string()))
    }

    fn apply_present_mode(&mut self, preferred: wgpu::PresentMode) {
        let mode = if self.present_modes.contains(&preferred) {
            preferred
        } else {
            wgpu::PresentMode::Fifo
        };
        if self.config.present_mode != mode {
            log::debug!("present mode {:?} -> {mode:?}", self.config.present_mode);
            self.config.present_mode = mode;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn acquire_frame(&mut self) -> RenderResult<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture().map_err(surface_error)
            }
            Err(err) => Err(surface_error(err)),
        }
    }

    /// Fits oversized images into the device's texture limit.
    fn fit_to_limits(&self, texture: &Texture) -> Option<RgbaImage> {
        let max = self.device.limits().max_texture_dimension_2d;
        let (width, height) = texture.dimensions();
        if width <= max && height <= max {
            return None;
        }
        let scale = max as f32 / width.max(height) as f32;
        let (new_width, new_height) = (
            ((width as f32 * scale) as u32).max(1),
            ((height as f32 * scale) as u32).max(1),
        );
        log::warn!(
            "texture {} is {width}x{height}, downscaling to {new_width}x{new_height}",
            texture.id
        );
        Some(image::imageops::resize(
            &*texture.image,
            new_width,
            new_height,
            image::imageops::FilterType::Nearest,
        ))
    }
}

impl RenderBackend for RenderEngine {
    fn upload_texture(&mut self, texture: &Texture) -> RenderResult<()> {
        self.check_device()?;
        let resized = self.fit_to_limits(texture);
        let image = resized.as_ref().unwrap_or(&*texture.image);

        let resource = TextureResource::from_rgba(
            &self.device,
            &self.queue,
            image.as_raw(),
            image.width(),
            image.height(),
            &format!("Code Texture {}", texture.id),
        );

        let device = self.device.clone();
        let gpu = self.resources()?;
        gpu.material
            .bind_texture(&device, &resource.view, &resource.sampler);
        if let Some(previous) = gpu.code_texture.replace(resource) {
            previous.texture.destroy();
        }
        log::debug!(
            "uploaded texture {} ({}x{}, {:?})",
            texture.id,
            image.width(),
            image.height(),
            texture.kind
        );
        Ok(())
    }

    fn render(
        &mut self,
        scene: &SceneDescription,
        overlay: Option<&mut dyn FrameOverlay>,
    ) -> RenderResult<Rendered> {
        self.check_device()?;
        if self.resources()?.code_texture.is_none() {
            return Err(RenderError::NoTexture);
        }
        self.apply_present_mode(scene.present_mode);
        self.shadow_map_size = scene.shadow_map_size;

        let frame = self.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let (device, queue) = (self.device.clone(), self.queue.clone());
        let gpu = self.resources()?;
        let tally = gpu.encode(&device, &queue, &mut encoder, &view, scene)?;
        let memory_bytes = gpu.memory_bytes();

        if let Some(overlay) = overlay {
            overlay.render_overlay(&device, &queue, &mut encoder, &view)?;
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.check_device()?;

        Ok(Rendered {
            counters: RendererCounters {
                triangles: tally.triangles,
                draw_calls: tally.draw_calls,
                memory_bytes: Some(memory_bytes),
            },
        })
    }

    fn capture(&mut self, scene: &SceneDescription) -> RenderResult<RgbaImage> {
        self.check_device()?;
        let (width, height) = (self.config.width, self.config.height);
        let format = self.config.format;
        let (device, queue) = (self.device.clone(), self.queue.clone());

        let gpu = self.resources()?;
        if gpu.code_texture.is_none() {
            return Err(RenderError::NoTexture);
        }

        let target = TextureResource::create_render_target(&device, width, height, format);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Snapshot Encoder"),
        });
        gpu.encode(&device, &queue, &mut encoder, &target.view, scene)?;

        // Rows of a buffer copy must be 256-byte aligned
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snapshot Readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            target.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            target.texture.size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| RenderError::Backend(format!("device poll failed: {e}")))?;
        pollster::block_on(receiver)
            .map_err(|_| RenderError::Backend("snapshot readback was cancelled".to_string()))?
            .map_err(|e| RenderError::Backend(format!("snapshot readback failed: {e}")))?;

        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        readback.unmap();
        target.texture.destroy();

        if matches!(
            format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        ) {
            for pixel in pixels.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }
        self.check_device()?;

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Backend("snapshot size mismatch".to_string()))
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        let device = self.device.clone();
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.depth.texture.destroy();
            gpu.depth = TextureResource::create_depth_texture(&device, width, height, "Depth Texture");
        }
    }

    fn recover(&mut self) -> RenderResult<()> {
        log::info!("recreating GPU device");
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }

        let (adapter, device, queue) =
            pollster::block_on(request_device(&self.instance, &self.surface))
                .map_err(RenderError::Backend)?;

        let capabilities = self.surface.get_capabilities(&adapter);
        if !capabilities.formats.contains(&self.config.format) {
            return Err(RenderError::Backend(format!(
                "surface no longer supports {:?}",
                self.config.format
            )));
        }
        if !capabilities.present_modes.contains(&self.config.present_mode) {
            self.config.present_mode = wgpu::PresentMode::Fifo;
        }
        self.present_modes = capabilities.present_modes;

        self.device = Arc::new(device);
        self.queue = Arc::new(queue);
        self.device_lost = watch_device(&self.device);
        self.surface.configure(&self.device, &self.config);

        self.gpu = Some(
            GpuResources::new(
                &self.device,
                self.config.format,
                self.config.width,
                self.config.height,
                self.shadow_map_size,
            )
            .map_err(RenderError::Backend)?,
        );
        Ok(())
    }

    fn release(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
            log::debug!("GPU resources released");
        }
    }
}

async fn request_device(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'static>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), String> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| format!("no suitable GPU adapter: {e}"))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("codecube device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| format!("failed to create device: {e}"))?;

    Ok((adapter, device, queue))
}

/// Returns a flag raised once the device is lost or runs out of memory.
fn watch_device(device: &wgpu::Device) -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));

    let lost = flag.clone();
    device.set_device_lost_callback(move |reason, message| {
        log::warn!("GPU device lost ({reason:?}): {message}");
        lost.store(true, Ordering::SeqCst);
    });

    let exhausted = flag.clone();
    device.on_uncaptured_error(Box::new(move |error| match error {
        wgpu::Error::OutOfMemory { .. } => {
            log::error!("GPU out of memory: {error}");
            exhausted.store(true, Ordering::SeqCst);
        }
        other => log::error!("wgpu error: {other}"),
    }));

    flag
}

fn surface_error(err: wgpu::SurfaceError) -> RenderError {
    match err {
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Outdated => RenderError::SurfaceTimeout,
        wgpu::SurfaceError::Lost => RenderError::ContextLost("surface lost".to_string()),
        wgpu::SurfaceError::OutOfMemory => {
            RenderError::ContextLost("out of memory acquiring a frame".to_string())
        }
        other => RenderError::Backend(other.to_string()),
    }
}
