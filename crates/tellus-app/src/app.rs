//! Application state: window, GPU resources, planets, and the frame loop.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use tellus_config::Config;
use tellus_mesh::PlanetVertex;
use tellus_noise::FbmParams;
use tellus_render::{
    Camera, DepthBuffer, DrawRange, PlanetPipeline, RenderContext, StreamIndexBuffer,
    StreamVertexBuffer, SurfaceError, draw_planet, init_render_context_blocking,
};
use tellus_scene::{Entity, PlanetParams, SharedIndexBuffer, SharedVertexBuffer, spawn_planet};
use tellus_terrain::IceCapParams;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Space-black clear color.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.002,
    g: 0.002,
    b: 0.008,
    a: 1.0,
};

/// Radians per second of orbit movement.
const ORBIT_SPEED: f32 = 0.8;
/// Zoom speed as a fraction of current distance per second.
const ZOOM_SPEED: f32 = 0.9;

/// A shipped planet plus its per-entity camera uniform resources.
struct PlanetDraw {
    entity: Entity<PlanetVertex>,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    ranges: Vec<DrawRange>,
}

/// Top-level application driven by the winit event loop.
pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    pipeline: Option<PlanetPipeline>,
    depth: Option<DepthBuffer>,
    vertex_buffer: Option<SharedVertexBuffer<PlanetVertex>>,
    index_buffer: Option<SharedIndexBuffer>,
    planets: Vec<PlanetDraw>,
    camera: Camera,
    pressed: HashSet<KeyCode>,
    orbit_yaw: f32,
    orbit_pitch: f32,
    orbit_distance: f32,
    last_frame: Instant,
}

impl App {
    pub fn new(config: Config) -> Self {
        let orbit_distance = (config.planet.radius * 4.0) as f32;
        Self {
            config,
            window: None,
            gpu: None,
            pipeline: None,
            depth: None,
            vertex_buffer: None,
            index_buffer: None,
            planets: Vec::new(),
            camera: Camera::default(),
            pressed: HashSet::new(),
            orbit_yaw: 0.0,
            orbit_pitch: 0.3,
            orbit_distance,
            last_frame: Instant::now(),
        }
    }

    /// Create stream buffers, synthesize and ship the planets, and build
    /// per-planet uniform resources. Runs once after GPU init.
    fn initialize_scene(&mut self, gpu: &RenderContext) -> bool {
        let streaming = &self.config.streaming;
        let vertex_buffer = match StreamVertexBuffer::new(
            &gpu.device,
            streaming.vertex_capacity,
            streaming.vertex_block_size,
            "tellus-vertex-stream",
        ) {
            Ok(buffer) => Rc::new(RefCell::new(buffer)),
            Err(error) => {
                log::error!("vertex stream buffer: {error}");
                return false;
            }
        };
        let index_buffer = match StreamIndexBuffer::new(
            &gpu.device,
            streaming.index_capacity,
            streaming.index_block_size,
            "tellus-index-stream",
        ) {
            Ok(buffer) => Rc::new(RefCell::new(buffer)),
            Err(error) => {
                log::error!("index stream buffer: {error}");
                return false;
            }
        };

        let pipeline = PlanetPipeline::new(&gpu.device, gpu.surface_format, Some(DepthBuffer::FORMAT));

        let planet_config = &self.config.planet;
        let params = PlanetParams {
            seed: planet_config.seed,
            rows: planet_config.rows,
            cols: planet_config.cols,
            radius: planet_config.radius,
            fbm: FbmParams {
                seed: planet_config.seed,
                octaves: planet_config.octaves,
                lacunarity: planet_config.lacunarity,
                base_scale: planet_config.base_scale,
                base_frequency: planet_config.base_frequency,
            },
            ice: IceCapParams {
                band: planet_config.ice_band,
                fade: planet_config.ice_fade,
                ..Default::default()
            },
            ..Default::default()
        };

        // Two planets sharing the same pair of stream buffers.
        let spacing = (planet_config.radius * 3.5) as f32;
        let placements = [
            (Vec3::ZERO, planet_config.seed),
            (Vec3::new(spacing, 0.0, 0.0), planet_config.seed.wrapping_add(1)),
        ];

        for (position, seed) in placements {
            let spawned = spawn_planet(
                position,
                Vec3::ZERO,
                vertex_buffer.clone(),
                index_buffer.clone(),
                &PlanetParams {
                    seed,
                    fbm: FbmParams {
                        seed,
                        ..params.fbm.clone()
                    },
                    ..params.clone()
                },
            );
            let mut entity = match spawned {
                Ok(entity) => entity,
                Err(error) => {
                    log::error!("planet synthesis failed: {error}");
                    return false;
                }
            };
            if let Err(error) = entity.ship(&gpu.queue) {
                log::error!("planet ship failed: {error}");
                return false;
            }
            let ranges = entity.draw_ranges();

            let uniform = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("planet-camera-uniform"),
                size: std::mem::size_of::<tellus_render::CameraUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("planet-camera-bind-group"),
                layout: &pipeline.camera_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                }],
            });

            self.planets.push(PlanetDraw {
                entity,
                uniform,
                bind_group,
                ranges,
            });
        }

        log::info!(
            "scene ready: {} planets, {} free vertex blocks, {} free index blocks",
            self.planets.len(),
            vertex_buffer.borrow().free_block_count(),
            index_buffer.borrow().free_block_count(),
        );

        self.depth = Some(DepthBuffer::new(
            &gpu.device,
            gpu.surface_config.width,
            gpu.surface_config.height,
        ));
        self.pipeline = Some(pipeline);
        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.camera
            .set_aspect_ratio(gpu.surface_config.width as f32, gpu.surface_config.height as f32);
        true
    }

    /// Advance the orbit camera from held keys.
    fn update_camera(&mut self, dt: f32) {
        if self.pressed.contains(&KeyCode::ArrowLeft) {
            self.orbit_yaw -= ORBIT_SPEED * dt;
        }
        if self.pressed.contains(&KeyCode::ArrowRight) {
            self.orbit_yaw += ORBIT_SPEED * dt;
        }
        if self.pressed.contains(&KeyCode::ArrowUp) {
            self.orbit_pitch = (self.orbit_pitch + ORBIT_SPEED * dt).min(1.4);
        }
        if self.pressed.contains(&KeyCode::ArrowDown) {
            self.orbit_pitch = (self.orbit_pitch - ORBIT_SPEED * dt).max(-1.4);
        }
        let min_distance = (self.config.planet.radius * 1.2) as f32;
        if self.pressed.contains(&KeyCode::KeyW) {
            self.orbit_distance = (self.orbit_distance * (1.0 - ZOOM_SPEED * dt)).max(min_distance);
        }
        if self.pressed.contains(&KeyCode::KeyS) {
            self.orbit_distance *= 1.0 + ZOOM_SPEED * dt;
        }

        let direction = Vec3::new(
            self.orbit_pitch.cos() * self.orbit_yaw.sin(),
            self.orbit_pitch.sin(),
            self.orbit_pitch.cos() * self.orbit_yaw.cos(),
        );
        self.camera.orbit(Vec3::ZERO, direction, self.orbit_distance);
    }

    fn render(&mut self) {
        let (Some(gpu), Some(pipeline), Some(depth)) =
            (&self.gpu, &self.pipeline, &self.depth)
        else {
            return;
        };
        let (Some(vertex_buffer), Some(index_buffer)) = (&self.vertex_buffer, &self.index_buffer)
        else {
            return;
        };

        let frame = match gpu.acquire_frame() {
            Ok(frame) => frame,
            Err(SurfaceError::Timeout) => return,
            Err(error) => {
                log::error!("frame acquisition failed: {error}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // All uniform writes land before the encoder's commands execute.
        for planet in &self.planets {
            let uniform = self.camera.to_uniform(planet.entity.model_matrix());
            gpu.queue
                .write_buffer(&planet.uniform, 0, bytemuck::bytes_of(&uniform));
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tellus-frame"),
            });

        {
            let vertex_buffer = vertex_buffer.borrow();
            let index_buffer = index_buffer.borrow();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("planet-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(DepthBuffer::CLEAR_VALUE),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for planet in &self.planets {
                draw_planet(
                    &mut pass,
                    pipeline,
                    &planet.bind_group,
                    &vertex_buffer,
                    &index_buffer,
                    &planet.ranges,
                );
            }
        }

        gpu.queue.submit([encoder.finish()]);
        frame.present();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width as f64,
                self.config.window.height as f64,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .expect("failed to create window"),
        );

        match init_render_context_blocking(window.clone()) {
            Ok(gpu) => {
                if !self.initialize_scene(&gpu) {
                    event_loop.exit();
                    return;
                }
                self.gpu = Some(gpu);
            }
            Err(error) => {
                log::error!("GPU initialization failed: {error}");
                event_loop.exit();
                return;
            }
        }

        self.last_frame = Instant::now();
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size.width, size.height);
                    if let Some(depth) = &mut self.depth {
                        depth.resize(&gpu.device, size.width.max(1), size.height.max(1));
                    }
                }
                self.camera
                    .set_aspect_ratio(size.width as f32, size.height as f32);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if code == KeyCode::Escape {
                        event_loop.exit();
                        return;
                    }
                    if event.state.is_pressed() {
                        self.pressed.insert(code);
                    } else {
                        self.pressed.remove(&code);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame).as_secs_f32().min(0.1);
                self.last_frame = now;

                self.update_camera(dt);
                self.render();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
