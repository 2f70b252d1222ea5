use std::{
    process,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use anyhow::{bail, Context};
use wgpu::{
    Adapter, Backends, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, Color, ColorTargetState, ColorWrites,
    Device, DeviceDescriptor, Extent3d, FilterMode, FragmentState, InstanceDescriptor, LoadOp,
    MemoryHints, MultisampleState, Operations, Origin3d, PipelineCompilationOptions,
    PipelineLayoutDescriptor, PrimitiveState, PrimitiveTopology, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, RequestAdapterOptions,
    SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderSource, ShaderStages,
    StoreOp, Surface, SurfaceError, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture,
    TextureAspect, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureViewDimension, VertexState,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::{
    cmd::HostAction,
    compose::{compose, Frame},
    config::Config,
    controller::PaintController,
    export,
    input::{Bindings, SimulatedHand},
    math::vec2,
    ui::PALETTE,
};

/// The compositor produces sRGB-encoded 8-bit RGBA.
const FRAME_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Longest frame interval passed to the controller. Longer gaps (window dragged, laptop
/// suspended) would otherwise complete a dwell instantly.
const MAX_STEP: Duration = Duration::from_millis(250);

pub struct App {
    config: Config,
    instance: wgpu::Instance,
    controller: PaintController,
    bindings: Bindings,
    hand: SimulatedHand,
    frame: Frame,
    last_step: Option<Instant>,
    title: String,
    win: Option<Win>,
}

struct Gpu {
    adapter: Adapter,
    device: Device,
    queue: Queue,

    render_pipeline: RenderPipeline,
    frame_texture: Texture,
    frame_bg: BindGroup,
}

impl Gpu {
    fn new(
        instance: &wgpu::Instance,
        surface: &Surface<'_>,
        frame_width: u32,
        frame_height: u32,
    ) -> anyhow::Result<Self> {
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            compatible_surface: Some(surface),
            ..Default::default()
        }))
        .context("failed to find a supported graphics adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            memory_hints: MemoryHints::MemoryUsage,
            ..Default::default()
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&surface_format) = surface_caps.formats.first() else {
            bail!("surface is not supported by the selected adapter");
        };

        // Shader
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("shader"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // BGL
        let frame_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("frame"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    count: None,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    count: None,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                },
            ],
        });

        // Pipeline.
        let render_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("present_pipeline"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("present_pipeline"),
                bind_group_layouts: &[&frame_bgl],
                push_constant_ranges: &[],
            })),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vertex"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fragment"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: ColorWrites::all(),
                })],
            }),
            multiview: None,
            cache: None,
        });

        // Frame texture, rewritten by the compositor every redraw.
        let frame_texture = device.create_texture(&TextureDescriptor {
            label: Some("frame"),
            size: Extent3d {
                width: frame_width,
                height: frame_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let sampler = device.create_sampler(&SamplerDescriptor {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let frame_bg = device.create_bind_group(&BindGroupDescriptor {
            label: Some("frame"),
            layout: &frame_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::Sampler(&sampler),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::TextureView(
                        &frame_texture.create_view(&Default::default()),
                    ),
                },
            ],
        });

        Ok(Gpu {
            adapter,
            device,
            queue,
            render_pipeline,
            frame_texture,
            frame_bg,
        })
    }

    fn upload(&self, frame: &Frame) {
        let size = self.frame_texture.size();
        if (size.width, size.height) != (frame.width(), frame.height()) {
            log::warn!(
                "frame is {}x{}, texture is {}x{}; skipping upload",
                frame.width(),
                frame.height(),
                size.width,
                size.height
            );
            return;
        }
        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &self.frame_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            frame.as_bytes(),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width()),
                rows_per_image: Some(frame.height()),
            },
            size,
        );
    }
}

struct Win {
    window: Arc<Window>,
    surface: Surface<'static>,
    gpu: Gpu,
}

impl Win {
    fn recreate_swapchain(&self) {
        let res = self.window.inner_size();
        if res.width == 0 || res.height == 0 {
            // Minimized.
            return;
        }

        let Some(config) = self
            .surface
            .get_default_config(&self.gpu.adapter, res.width, res.height)
        else {
            log::warn!("adapter does not support the window surface");
            return;
        };

        log::debug!(
            "configuring window surface for {}x{} (format: {:?}, present mode: {:?}, alpha mode: {:?})",
            res.width,
            res.height,
            config.format,
            config.present_mode,
            config.alpha_mode,
        );

        self.surface.configure(&self.gpu.device, &config);
    }

    fn redraw(&mut self, frame: &Frame) {
        let st = match self.surface.get_current_texture() {
            Ok(st) => st,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {}", err);
                self.recreate_swapchain();
                match self.surface.get_current_texture() {
                    Ok(st) => st,
                    Err(err) => {
                        log::warn!("skipping frame: {err}");
                        return;
                    }
                }
            }
            Err(err) => {
                log::warn!("skipping frame: {err}");
                return;
            }
        };

        self.gpu.upload(frame);

        let mut enc = self.gpu.device.create_command_encoder(&Default::default());
        let view = st.texture.create_view(&Default::default());
        let mut pass = enc.begin_render_pass(&RenderPassDescriptor {
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(Color::BLACK),
                    store: StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.gpu.render_pipeline);
        pass.set_bind_group(0, &self.gpu.frame_bg, &[]);
        pass.draw(0..3, 0..1);
        drop(pass);

        self.gpu.queue.submit([enc.finish()]);
        self.window.pre_present_notify();
        st.present();
    }
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let controller = PaintController::new(&config);
        let bindings = Bindings::new(&config.bind);
        let frame = Frame::new(config.canvas.width, config.canvas.height);
        Ok(Self {
            instance: wgpu::Instance::new(&InstanceDescriptor {
                backends: Backends::PRIMARY,
                ..Default::default()
            }),
            controller,
            bindings,
            hand: SimulatedHand::new(),
            frame,
            last_step: None,
            title: String::new(),
            win: None,
            config,
        })
    }

    fn create_win(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Win> {
        let (width, height) = (self.config.canvas.width, self.config.canvas.height);
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_inner_size(PhysicalSize::new(width, height))
                    .with_title("Fingertip Paint"),
            )?,
        );

        let surface = self.instance.create_surface(window.clone())?;
        let gpu = Gpu::new(&self.instance, &surface, width, height)?;
        log::debug!("creating {width}x{height} frame texture");

        let win = Win {
            window,
            surface,
            gpu,
        };
        win.recreate_swapchain();
        Ok(win)
    }

    /// Advances the controller by one frame and redraws.
    fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_step
            .map_or(Duration::ZERO, |last| (now - last).min(MAX_STEP));
        self.last_step = Some(now);

        self.controller.pump(&mut self.hand, elapsed);
        compose(
            &mut self.frame,
            self.controller.canvas().export(),
            &self.controller.overlay(),
        );

        let title = self.title();
        let Some(win) = &mut self.win else { return };
        if title != self.title {
            win.window.set_title(&title);
            self.title = title;
        }
        win.redraw(&self.frame);
    }

    fn title(&self) -> String {
        let tool = self.controller.canvas().tool();
        let tool_name = if tool.eraser {
            "Eraser"
        } else {
            PALETTE
                .iter()
                .find(|swatch| swatch.color == tool.color)
                .map_or("Custom", |swatch| swatch.name)
        };
        format!(
            "Fingertip Paint | {} | Brush {}px | {tool_name}",
            self.controller.report().status,
            tool.radius,
        )
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(cmd) = self
            .bindings
            .translate(code, event.state.is_pressed(), event.repeat)
        else {
            return;
        };
        log::debug!("{code:?} -> {cmd:?}");

        match self.controller.handle(cmd) {
            Some(HostAction::Save) => self.save(),
            Some(HostAction::Quit) => event_loop.exit(),
            None => {}
        }
    }

    fn save(&self) {
        let path = export::snapshot_path(&self.config.output_dir, SystemTime::now());
        match export::save_png(self.controller.canvas().export(), &path) {
            Ok(()) => log::info!("saved painting to '{}'", path.display()),
            Err(e) => log::warn!("could not save painting: {e:#}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.win.is_none() {
            let win = match self.create_win(event_loop) {
                Ok(win) => win,
                Err(e) => {
                    log::error!("could not create window: {e:#}");
                    process::exit(1);
                }
            };
            self.win = Some(win);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(win) = &self.win else { return };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.tick(),
            WindowEvent::Resized(_) => {
                win.recreate_swapchain();
                win.window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let size = win.window.inner_size();
                self.hand.pointer_moved(
                    vec2(position.x as f32, position.y as f32),
                    vec2(size.width as f32, size.height as f32),
                );
            }
            WindowEvent::CursorLeft { .. } => self.hand.pointer_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                self.hand.button(button, state.is_pressed());
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event_loop, event),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(win) = &self.win {
            win.window.request_redraw();
        }
    }
}
