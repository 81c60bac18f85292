use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::wgpu::{GpuInit, WgpuBackend, WgpuSurface};
use crate::device::{ContextConfig, GraphicsContext};
use crate::error::RenderError;
use crate::frame::{FrameLoop, FrameTick, PausableScheduler, TickScheduler, DEFAULT_ANGULAR_VELOCITY};
use crate::time::FrameClock;

/// Context type the runtime hands to applications.
pub type WindowContext = GraphicsContext<WgpuBackend>;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Pipeline state applied when the context is acquired.
    pub context: ContextConfig,
    pub gpu: GpuInit,
    /// Rotation rate fed to `FrameTick::rotation`, radians per second.
    pub angular_velocity: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            initial_size: LogicalSize::new(640.0, 480.0),
            context: ContextConfig::default(),
            gpu: GpuInit::default(),
            angular_velocity: DEFAULT_ANGULAR_VELOCITY,
        }
    }
}

/// Application contract driven by `Runtime`.
pub trait App: 'static {
    /// Builds programs and geometry. Called once, after the context is acquired.
    fn setup(&mut self, ctx: &mut WindowContext) -> crate::error::Result<()>;

    /// Draws one frame.
    fn on_frame(&mut self, ctx: &mut WindowContext, tick: FrameTick) -> crate::error::Result<()>;

    /// Surface size changed (physical pixels, never zero).
    fn resized(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Releases GPU resources. Called once before the context is dropped.
    fn teardown(&mut self, ctx: &mut WindowContext) {
        let _ = ctx;
    }
}

/// `TickScheduler` backed by winit redraw requests.
pub struct RedrawScheduler {
    window: Arc<Window>,
}

impl TickScheduler for RedrawScheduler {
    fn request_tick(&mut self) {
        self.window.request_redraw();
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens a window and runs `app` until the window closes or the surface is lost.
    ///
    /// Context acquisition and `App::setup` failures are returned as errors.
    pub fn run<A: App>(config: RuntimeConfig, app: A) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// State the frame callback draws with.
struct Frame<A> {
    ctx: WindowContext,
    app: A,
}

struct Running<A: App> {
    window: Arc<Window>,
    frame: Frame<A>,
    frame_loop: FrameLoop<Frame<A>, PausableScheduler<RedrawScheduler>>,
    clock: FrameClock,
}

impl<A: App> Running<A> {
    /// Resizes the context. Redraws are held while the window has no area.
    fn resize(&mut self, width: u32, height: u32) {
        self.frame.ctx.resize(width, height);
        let scheduler = self.frame_loop.scheduler_mut();
        if width == 0 || height == 0 {
            scheduler.pause();
        } else {
            scheduler.resume();
        }
    }
}

struct AppState<A: App> {
    config: RuntimeConfig,
    pending: Option<A>,
    running: Option<Running<A>>,
    failure: Option<anyhow::Error>,
}

impl<A: App> AppState<A> {
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            pending: Some(app),
            running: None,
            failure: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop, mut app: A) -> Result<Running<A>> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let surface = WgpuSurface::new(Arc::clone(&window), self.config.gpu.clone());
        let mut ctx = GraphicsContext::acquire(surface, self.config.context.clone())?;

        app.setup(&mut ctx).context("application setup failed")?;

        let size = window.inner_size();
        let visible = size.width > 0 && size.height > 0;
        if visible {
            app.resized(size.width, size.height);
        }

        let mut scheduler = PausableScheduler::new(RedrawScheduler {
            window: Arc::clone(&window),
        });
        if !visible {
            scheduler.pause();
        }
        let mut frame_loop = FrameLoop::new(scheduler, |frame: &mut Frame<A>, tick| {
            frame.app.on_frame(&mut frame.ctx, tick)
        })
        .with_angular_velocity(self.config.angular_velocity);
        frame_loop.start();

        Ok(Running {
            window,
            frame: Frame { ctx, app },
            frame_loop,
            clock: FrameClock::new(),
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut running) = self.running.take() {
            running.frame_loop.stop();
            running.frame.app.teardown(&mut running.frame.ctx);
            log::info!("runtime shut down after {} frames", running.frame_loop.frames_drawn());
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.shutdown(event_loop);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        let time = running.clock.tick();
        match running.frame_loop.tick(&mut running.frame, time) {
            Ok(_) => {}
            Err(RenderError::SurfaceLost) => {
                log::warn!("surface lost; closing");
                self.shutdown(event_loop);
            }
            Err(err) => self.fail(event_loop, err.into()),
        }
    }
}

impl<A: App> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(app) = self.pending.take() else {
            return;
        };

        match self.start(event_loop, app) {
            Ok(running) => self.running = Some(running),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Redraws are requested by the frame loop itself.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.running.as_ref().is_none_or(|r| r.window.id() != window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                if let Some(running) = self.running.as_mut() {
                    running.resize(size.width, size.height);
                    if size.width > 0 && size.height > 0 {
                        running.frame.app.resized(size.width, size.height);
                    }
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(running) = self.running.as_mut() {
                    let size = running.window.inner_size();
                    running.resize(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown(event_loop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_frame_loop_rate() {
        let config = RuntimeConfig::default();
        assert_eq!(config.initial_size, LogicalSize::new(640.0, 480.0));
        assert!((config.angular_velocity - 75f32.to_radians()).abs() < 1e-6);
        assert!(config.context.depth_test);
    }
}
