//! Application event loop.
//!
//! [`App`] drives the whole program through winit's [`ApplicationHandler`]:
//!
//! 1. `resumed` creates the window and the GPU [`Context`] (shaders are loaded here)
//! 2. `Resized` reconfigures the surface; a zero size pauses redraws until the next usable size
//! 3. `RedrawRequested` advances the scale animation, renders and asks for the next frame
//! 4. `CloseRequested` or Escape ends the loop
//!
//! Any failure during start-up is kept and returned from [`run`], the loop never
//! continues without a window.

use std::sync::Arc;

use anyhow::Context as _;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{
    animation::ScaleOscillator,
    config::Config,
    context::{Context, SurfaceErrorAction},
};

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: Config,
    ctx: Option<Context>,
    oscillator: ScaleOscillator,
    last_time: Instant,
    frames: u64,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
        let oscillator = ScaleOscillator::from(config.scale);
        Ok(Self {
            async_runtime,
            config,
            ctx: None,
            oscillator,
            last_time: Instant::now(),
            frames: 0,
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<Context> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create the window")?,
        );

        let initial = self.oscillator.uniform();
        self.async_runtime
            .block_on(Context::new(window, &self.config, initial))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        // Minimised: stop the loop, the next non-zero Resized starts it again
        if !ctx.is_surface_configured() {
            log::debug!("surface unconfigured, pausing redraws");
            return;
        }
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        log::trace!("frame {} dt {:?}", self.frames, dt);

        self.oscillator.advance();
        match ctx.render(self.oscillator.uniform()) {
            Ok(()) => self.frames += 1,
            Err(e) => match ctx.handle_surface_error(e) {
                SurfaceErrorAction::Reconfigured => log::debug!("surface reconfigured"),
                SurfaceErrorAction::SkipFrame => {
                    log::warn!("skipping frame");
                    if !ctx.is_surface_configured() {
                        return;
                    }
                }
                SurfaceErrorAction::Fatal => {
                    self.fail(event_loop, anyhow::anyhow!("unable to render: out of memory"));
                    return;
                }
            },
        }
        ctx.window().request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() || self.error.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(ctx) => {
                log::info!(
                    "window {:?} ready at {}x{}",
                    self.config.window.title,
                    ctx.config.width,
                    ctx.config.height
                );
                ctx.window().request_redraw();
                self.last_time = Instant::now();
                self.ctx = Some(ctx);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("closing after {} frames", self.frames);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let was_configured = ctx.is_surface_configured();
                ctx.resize(size.width, size.height);
                if !was_configured && ctx.is_surface_configured() {
                    self.last_time = Instant::now();
                    ctx.window().request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open the window and render until it is closed.
pub fn run(config: Config) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };
    config.validate()?;

    let event_loop = EventLoop::new().context("failed to create the event loop")?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
