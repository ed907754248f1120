//! GPU and window context.
//!
//! [`Context`] owns the window surface, the device and queue and the triangle
//! pipeline. It is created once the window exists and lives until the event
//! loop exits; dropping it releases every GPU object.

use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    animation::ScaleUniform, config::Config, pipelines::triangle::TrianglePipeline,
    shader::ShaderPair,
};

/// What the frame loop should do after a failed surface acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured, try again next frame.
    Reconfigured,
    /// Transient, drop this frame.
    SkipFrame,
    /// Out of memory, stop rendering.
    Fatal,
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub triangle: TrianglePipeline,
    pub clear_colour: wgpu::Color,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, config: &Config, initial: ScaleUniform) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // Compile before touching the GPU so shader mistakes surface first
        let shaders = ShaderPair::load(&config.shaders)?;

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a GPU adapter compatible with the window")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colours and rely on an sRGB surface for the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no supported formats")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let triangle = TrianglePipeline::new(&device, surface_config.format, &shaders, initial);

        let mut ctx = Self {
            window,
            surface,
            device,
            queue,
            config: surface_config,
            triangle,
            clear_colour: config.clear_colour,
            is_surface_configured: false,
        };
        ctx.resize(size.width, size.height);
        Ok(ctx)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    /// Reconfigure the surface for a new size. A zero dimension (minimised window)
    /// marks the surface unconfigured until a usable size comes in.
    pub fn resize(&mut self, width: u32, height: u32) {
        if !has_area(width, height) {
            log::debug!("surface unconfigured at {}x{}", width, height);
            self.is_surface_configured = false;
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
        log::debug!("surface configured to {}x{}", width, height);
    }

    pub fn render(&mut self, uniform: ScaleUniform) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.triangle.write_scale(&self.queue, uniform);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.triangle.draw(&mut encoder, &view, self.clear_colour);
        self.queue.submit(std::iter::once(encoder.finish()));

        self.window.pre_present_notify();
        output.present();
        Ok(())
    }

    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        let size = self.window.inner_size();
        let action = surface_error_action(&err, has_area(size.width, size.height));
        match action {
            SurfaceErrorAction::Reconfigured => self.resize(size.width, size.height),
            // nothing to present into until the window has an area again
            SurfaceErrorAction::SkipFrame if !has_area(size.width, size.height) => {
                self.is_surface_configured = false
            }
            _ => (),
        }
        action
    }
}

fn has_area(width: u32, height: u32) -> bool {
    width > 0 && height > 0
}

/// Map a failed frame acquisition onto what the loop should do next.
///
/// A lost or outdated surface can only be reconfigured while the window has a size.
fn surface_error_action(err: &wgpu::SurfaceError, has_size: bool) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated if has_size => {
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

pub(crate) async fn request_device(
    adapter: &wgpu::Adapter,
) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("trigon device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create the GPU device and queue")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_reconfigure_a_sized_surface() {
        assert_eq!(
            surface_error_action(&wgpu::SurfaceError::Lost, true),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            surface_error_action(&wgpu::SurfaceError::Outdated, true),
            SurfaceErrorAction::Reconfigured
        );
    }

    #[test]
    fn minimised_window_skips_instead_of_reconfiguring() {
        assert_eq!(
            surface_error_action(&wgpu::SurfaceError::Outdated, false),
            SurfaceErrorAction::SkipFrame
        );
        assert_eq!(
            surface_error_action(&wgpu::SurfaceError::Lost, false),
            SurfaceErrorAction::SkipFrame
        );
    }

    #[test]
    fn transient_errors_skip_the_frame() {
        for has_size in [true, false] {
            assert_eq!(
                surface_error_action(&wgpu::SurfaceError::Timeout, has_size),
                SurfaceErrorAction::SkipFrame
            );
            assert_eq!(
                surface_error_action(&wgpu::SurfaceError::Other, has_size),
                SurfaceErrorAction::SkipFrame
            );
        }
    }

    #[test]
    fn out_of_memory_is_fatal() {
        for has_size in [true, false] {
            assert_eq!(
                surface_error_action(&wgpu::SurfaceError::OutOfMemory, has_size),
                SurfaceErrorAction::Fatal
            );
        }
    }

    #[test]
    fn zero_dimension_has_no_area() {
        assert!(has_area(800, 600));
        assert!(!has_area(0, 600));
        assert!(!has_area(800, 0));
        assert!(!has_area(0, 0));
    }
}
