//! Runtime configuration.
//!
//! Everything the program needs to know before opening a window: the window
//! itself, where the two shader stages live on disk, the clear colour and the
//! bounds of the scale animation. There is no file format; callers start from
//! [`Config::default`] and override single values with the `with_*` methods.

use std::path::PathBuf;

use anyhow::ensure;

/// Window title, size in physical pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "OpenGL Test Window".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Paths of the vertex and fragment shader sources, relative to the working directory.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/shader.vert.wgsl"),
            fragment: PathBuf::from("shaders/shader.frag.wgsl"),
        }
    }
}

/// Bounds and per-frame step of the ping-pong scale animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleConfig {
    pub initial: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            initial: 0.5,
            min: 0.25,
            max: 1.0,
            step: 0.005,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub window: WindowConfig,
    pub shaders: ShaderPaths,
    pub clear_colour: wgpu::Color,
    pub scale: ScaleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            shaders: ShaderPaths::default(),
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            scale: ScaleConfig::default(),
        }
    }
}

impl Config {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    pub fn with_shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.shaders = ShaderPaths {
            vertex: vertex.into(),
            fragment: fragment.into(),
        };
        self
    }

    pub fn with_clear_colour(mut self, clear_colour: wgpu::Color) -> Self {
        self.clear_colour = clear_colour;
        self
    }

    pub fn with_scale(mut self, scale: ScaleConfig) -> Self {
        self.scale = scale;
        self
    }

    /// Reject values the renderer cannot work with.
    ///
    /// Called once by [`crate::app::run`] before the event loop starts so a bad
    /// configuration fails early instead of on the first frame.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.window.title.is_empty(), "window title must not be empty");
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window size must be non-zero, got {}x{}",
            self.window.width,
            self.window.height
        );
        let ScaleConfig {
            initial,
            min,
            max,
            step,
        } = self.scale;
        ensure!(
            min.is_finite() && max.is_finite() && min < max,
            "scale bounds must satisfy min < max, got [{}, {}]",
            min,
            max
        );
        ensure!(
            step.is_finite() && step > 0.0,
            "scale step must be positive, got {}",
            step
        );
        ensure!(
            (min..=max).contains(&initial),
            "initial scale {} is outside [{}, {}]",
            initial,
            min,
            max
        );
        Ok(())
    }
}
