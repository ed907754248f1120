//! Off-screen rendering for golden image tests.
//!
//! Renders one frame into a texture instead of a window surface and copies it
//! back into an [`image::RgbaImage`]. Needs a GPU adapter but no display.

use std::{iter, time::Duration};

use anyhow::{Context as _, bail};

use crate::{
    animation::ScaleOscillator, config::Config, context::request_device,
    pipelines::triangle::TrianglePipeline, shader::ShaderPair,
};

pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Draw the triangle at the configured initial scale into a `width` x `height` image.
pub async fn render_to_image(
    config: &Config,
    width: u32,
    height: u32,
) -> anyhow::Result<image::RgbaImage> {
    config.validate()?;
    if width == 0 || height == 0 {
        bail!("cannot capture a {}x{} image", width, height);
    }
    let shaders = ShaderPair::load(&config.shaders)?;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("no GPU adapter available for off-screen rendering")?;
    let (device, queue) = request_device(&adapter).await?;

    let oscillator = ScaleOscillator::from(config.scale);
    let triangle = TrianglePipeline::new(&device, CAPTURE_FORMAT, &shaders, oscillator.uniform());

    let extent3d = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Capture texture"),
        size: extent3d,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CAPTURE_FORMAT,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Rows of a texture copy have to be aligned to 256 bytes
    let u32_size = std::mem::size_of::<u32>() as u32;
    let unpadded_bytes_per_row = u32_size * width;
    let padded_bytes_per_row = padded_row(unpadded_bytes_per_row);
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Capture readback buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Capture Encoder"),
    });
    triangle.draw(&mut encoder, &view, config.clear_colour);
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent3d,
    );
    queue.submit(iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .context("GPU did not finish the capture in time")?;
    rx.receive()
        .await
        .context("readback channel closed before the buffer was mapped")?
        .context("failed to map the readback buffer")?;

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        strip_row_padding(&data, unpadded_bytes_per_row, padded_bytes_per_row, height)
    };
    output_buffer.unmap();

    image::RgbaImage::from_raw(width, height, pixels)
        .context("readback size does not match the requested image")
}

fn padded_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn strip_row_padding(data: &[u8], unpadded: u32, padded: u32, rows: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((unpadded * rows) as usize);
    for row in data.chunks(padded as usize).take(rows as usize) {
        pixels.extend_from_slice(&row[..unpadded as usize]);
    }
    pixels
}
