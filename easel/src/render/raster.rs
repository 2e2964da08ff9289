use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use super::blit::Blit;
use super::capture::Capture;
use super::frame::Frame;
use super::renderer::{CapabilityRequest, Renderer, TargetInfo};
use crate::error::FrameError;
use crate::runtime::pacer::FrameTarget;
use crate::surface::SurfaceTarget;
use crate::surface::factory::GpuContext;
use crate::surface::geometry::Resize;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(value: u8) -> Self {
        Self::new(value, value, value, 255)
    }
}

/// CPU-side framebuffer drawn by software renderers, in physical pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    scale: f64,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, scale: f64) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            scale,
            pixels: vec![Rgba::BLACK; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Physical pixels per logical unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Resizes, discarding previous contents.
    pub fn resize(&mut self, width: u32, height: u32, scale: f64) {
        *self = Self::new(width, height, scale);
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn set(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64
        {
            return;
        }
        let index = (y as u32 * self.width + x as u32) as usize;
        self.pixels[index] = color;
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Fills a rectangle given in logical units, clipped to the buffer.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba) {
        let x0 = ((x * self.scale).floor() as i64).max(0);
        let y0 = ((y * self.scale).floor() as i64).max(0);
        let x1 = (((x + w) * self.scale).ceil() as i64).min(self.width as i64);
        let y1 = (((y + h) * self.scale).ceil() as i64).min(self.height as i64);

        for py in y0..y1 {
            let row = (py as u32 * self.width) as usize;
            for px in x0..x1 {
                self.pixels[row + px as usize] = color;
            }
        }
    }

    pub fn to_capture(&self) -> Capture {
        Capture {
            width: self.width,
            height: self.height,
            rgba: self.as_bytes().to_vec(),
        }
    }
}

/// A renderer that draws on the CPU into a [`PixelBuffer`].
pub trait RasterRenderer: Send + 'static {
    fn setup(&mut self, _canvas: &mut PixelBuffer) {}

    fn resized(&mut self, _canvas: &mut PixelBuffer) {}

    fn draw(&mut self, canvas: &mut PixelBuffer) -> Result<(), String>;

    fn exit_requested(&self) -> bool {
        false
    }
}

/// Headless software target: the pacer drives the raster renderer with no
/// window and no GPU.
pub struct RasterTarget<R: RasterRenderer> {
    renderer: R,
    canvas: PixelBuffer,
    frames: u64,
}

impl<R: RasterRenderer> RasterTarget<R> {
    pub fn new(mut renderer: R, width: u32, height: u32, scale: f64) -> Self {
        let mut canvas = PixelBuffer::new(width, height, scale);
        renderer.setup(&mut canvas);
        Self {
            renderer,
            canvas,
            frames: 0,
        }
    }

    pub fn canvas(&self) -> &PixelBuffer {
        &self.canvas
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn resize_canvas(&mut self, physical: [u32; 2], scale: f64) {
        self.canvas.resize(physical[0], physical[1], scale);
        self.renderer.resized(&mut self.canvas);
    }

    pub fn read_pixels(&self) -> Capture {
        self.canvas.to_capture()
    }
}

impl<R: RasterRenderer> SurfaceTarget for RasterTarget<R> {
    fn resize(&mut self, resize: &Resize) {
        self.resize_canvas(resize.physical, resize.scale);
    }
}

impl<R: RasterRenderer> FrameTarget for RasterTarget<R> {
    fn produce_frame(&mut self) -> Result<(), FrameError> {
        if self.renderer.exit_requested() {
            return Err(FrameError::Shutdown);
        }

        self.renderer
            .draw(&mut self.canvas)
            .map_err(FrameError::Failed)?;
        self.frames += 1;
        Ok(())
    }
}

struct Upload {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Presents a software renderer through the accelerated path: the pixel
/// buffer is uploaded each frame and blitted over the window.
pub struct RasterBridge<R: RasterRenderer> {
    target: RasterTarget<R>,
    device: Option<Arc<wgpu::Device>>,
    queue: Option<Arc<wgpu::Queue>>,
    blit: Option<Blit>,
    upload: Option<Upload>,
}

impl<R: RasterRenderer> RasterBridge<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            target: RasterTarget::new(renderer, 1, 1, 1.0),
            device: None,
            queue: None,
            blit: None,
            upload: None,
        }
    }

    pub fn raster(&self) -> &RasterTarget<R> {
        &self.target
    }

    pub fn raster_mut(&mut self) -> &mut RasterTarget<R> {
        &mut self.target
    }

    fn rebuild_upload(&mut self) {
        let (Some(device), Some(blit)) =
            (self.device.as_ref(), self.blit.as_ref())
        else {
            return;
        };

        let canvas = self.target.canvas();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("easel-raster-upload"),
            size: wgpu::Extent3d {
                width: canvas.width(),
                height: canvas.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = blit.bind_group(device, &view);

        self.upload = Some(Upload {
            texture,
            bind_group,
        });
    }
}

impl<R: RasterRenderer> Renderer for RasterBridge<R> {
    fn requested_capabilities(&self) -> CapabilityRequest {
        CapabilityRequest {
            depth_bits: 0,
            stencil_bits: 0,
            smooth: 0,
            ..CapabilityRequest::default()
        }
    }

    fn bind_to_context(
        &mut self,
        gpu: &GpuContext,
        target: &TargetInfo,
    ) -> Result<(), String> {
        self.blit = Some(Blit::new(gpu.device.as_ref(), target)?);
        self.device = Some(gpu.device.clone());
        self.queue = Some(gpu.queue.clone());

        let canvas = self.target.canvas();
        if [canvas.width(), canvas.height()] != target.physical {
            self.target.resize_canvas(target.physical, target.scale);
        }
        self.rebuild_upload();
        Ok(())
    }

    fn set_size(&mut self, target: &TargetInfo) {
        self.target.resize_canvas(target.physical, target.scale);
        self.rebuild_upload();
    }

    fn draw_frame(&mut self, frame: &mut Frame) -> Result<(), String> {
        self.target.produce_frame().map_err(|err| err.to_string())?;

        let (Some(queue), Some(blit), Some(upload)) =
            (self.queue.as_ref(), self.blit.as_ref(), self.upload.as_ref())
        else {
            return Err("raster bridge is not bound to a context".to_string());
        };

        let canvas = self.target.canvas();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &upload.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            canvas.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(canvas.width() * 4),
                rows_per_image: Some(canvas.height()),
            },
            wgpu::Extent3d {
                width: canvas.width(),
                height: canvas.height(),
                depth_or_array_layers: 1,
            },
        );

        let mut pass = frame.begin_pass(Some(wgpu::Color::BLACK));
        blit.draw(&mut pass, &upload.bind_group);
        Ok(())
    }

    fn exit_requested(&self) -> bool {
        self.target.renderer().exit_requested()
    }
}
