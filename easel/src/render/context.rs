use std::sync::Arc;

use log::{debug, warn};
use winit::window::Window;

use super::capture::{self, Capture};
use super::frame::{Frame, FrameAttachments};
use super::renderer::{Renderer, TargetInfo};
use crate::error::{FrameError, SurfaceError};
use crate::runtime::pacer::FrameTarget;
use crate::surface::SurfaceTarget;
use crate::surface::factory::{
    GpuContext, OffscreenDrawable, create_offscreen_drawable,
};
use crate::surface::geometry::Resize;

pub enum RenderTarget {
    Window {
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen(OffscreenDrawable),
}

impl RenderTarget {
    fn format(&self) -> wgpu::TextureFormat {
        match self {
            RenderTarget::Window { config, .. } => config.format,
            RenderTarget::Offscreen(drawable) => drawable.format,
        }
    }

    fn size(&self) -> [u32; 2] {
        match self {
            RenderTarget::Window { config, .. } => {
                [config.width, config.height]
            }
            RenderTarget::Offscreen(drawable) => drawable.size,
        }
    }
}

/// The context-owning half of a GPU surface: device, render target and the
/// renderer bound to them. Lives on whichever thread currently owns the
/// context, which is the pacer thread while animating.
pub struct RenderContext<R: Renderer> {
    gpu: GpuContext,
    target: RenderTarget,
    renderer: R,
    info: TargetInfo,
    msaa: Option<wgpu::Texture>,
    depth: Option<wgpu::Texture>,
    frames: u64,
}

impl<R: Renderer> RenderContext<R> {
    /// Binds `renderer` to the context before returning, so pipelines and
    /// capability queries are ready before the first frame.
    pub fn new(
        gpu: GpuContext,
        target: RenderTarget,
        mut renderer: R,
        logical: [u32; 2],
        scale: f64,
    ) -> Result<Self, SurfaceError> {
        let format = target.format();
        let info = TargetInfo {
            format,
            depth_format: gpu.depth_format(),
            sample_count: gpu.sample_count(format),
            logical,
            physical: target.size(),
            scale,
        };

        renderer
            .bind_to_context(&gpu, &info)
            .map_err(SurfaceError::Context)?;

        let mut context = Self {
            gpu,
            target,
            renderer,
            info,
            msaa: None,
            depth: None,
            frames: 0,
        };
        context.rebuild_attachments();

        debug!(
            "render context ready: {:?} {}x{} with {} sample(s)",
            info.format, info.physical[0], info.physical[1], info.sample_count
        );

        Ok(context)
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn target_info(&self) -> TargetInfo {
        self.info
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        match &self.target {
            RenderTarget::Window { window, .. } => Some(window),
            RenderTarget::Offscreen(_) => None,
        }
    }

    /// Resizes the backing buffer and informs the renderer. Runs on the
    /// context-owning thread so no frame sees a partial resize.
    pub fn resize(&mut self, resize: &Resize) {
        let physical = resize.physical;

        match &mut self.target {
            RenderTarget::Window {
                surface, config, ..
            } => {
                config.width = physical[0].max(1);
                config.height = physical[1].max(1);
                surface.configure(self.gpu.device.as_ref(), config);
            }
            RenderTarget::Offscreen(drawable) => {
                *drawable = create_offscreen_drawable(
                    self.gpu.device.as_ref(),
                    physical[0],
                    physical[1],
                );
            }
        }

        self.info.logical = resize.logical;
        self.info.physical = self.target.size();
        self.info.scale = resize.scale;
        self.rebuild_attachments();
        self.renderer.set_size(&self.info);
    }

    /// Rebuilds the capability descriptor for a new smoothing level and
    /// rebinds the renderer when the effective sample count changes.
    /// Returns the sample count now in use. If the renderer rejects the new
    /// level, the previous profile and attachments stay in effect.
    pub fn set_smooth(&mut self, smooth: u32) -> Result<u32, String> {
        let previous = self.gpu.profile.clone();
        self.gpu.set_profile(previous.with_smoothing(smooth));

        let samples = self.gpu.sample_count(self.info.format);
        if samples == self.info.sample_count {
            return Ok(samples);
        }

        let info = TargetInfo {
            sample_count: samples,
            ..self.info
        };
        if let Err(err) = self.renderer.bind_to_context(&self.gpu, &info) {
            self.gpu.set_profile(previous);
            if let Err(again) =
                self.renderer.bind_to_context(&self.gpu, &self.info)
            {
                warn!("renderer could not rebind after smooth(): {}", again);
            }
            return Err(err);
        }

        self.info = info;
        self.rebuild_attachments();
        debug!("sample count changed to {}", samples);
        Ok(samples)
    }

    /// Reads back the offscreen drawable.
    pub fn read_pixels(&self) -> Result<Capture, String> {
        match &self.target {
            RenderTarget::Offscreen(drawable) => capture::read_texture(
                self.gpu.device.as_ref(),
                self.gpu.queue.as_ref(),
                &drawable.texture,
            ),
            RenderTarget::Window { .. } => {
                Err("pixel readback is only available offscreen".to_string())
            }
        }
    }

    fn rebuild_attachments(&mut self) {
        let [width, height] = self.info.physical;
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let samples = self.info.sample_count;
        let device = self.gpu.device.as_ref();

        self.msaa = (samples > 1).then(|| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("easel-msaa-color"),
                size,
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format: self.info.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });

        self.depth = self.info.depth_format.map(|format| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("easel-depth-stencil"),
                size,
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        });
    }

    fn render_frame(&mut self) -> Result<(), FrameError> {
        if self.renderer.exit_requested() {
            return Err(FrameError::Shutdown);
        }

        let (output, view) = match &self.target {
            RenderTarget::Window {
                surface, config, ..
            } => match surface.get_current_texture() {
                Ok(output) => {
                    let view = output
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    (Some(output), view)
                }
                Err(
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                ) => {
                    surface.configure(self.gpu.device.as_ref(), config);
                    return Ok(());
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    warn!("timed out acquiring frame, skipping");
                    return Ok(());
                }
                Err(err) => {
                    return Err(FrameError::Failed(format!(
                        "failed to acquire frame: {}",
                        err
                    )));
                }
            },
            RenderTarget::Offscreen(drawable) => (
                None,
                drawable
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default()),
            ),
        };

        let depth_view = self.depth.as_ref().map(|depth| {
            depth.create_view(&wgpu::TextureViewDescriptor::default())
        });
        let attachments = match self.msaa.as_ref() {
            Some(msaa) => FrameAttachments {
                color_view: msaa
                    .create_view(&wgpu::TextureViewDescriptor::default()),
                resolve_view: Some(view),
                depth_view,
            },
            None => FrameAttachments {
                color_view: view,
                resolve_view: None,
                depth_view,
            },
        };

        let mut frame = Frame::new(
            self.gpu.device.as_ref(),
            self.gpu.queue.clone(),
            attachments,
            output,
            self.info,
            self.frames,
        );

        self.renderer
            .draw_frame(&mut frame)
            .map_err(FrameError::Failed)?;
        frame.submit();
        self.frames += 1;

        Ok(())
    }
}

impl<R: Renderer> SurfaceTarget for RenderContext<R> {
    fn resize(&mut self, resize: &Resize) {
        RenderContext::resize(self, resize);
    }
}

impl<R: Renderer> FrameTarget for RenderContext<R> {
    fn produce_frame(&mut self) -> Result<(), FrameError> {
        self.render_frame()
    }
}
