use std::sync::Arc;

use log::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowLevel};

use super::cursor::{CursorTarget, WinitCursorTarget};
use super::profile::{
    CapabilityRequest, ProfileCache, RenderProfile, Tier, WgpuProfileHost,
    resolve_profile,
};
use crate::error::SurfaceError;

pub const OFFSCREEN_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Clone, Debug)]
pub struct WindowRequest {
    pub title: String,
    pub resizable: bool,
    pub always_on_top: bool,
    pub opaque: bool,
}

/// Anything able to realize a native window. The window starts hidden at a
/// 1x1 placeholder size; real geometry is applied once the sketch size is
/// known.
pub trait WindowFactory {
    fn create_window(
        &self,
        request: &WindowRequest,
    ) -> Result<Arc<Window>, SurfaceError>;

    /// Cursor sink for a window this factory created. Custom bitmaps are
    /// realized through it.
    fn cursor_target<'a>(
        &'a self,
        window: &'a Window,
    ) -> Box<dyn CursorTarget + 'a>;
}

impl WindowFactory for ActiveEventLoop {
    fn create_window(
        &self,
        request: &WindowRequest,
    ) -> Result<Arc<Window>, SurfaceError> {
        let level = if request.always_on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };

        let attrs = WindowAttributes::default()
            .with_title(request.title.clone())
            .with_inner_size(PhysicalSize::new(1, 1))
            .with_visible(false)
            .with_resizable(request.resizable)
            .with_transparent(!request.opaque)
            .with_window_level(level);

        let window = ActiveEventLoop::create_window(self, attrs)
            .map_err(|err| {
                let detail = format!("failed to create window: {}", err);
                SurfaceError::Window(detail)
            })?;

        Ok(Arc::new(window))
    }

    fn cursor_target<'a>(
        &'a self,
        window: &'a Window,
    ) -> Box<dyn CursorTarget + 'a> {
        Box::new(WinitCursorTarget {
            event_loop: self,
            window,
        })
    }
}

/// The negotiated device and everything derived from the render profile.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub profile: RenderProfile,
}

impl GpuContext {
    /// Largest sample count the adapter supports for `format` that does not
    /// exceed the profile's request.
    pub fn sample_count(&self, format: wgpu::TextureFormat) -> u32 {
        let requested = self.profile.capabilities.samples.max(1);
        let color = self.adapter.get_texture_format_features(format).flags;
        let depth = self
            .depth_format()
            .map(|depth| self.adapter.get_texture_format_features(depth).flags);

        [16, 8, 4, 2]
            .into_iter()
            .filter(|count| *count <= requested)
            .find(|count| {
                color.sample_count_supported(*count)
                    && depth.is_none_or(|flags| {
                        flags.sample_count_supported(*count)
                    })
            })
            .unwrap_or(1)
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        depth_format_for(
            self.profile.capabilities.depth_bits,
            self.profile.capabilities.stencil_bits,
        )
    }

    pub fn set_profile(&mut self, profile: RenderProfile) {
        self.profile = profile;
    }
}

pub fn depth_format_for(
    depth_bits: u8,
    stencil_bits: u8,
) -> Option<wgpu::TextureFormat> {
    match (depth_bits, stencil_bits) {
        (0, 0) => None,
        (_, stencil) if stencil > 0 => {
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        }
        (depth, _) if depth > 24 => Some(wgpu::TextureFormat::Depth32Float),
        (depth, _) if depth <= 16 => Some(wgpu::TextureFormat::Depth16Unorm),
        _ => Some(wgpu::TextureFormat::Depth24Plus),
    }
}

pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor::default())
}

/// Negotiates a profile against the adapters the instance exposes and opens
/// a device on the chosen one.
pub fn create_context(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
    tier: Tier,
    request: &CapabilityRequest,
    onscreen: bool,
) -> Result<GpuContext, SurfaceError> {
    let host = WgpuProfileHost::new(instance, compatible_surface);
    let profile = resolve_profile(
        ProfileCache::global(),
        &host,
        tier,
        request,
        onscreen,
    )?;

    let adapter = host.into_adapter(&profile.resolved).ok_or_else(|| {
        SurfaceError::UnsupportedProfile(format!(
            "no adapter available for {}",
            profile.resolved
        ))
    })?;

    let (device, queue) = request_device(&adapter)?;
    info!(
        "created {} context on {}",
        if onscreen { "onscreen" } else { "offscreen" },
        profile.resolved
    );

    Ok(GpuContext {
        adapter,
        device: Arc::new(device),
        queue: Arc::new(queue),
        profile,
    })
}

pub fn request_device(
    adapter: &wgpu::Adapter,
) -> Result<(wgpu::Device, wgpu::Queue), SurfaceError> {
    let limits = wgpu::Limits::downlevel_webgl2_defaults()
        .using_resolution(adapter.limits());

    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("easel-device"),
        required_features: wgpu::Features::empty(),
        required_limits: limits,
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::default(),
    }))
    .map_err(|err| SurfaceError::Context(err.to_string()))
}

/// A non-visible render target bound to a context.
pub struct OffscreenDrawable {
    pub texture: wgpu::Texture,
    pub format: wgpu::TextureFormat,
    pub size: [u32; 2],
}

pub fn create_offscreen_drawable(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> OffscreenDrawable {
    let size = [width.max(1), height.max(1)];
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("easel-offscreen-drawable"),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    debug!("created {}x{} offscreen drawable", size[0], size[1]);

    OffscreenDrawable {
        texture,
        format: OFFSCREEN_FORMAT,
        size,
    }
}

pub fn surface_configuration(
    gpu: &GpuContext,
    surface: &wgpu::Surface<'_>,
    physical: [u32; 2],
) -> Result<wgpu::SurfaceConfiguration, SurfaceError> {
    let caps = surface.get_capabilities(&gpu.adapter);
    let format = choose_surface_format(&caps.formats).ok_or_else(|| {
        SurfaceError::Context("surface has no supported formats".to_string())
    })?;

    let opaque = gpu.profile.capabilities.background_opaque;
    let alpha_mode = caps
        .alpha_modes
        .iter()
        .copied()
        .find(|mode| {
            if opaque {
                *mode == wgpu::CompositeAlphaMode::Opaque
            } else {
                matches!(
                    mode,
                    wgpu::CompositeAlphaMode::PreMultiplied
                        | wgpu::CompositeAlphaMode::PostMultiplied
                )
            }
        })
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: physical[0].max(1),
        height: physical[1].max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    })
}

fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| *f == wgpu::TextureFormat::Bgra8UnormSrgb)
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_formats_follow_requested_bits() {
        assert_eq!(depth_format_for(0, 0), None);
        assert_eq!(
            depth_format_for(24, 8),
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        );
        assert_eq!(
            depth_format_for(24, 0),
            Some(wgpu::TextureFormat::Depth24Plus)
        );
        assert_eq!(
            depth_format_for(16, 0),
            Some(wgpu::TextureFormat::Depth16Unorm)
        );
        assert_eq!(
            depth_format_for(32, 0),
            Some(wgpu::TextureFormat::Depth32Float)
        );
    }

    #[test]
    fn prefers_srgb_bgra_surface() {
        let formats = [
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(
            choose_surface_format(&formats),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(choose_surface_format(&[]), None);
    }
}
