use std::sync::Arc;

use log::info;

use super::factory::{
    WindowFactory, WindowRequest, create_context, create_instance,
    create_offscreen_drawable, surface_configuration,
};
use super::{
    NativeHandle, RendererKind, SizeProvider, Surface, SurfaceCore,
    SurfaceTarget, sketch_request,
};
use crate::error::SurfaceError;
use crate::framework::config::SurfaceConfig;
use crate::render::capture::Capture;
use crate::render::context::{RenderContext, RenderTarget};
use crate::render::renderer::Renderer;

/// Hardware-accelerated surface: a winit window with a wgpu swapchain, or
/// an offscreen wgpu texture.
pub struct GpuSurface<R: Renderer> {
    core: SurfaceCore<RenderContext<R>>,
    renderer: Option<R>,
    instance: Option<wgpu::Instance>,
    device: Option<Arc<wgpu::Device>>,
}

impl<R: Renderer> GpuSurface<R> {
    pub fn new(config: SurfaceConfig, renderer: R) -> Self {
        Self {
            core: SurfaceCore::new(config),
            renderer: Some(renderer),
            instance: None,
            device: None,
        }
    }

    /// Changes the smoothing level of the live context without
    /// renegotiating its tier. Returns the sample count now in use.
    pub fn set_smooth(&mut self, smooth: u32) -> Result<u32, SurfaceError> {
        let samples = self
            .render(move |context| context.set_smooth(smooth))?
            .map_err(SurfaceError::Context)?;
        self.core.config_mut().smooth = smooth;
        Ok(samples)
    }

    /// Reads back the offscreen drawable as RGBA.
    pub fn read_pixels(&self) -> Result<Capture, SurfaceError> {
        self.render(|context| context.read_pixels())?
            .map_err(SurfaceError::Context)
    }

    fn take_renderer(&mut self) -> Result<R, SurfaceError> {
        self.renderer.take().ok_or_else(|| {
            SurfaceError::Context(
                "renderer is already bound to a context".to_string(),
            )
        })
    }

    fn instance(&mut self) -> wgpu::Instance {
        self.instance.get_or_insert_with(create_instance).clone()
    }
}

impl<R: Renderer> Surface for GpuSurface<R> {
    type Target = RenderContext<R>;

    fn core(&self) -> &SurfaceCore<Self::Target> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SurfaceCore<Self::Target> {
        &mut self.core
    }

    fn kind(&self) -> RendererKind {
        RendererKind::Accelerated
    }

    fn init_offscreen(
        &mut self,
        size: &dyn SizeProvider,
    ) -> Result<(), SurfaceError> {
        let instance = self.instance();
        let renderer = self.take_renderer()?;
        let context =
            open_offscreen(&mut self.core, &instance, size, renderer)?;

        self.device = Some(context.gpu().device.clone());
        self.core.bind(context);
        Ok(())
    }

    fn init_onscreen(
        &mut self,
        size: &dyn SizeProvider,
        factory: &dyn WindowFactory,
    ) -> Result<(), SurfaceError> {
        let instance = self.instance();
        let renderer = self.take_renderer()?;
        let context =
            open_onscreen(&mut self.core, &instance, size, factory, renderer)?;

        self.device = Some(context.gpu().device.clone());
        self.core.present(context)
    }

    fn native_handle(&self) -> NativeHandle {
        if let Some(window) = self.core.window() {
            return NativeHandle::Window(window.clone());
        }

        match self.device.as_ref() {
            Some(device) => NativeHandle::Device(device.clone()),
            None => NativeHandle::None,
        }
    }
}

/// Creates the window, negotiates a context compatible with it and binds
/// `renderer`. Geometry is settled from the sketch size before the
/// swapchain is configured so the first frame is full size.
pub(crate) fn open_onscreen<R: Renderer, T: SurfaceTarget>(
    core: &mut SurfaceCore<T>,
    instance: &wgpu::Instance,
    size: &dyn SizeProvider,
    factory: &dyn WindowFactory,
    renderer: R,
) -> Result<RenderContext<R>, SurfaceError> {
    let config = core.config().clone();
    let window = factory.create_window(&WindowRequest {
        title: config.title.clone(),
        resizable: config.resizable,
        always_on_top: config.always_on_top,
        opaque: true,
    })?;

    let surface = instance
        .create_surface(window.clone())
        .map_err(|err| SurfaceError::Context(err.to_string()))?;
    let request = sketch_request(renderer.requested_capabilities(), size);
    let gpu =
        create_context(instance, Some(&surface), config.tier, &request, true)?;

    core.attach_window(window.clone(), factory);
    let resize = core.prepare(size);
    core.fit_window(&resize);

    let surface_config =
        surface_configuration(&gpu, &surface, resize.physical)?;
    surface.configure(gpu.device.as_ref(), &surface_config);

    info!(
        "opened {}x{} window at scale {}",
        resize.logical[0], resize.logical[1], resize.scale
    );

    RenderContext::new(
        gpu,
        RenderTarget::Window {
            window,
            surface,
            config: surface_config,
        },
        renderer,
        resize.logical,
        resize.scale,
    )
}

/// Negotiates a context with no window and binds `renderer` to an
/// offscreen drawable. Binding runs the renderer's context setup
/// synchronously, before the drawable is handed out.
pub(crate) fn open_offscreen<R: Renderer, T: SurfaceTarget>(
    core: &mut SurfaceCore<T>,
    instance: &wgpu::Instance,
    size: &dyn SizeProvider,
    renderer: R,
) -> Result<RenderContext<R>, SurfaceError> {
    let tier = core.config().tier;
    let request = sketch_request(renderer.requested_capabilities(), size);
    let gpu = create_context(instance, None, tier, &request, false)?;

    let resize = core.prepare(size);
    let drawable = create_offscreen_drawable(
        gpu.device.as_ref(),
        resize.physical[0],
        resize.physical[1],
    );

    RenderContext::new(
        gpu,
        RenderTarget::Offscreen(drawable),
        renderer,
        resize.logical,
        resize.scale,
    )
}
