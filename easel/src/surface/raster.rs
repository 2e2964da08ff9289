use super::accelerated::open_onscreen;
use super::factory::{WindowFactory, create_instance};
use super::geometry::Resize;
use super::{
    NativeHandle, RendererKind, SizeProvider, Surface, SurfaceCore,
    SurfaceTarget,
};
use crate::error::{FrameError, SurfaceError};
use crate::framework::config::SurfaceConfig;
use crate::render::capture::Capture;
use crate::render::context::RenderContext;
use crate::render::raster::{
    PixelBuffer, RasterBridge, RasterRenderer, RasterTarget,
};
use crate::runtime::pacer::FrameTarget;

/// The context of a software surface. Onscreen, the pixel buffer is
/// presented through a GPU blit; offscreen, nothing leaves the CPU.
pub enum RasterContext<R: RasterRenderer> {
    Presented(RenderContext<RasterBridge<R>>),
    Cpu(RasterTarget<R>),
}

impl<R: RasterRenderer> RasterContext<R> {
    fn raster(&self) -> &RasterTarget<R> {
        match self {
            RasterContext::Presented(context) => context.renderer().raster(),
            RasterContext::Cpu(target) => target,
        }
    }

    fn raster_mut(&mut self) -> &mut RasterTarget<R> {
        match self {
            RasterContext::Presented(context) => {
                context.renderer_mut().raster_mut()
            }
            RasterContext::Cpu(target) => target,
        }
    }

    pub fn canvas(&self) -> &PixelBuffer {
        self.raster().canvas()
    }

    pub fn renderer(&self) -> &R {
        self.raster().renderer()
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        self.raster_mut().renderer_mut()
    }

    pub fn frame_count(&self) -> u64 {
        self.raster().frame_count()
    }

    pub fn read_pixels(&self) -> Capture {
        self.raster().read_pixels()
    }
}

impl<R: RasterRenderer> FrameTarget for RasterContext<R> {
    fn produce_frame(&mut self) -> Result<(), FrameError> {
        match self {
            RasterContext::Presented(context) => context.produce_frame(),
            RasterContext::Cpu(target) => target.produce_frame(),
        }
    }
}

impl<R: RasterRenderer> SurfaceTarget for RasterContext<R> {
    fn resize(&mut self, resize: &Resize) {
        match self {
            RasterContext::Presented(context) => context.resize(resize),
            RasterContext::Cpu(target) => {
                target.resize_canvas(resize.physical, resize.scale)
            }
        }
    }
}

/// Software surface: a [`RasterRenderer`] draws into a CPU pixel buffer.
pub struct RasterSurface<R: RasterRenderer> {
    core: SurfaceCore<RasterContext<R>>,
    renderer: Option<R>,
}

impl<R: RasterRenderer> RasterSurface<R> {
    pub fn new(config: SurfaceConfig, renderer: R) -> Self {
        Self {
            core: SurfaceCore::new(config),
            renderer: Some(renderer),
        }
    }

    /// Copies the current pixel buffer. Works onscreen too, since the
    /// buffer is the source of every presented frame.
    pub fn read_pixels(&self) -> Result<Capture, SurfaceError> {
        self.render(|context| context.read_pixels())
    }

    fn take_renderer(&mut self) -> Result<R, SurfaceError> {
        self.renderer.take().ok_or_else(|| {
            SurfaceError::Context(
                "renderer is already bound to a context".to_string(),
            )
        })
    }
}

impl<R: RasterRenderer> Surface for RasterSurface<R> {
    type Target = RasterContext<R>;

    fn core(&self) -> &SurfaceCore<Self::Target> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SurfaceCore<Self::Target> {
        &mut self.core
    }

    fn kind(&self) -> RendererKind {
        RendererKind::Software
    }

    fn init_offscreen(
        &mut self,
        size: &dyn SizeProvider,
    ) -> Result<(), SurfaceError> {
        let renderer = self.take_renderer()?;
        let resize = self.core.prepare(size);
        let [width, height] = resize.physical;
        let target = RasterTarget::new(renderer, width, height, resize.scale);

        self.core.bind(RasterContext::Cpu(target));
        Ok(())
    }

    fn init_onscreen(
        &mut self,
        size: &dyn SizeProvider,
        factory: &dyn WindowFactory,
    ) -> Result<(), SurfaceError> {
        let renderer = self.take_renderer()?;
        let instance = create_instance();
        let context = open_onscreen(
            &mut self.core,
            &instance,
            size,
            factory,
            RasterBridge::new(renderer),
        )?;

        self.core.present(RasterContext::Presented(context))
    }

    fn native_handle(&self) -> NativeHandle {
        match self.core.window() {
            Some(window) => NativeHandle::Window(window.clone()),
            None => NativeHandle::None,
        }
    }
}
