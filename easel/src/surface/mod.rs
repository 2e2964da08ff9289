//! The surface contract and the state every backend shares: pacer,
//! geometry, window and cursor.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Icon, Window, WindowLevel};

use crate::error::{FrameError, SurfaceError};
use crate::framework::config::SurfaceConfig;
use crate::runtime::pacer::{ContextHandle, FramePacer, FrameTarget};
use crate::runtime::relay::FaultHandler;
use cursor::{
    CursorImage, CursorKind, CursorManager, CursorSpec, CursorTarget,
    WinitCursorTarget,
};
use factory::WindowFactory;
use geometry::{Geometry, Resize};
use profile::CapabilityRequest;

pub mod accelerated;
pub mod cursor;
pub mod factory;
pub mod geometry;
pub mod headless;
pub mod profile;
pub mod raster;

pub use accelerated::GpuSurface;
pub use headless::HeadlessSurface;
pub use raster::{RasterContext, RasterSurface};

/// Backend family, chosen once when the surface is constructed.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    #[default]
    Accelerated,
    Software,
    Headless,
}

/// The application's declared sketch dimensions.
pub trait SizeProvider {
    fn sketch_width(&self) -> u32;
    fn sketch_height(&self) -> u32;
    fn sketch_pixel_density(&self) -> u32;
    fn sketch_smooth(&self) -> u32;
}

/// Combines a renderer's pixel-format request with the sketch's smoothing
/// and density. A renderer asking for no multisampling keeps it off.
pub fn sketch_request(
    renderer: CapabilityRequest,
    size: &dyn SizeProvider,
) -> CapabilityRequest {
    CapabilityRequest {
        smooth: if renderer.smooth == 0 {
            0
        } else {
            size.sketch_smooth()
        },
        pixel_density: size.sketch_pixel_density().max(1),
        ..renderer
    }
}

/// A frame target that also owns the output size of its context.
pub trait SurfaceTarget: FrameTarget {
    fn resize(&mut self, _resize: &Resize) {}
}

/// Backend-specific and deliberately opaque to the rest of the runtime.
#[derive(Clone, Debug, Default)]
pub enum NativeHandle {
    #[default]
    None,
    Window(Arc<Window>),
    Device(Arc<wgpu::Device>),
}

// Cursor sink used while no window exists; state is still tracked.
struct Detached;

impl CursorTarget for Detached {
    fn apply_cursor(&mut self, _cursor: &CursorSpec) {}

    fn set_cursor_visible(&mut self, _visible: bool) {}
}

/// State shared by every surface backend.
pub struct SurfaceCore<T: SurfaceTarget> {
    pacer: FramePacer<T>,
    geometry: Geometry,
    window: Option<Arc<Window>>,
    cursor: CursorManager,
    config: SurfaceConfig,
}

impl<T: SurfaceTarget> SurfaceCore<T> {
    pub fn new(config: SurfaceConfig) -> Self {
        let mut geometry = Geometry::new(config.pixel_density);
        geometry.set_resizable(config.resizable);
        geometry.set_external(config.external);

        Self {
            pacer: FramePacer::new(),
            geometry,
            window: None,
            cursor: CursorManager::default(),
            config,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut SurfaceConfig {
        &mut self.config
    }

    pub fn pacer(&self) -> &FramePacer<T> {
        &self.pacer
    }

    pub fn pacer_mut(&mut self) -> &mut FramePacer<T> {
        &mut self.pacer
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    pub fn cursor(&self) -> &CursorManager {
        &self.cursor
    }

    /// Resets geometry for a new drawable and applies the sketch size to
    /// it. The returned resize is what the context must be created with.
    pub fn prepare(&mut self, size: &dyn SizeProvider) -> Resize {
        let mut geometry = Geometry::new(size.sketch_pixel_density());
        geometry.set_resizable(self.config.resizable);
        geometry.set_external(self.config.external);
        self.geometry = geometry;

        let scale = self.pixel_scale();
        let width = size.sketch_width() as i32;
        let height = size.sketch_height() as i32;

        match self.geometry.set_size(width, height, scale) {
            Some(resize) => resize,
            None => Resize {
                logical: self.geometry.logical_size(),
                physical: self.geometry.physical_size(),
                scale: self.geometry.scale(),
                resize_window: !self.geometry.is_external(),
            },
        }
    }

    /// Takes ownership of a freshly created window and puts the tracked
    /// cursor state on it, custom bitmaps included.
    pub fn attach_window(
        &mut self,
        window: Arc<Window>,
        factory: &dyn WindowFactory,
    ) {
        self.cursor.reapply(factory.cursor_target(&window).as_mut());
        self.window = Some(window);
    }

    /// Installs the context and starts animating at the configured rate.
    pub fn launch(&mut self, target: T) -> Result<(), SurfaceError> {
        self.bind(target);
        self.pacer.set_frame_rate(self.config.frame_rate)?;
        self.pacer.start()?;
        Ok(())
    }

    pub fn bind(&mut self, target: T) {
        if self.pacer.bind(target).is_some() {
            debug!("replaced a previously bound context");
        }
    }

    pub fn set_fault_handler(&mut self, handler: FaultHandler) {
        self.pacer.set_fault_handler(handler);
    }

    /// Physical pixels per logical unit, queried live from the window
    /// since it may have moved to a display of another density.
    pub fn pixel_scale(&self) -> f64 {
        let density = self.geometry.pixel_density() as f64;
        self.geometry.pixel_scale(|| match self.window.as_ref() {
            Some(window) => window.scale_factor(),
            None => density,
        })
    }

    /// Program-driven resize. Returns whether anything changed.
    pub fn set_size(
        &mut self,
        width: i32,
        height: i32,
    ) -> Result<bool, SurfaceError> {
        let scale = self.pixel_scale();
        match self.geometry.set_size(width, height, scale) {
            Some(resize) => self.apply(resize).map(|_| true),
            None => Ok(false),
        }
    }

    /// Resize reported by the window system, in physical pixels.
    pub fn window_resized(
        &mut self,
        physical: [u32; 2],
    ) -> Result<Option<Resize>, SurfaceError> {
        let scale = self.pixel_scale();
        match self.geometry.resize_from_physical(physical, scale) {
            Some(resize) => {
                self.apply(resize)?;
                Ok(Some(resize))
            }
            None => Ok(None),
        }
    }

    /// The window moved to a display with another scale; keeps the logical
    /// size and recomputes the backing buffer.
    pub fn scale_changed(&mut self) -> Result<Option<Resize>, SurfaceError> {
        let [width, height] = self.geometry.logical_size();
        let scale = self.pixel_scale();
        match self.geometry.set_size(width as i32, height as i32, scale) {
            Some(resize) => {
                self.apply(resize)?;
                Ok(Some(resize))
            }
            None => Ok(None),
        }
    }

    /// Requests the window's inner size for a settled geometry. Embedded
    /// surfaces and windows already at that size are left alone.
    pub fn fit_window(&self, resize: &Resize) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        let [width, height] = resize.physical;
        let current = window.inner_size();
        if resize.resize_window
            && [current.width, current.height] != resize.physical
        {
            let _ =
                window.request_inner_size(PhysicalSize::new(width, height));
        }
    }

    /// Places, shows and starts animating a freshly created window.
    pub fn present(&mut self, target: T) -> Result<(), SurfaceError> {
        self.place_window();
        self.set_visible(self.config.visible);
        self.launch(target)
    }

    // Pushes a settled geometry to the window, then to the context on the
    // thread that owns it.
    fn apply(&mut self, resize: Resize) -> Result<(), SurfaceError> {
        self.fit_window(&resize);

        if self.pacer.handle().is_bound() {
            self.pacer.render(move |target| target.resize(&resize))?;
        }

        debug!(
            "surface resized to {}x{} ({}x{} physical)",
            resize.logical[0],
            resize.logical[1],
            resize.physical[0],
            resize.physical[1]
        );
        Ok(())
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.geometry.set_visible(visible);
        if let Some(window) = self.window.as_ref() {
            window.set_visible(visible);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.geometry.is_visible()
    }

    pub fn set_title(&mut self, title: &str) {
        self.config.title = title.to_string();
        if let Some(window) = self.window.as_ref() {
            window.set_title(title);
        }
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.config.resizable = resizable;
        self.geometry.set_resizable(resizable);
        if let Some(window) = self.window.as_ref() {
            window.set_resizable(resizable);
        }
    }

    pub fn set_always_on_top(&mut self, always_on_top: bool) {
        self.config.always_on_top = always_on_top;
        if let Some(window) = self.window.as_ref() {
            window.set_window_level(if always_on_top {
                WindowLevel::AlwaysOnTop
            } else {
                WindowLevel::Normal
            });
        }
    }

    pub fn set_location(&mut self, x: i32, y: i32) {
        self.config.location = Some([x, y]);
        if let Some(window) = self.window.as_ref() {
            window.set_outer_position(PhysicalPosition::new(x, y));
        }
    }

    /// Moves the window to its configured location, or centers it on the
    /// current monitor when none was given.
    pub fn place_window(&self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if let Some([x, y]) = self.config.location {
            window.set_outer_position(PhysicalPosition::new(x, y));
            return;
        }

        let Some(monitor) = window
            .current_monitor()
            .or_else(|| window.primary_monitor())
        else {
            debug!("no monitor to center the window on");
            return;
        };

        let area = monitor.size();
        let origin = monitor.position();
        let size = window.outer_size();
        let x = origin.x + (area.width as i32 - size.width as i32) / 2;
        let y = origin.y + (area.height as i32 - size.height as i32) / 2;
        window.set_outer_position(PhysicalPosition::new(x, y));
    }

    pub fn set_icon(
        &mut self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<(), SurfaceError> {
        let Some(window) = self.window.as_ref() else {
            debug!("ignoring window icon, surface has no window");
            return Ok(());
        };

        let icon = Icon::from_rgba(rgba, width, height).map_err(|err| {
            SurfaceError::Window(format!("invalid window icon: {}", err))
        })?;
        window.set_window_icon(Some(icon));
        Ok(())
    }

    pub fn set_cursor(
        &mut self,
        event_loop: &ActiveEventLoop,
        kind: CursorKind,
    ) {
        match self.window.clone() {
            Some(window) => self.cursor.set_cursor(
                kind,
                &mut WinitCursorTarget {
                    event_loop,
                    window: &window,
                },
            ),
            None => self.cursor.set_cursor(kind, &mut Detached),
        }
    }

    /// Unknown codes warn and keep the current cursor.
    pub fn set_cursor_code(
        &mut self,
        event_loop: &ActiveEventLoop,
        code: i32,
    ) -> bool {
        match self.window.clone() {
            Some(window) => self.cursor.set_cursor_code(
                code,
                &mut WinitCursorTarget {
                    event_loop,
                    window: &window,
                },
            ),
            None => self.cursor.set_cursor_code(code, &mut Detached),
        }
    }

    pub fn set_custom_cursor(
        &mut self,
        event_loop: &ActiveEventLoop,
        image: CursorImage,
    ) {
        match self.window.clone() {
            Some(window) => self.cursor.set_custom_cursor(
                image,
                &mut WinitCursorTarget {
                    event_loop,
                    window: &window,
                },
            ),
            None => self.cursor.set_custom_cursor(image, &mut Detached),
        }
    }

    pub fn show_cursor(&mut self) {
        match self.window.clone() {
            Some(window) => {
                self.cursor.show_cursor(&mut VisibilityOnly(&window))
            }
            None => self.cursor.show_cursor(&mut Detached),
        }
    }

    pub fn hide_cursor(&mut self) {
        match self.window.clone() {
            Some(window) => {
                self.cursor.hide_cursor(&mut VisibilityOnly(&window))
            }
            None => self.cursor.hide_cursor(&mut Detached),
        }
    }

    /// Stops animating and releases the context and window.
    pub fn dispose(&mut self) -> Option<T> {
        let target = self.pacer.unbind();
        if let Some(window) = self.window.take() {
            window.set_visible(false);
        }
        target
    }
}

// Showing and hiding needs no event loop, only the window.
struct VisibilityOnly<'a>(&'a Window);

impl CursorTarget for VisibilityOnly<'_> {
    fn apply_cursor(&mut self, cursor: &CursorSpec) {
        if let Some(kind) = cursor.kind() {
            self.0.set_cursor(kind.system_icon());
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.0.set_cursor_visible(visible);
    }
}

/// What the runtime programs against. One implementation per backend.
pub trait Surface {
    type Target: SurfaceTarget;

    fn core(&self) -> &SurfaceCore<Self::Target>;

    fn core_mut(&mut self) -> &mut SurfaceCore<Self::Target>;

    fn kind(&self) -> RendererKind;

    /// Binds to a non-visible drawable sized from the sketch. The pacer is
    /// not started.
    fn init_offscreen(
        &mut self,
        size: &dyn SizeProvider,
    ) -> Result<(), SurfaceError>;

    /// Creates and shows a window and starts the pacer.
    fn init_onscreen(
        &mut self,
        size: &dyn SizeProvider,
        factory: &dyn WindowFactory,
    ) -> Result<(), SurfaceError>;

    fn native_handle(&self) -> NativeHandle;

    fn set_visible(&mut self, visible: bool) {
        self.core_mut().set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.core().is_visible()
    }

    fn context(&self) -> ContextHandle<Self::Target> {
        self.core().pacer().handle()
    }

    /// Runs `f` to completion on the thread that owns the context.
    fn render<R, F>(&self, f: F) -> Result<R, SurfaceError>
    where
        Self: Sized,
        F: FnOnce(&mut Self::Target) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.context().render(f)
    }

    /// Produces one frame synchronously, outside of the pacer's schedule.
    fn draw_frame(&self) -> Result<(), SurfaceError>
    where
        Self: Sized,
    {
        match self.render(|target| target.produce_frame())? {
            Ok(()) => Ok(()),
            Err(FrameError::Shutdown) => Ok(()),
            Err(FrameError::Failed(detail)) => {
                Err(SurfaceError::Context(format!("frame failed: {}", detail)))
            }
        }
    }

    fn start_thread(&mut self) -> Result<bool, SurfaceError> {
        self.core_mut().pacer_mut().start()
    }

    fn pause_thread(&self) {
        self.core().pacer().pause();
    }

    fn resume_thread(&self) {
        self.core().pacer().resume();
    }

    fn stop_thread(&mut self) -> bool {
        self.core_mut().pacer_mut().stop()
    }

    fn is_stopped(&self) -> bool {
        self.core().pacer().is_stopped()
    }

    fn set_frame_rate(&mut self, fps: f32) -> Result<f32, SurfaceError> {
        let fps = self.core_mut().pacer_mut().set_frame_rate(fps)?;
        self.core_mut().config.frame_rate = fps;
        Ok(fps)
    }

    fn set_size(
        &mut self,
        width: i32,
        height: i32,
    ) -> Result<bool, SurfaceError> {
        self.core_mut().set_size(width, height)
    }

    fn pixel_scale(&self) -> f64 {
        self.core().pixel_scale()
    }

    fn set_fault_handler(&mut self, handler: FaultHandler) {
        self.core_mut().set_fault_handler(handler);
    }
}

pub(crate) fn warn_unsupported(what: &'static str) -> SurfaceError {
    warn!("{} is not available on this surface", what);
    SurfaceError::Unsupported(what)
}
