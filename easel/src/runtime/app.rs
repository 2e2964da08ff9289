use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use super::events::{SurfaceCommand, SurfaceCommandProxy, SurfaceControl};
use super::relay::{self, FaultHandler, PacerFault};
use crate::error::SurfaceError;
use crate::framework::config::SurfaceConfig;
use crate::framework::logging;
use crate::input::winit_adapter::{
    PointerTracker, button_index, convert_modifiers, native_key,
};
use crate::input::{EventSink, InputNormalizer, NativePointer, WindowNotice};
use crate::render::raster::{RasterBridge, RasterRenderer, RasterTarget};
use crate::surface::accelerated::GpuSurface;
use crate::surface::geometry::Resize;
use crate::surface::headless::HeadlessSurface;
use crate::surface::raster::RasterSurface;
use crate::surface::{RendererKind, Surface};

// How often the loop checks whether the pacer ended on its own.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Native event loop driver for an onscreen surface: creates the window on
/// resume, routes window and input notifications, and applies commands
/// posted through [`SurfaceControl`].
pub struct OnscreenApp<S: Surface, E: EventSink> {
    surface: S,
    normalizer: InputNormalizer<E>,
    tracker: PointerTracker,
    proxy: SurfaceCommandProxy,
    window_id: Option<WindowId>,
    launched: bool,
    // Set when animation was stopped on request; the window stays open.
    halted: bool,
    fault: Arc<Mutex<Option<PacerFault>>>,
    error: Option<SurfaceError>,
}

impl<S: Surface, E: EventSink> OnscreenApp<S, E> {
    pub fn new(surface: S, sink: E, proxy: SurfaceCommandProxy) -> Self {
        Self {
            surface,
            normalizer: InputNormalizer::new(sink),
            tracker: PointerTracker::new(),
            proxy,
            window_id: None,
            launched: false,
            halted: false,
            fault: Arc::new(Mutex::new(None)),
            error: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn control(&self) -> SurfaceControl<S::Target> {
        SurfaceControl::new(self.proxy.clone(), self.surface.context())
    }

    // Faults are parked for the loop thread, which re-raises them once the
    // loop returns. If the loop is already gone the listener thread raises
    // them itself.
    fn fault_handler(&self) -> FaultHandler {
        let proxy = self.proxy.clone();
        let slot = self.fault.clone();
        Arc::new(move |fault| {
            slot.lock().get_or_insert(fault);
            if proxy.send_event(SurfaceCommand::Faulted).is_err() {
                if let Some(fault) = slot.lock().take() {
                    relay::raise(fault);
                }
            }
        })
    }

    fn init_surface(
        &mut self,
        event_loop: &ActiveEventLoop,
    ) -> Result<(), SurfaceError> {
        let handler = self.fault_handler();
        self.surface.set_fault_handler(handler);

        let config = self.surface.core().config().clone();
        self.surface.init_onscreen(&config, event_loop)?;

        self.window_id =
            self.surface.core().window().map(|window| window.id());
        self.launched = true;
        self.normalizer.attach();
        Ok(())
    }

    fn pointer(&self, native: NativePointer) {
        self.normalizer.pointer(&native, self.surface.pixel_scale());
    }

    fn resized(&mut self, physical: [u32; 2]) {
        match self.surface.core_mut().window_resized(physical) {
            Ok(Some(resize)) => {
                self.normalizer.notice(WindowNotice::Resized {
                    width: resize.logical[0],
                    height: resize.logical[1],
                });
            }
            Ok(None) => {}
            Err(err) => warn!("failed to apply window resize: {}", err),
        }
    }

    fn rescaled(&mut self) {
        match self.surface.core_mut().scale_changed() {
            Ok(Some(resize)) => debug!(
                "display scale changed to {}, backing buffer {}x{}",
                resize.scale, resize.physical[0], resize.physical[1]
            ),
            Ok(None) => {}
            Err(err) => warn!("failed to apply scale change: {}", err),
        }
    }

    fn on_command(
        &mut self,
        event_loop: &ActiveEventLoop,
        command: SurfaceCommand,
    ) {
        match command {
            SurfaceCommand::SetFrameRate(fps) => {
                if let Err(err) = self.surface.set_frame_rate(fps) {
                    error!("failed to restart pacer: {}", err);
                }
            }
            SurfaceCommand::Pause => self.surface.pause_thread(),
            SurfaceCommand::Resume => self.surface.resume_thread(),
            SurfaceCommand::Stop => {
                self.halted = true;
                self.surface.stop_thread();
            }
            SurfaceCommand::Exit => self.shutdown(event_loop),
            SurfaceCommand::SetSize { width, height } => {
                if let Err(err) = self.surface.set_size(width, height) {
                    warn!("failed to resize surface: {}", err);
                }
            }
            SurfaceCommand::SetTitle(title) => {
                self.surface.core_mut().set_title(&title);
            }
            SurfaceCommand::SetVisible(visible) => {
                self.surface.set_visible(visible);
            }
            SurfaceCommand::SetResizable(resizable) => {
                self.surface.core_mut().set_resizable(resizable);
            }
            SurfaceCommand::SetAlwaysOnTop(on_top) => {
                self.surface.core_mut().set_always_on_top(on_top);
            }
            SurfaceCommand::SetLocation { x, y } => {
                self.surface.core_mut().set_location(x, y);
            }
            SurfaceCommand::SetCursor(code) => {
                self.surface.core_mut().set_cursor_code(event_loop, code);
            }
            SurfaceCommand::SetCustomCursor(image) => {
                self.surface.core_mut().set_custom_cursor(event_loop, image);
            }
            SurfaceCommand::ShowCursor => {
                self.surface.core_mut().show_cursor();
            }
            SurfaceCommand::HideCursor => {
                self.surface.core_mut().hide_cursor();
            }
            SurfaceCommand::SetIcon {
                rgba,
                width,
                height,
            } => {
                if let Err(err) =
                    self.surface.core_mut().set_icon(rgba, width, height)
                {
                    warn!("failed to set window icon: {}", err);
                }
            }
            SurfaceCommand::Faulted => {
                error!("closing window after a pacer fault");
                self.shutdown(event_loop);
            }
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.normalizer.detach();
        self.surface.stop_thread();
        event_loop.exit();
    }

    /// Consumes the app after the loop has returned, re-raising a relayed
    /// pacer fault on this thread.
    pub fn finish(mut self) -> Result<S, SurfaceError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let fault = self.fault.lock().take();
        if let Some(fault) = fault {
            relay::raise(fault);
        }

        Ok(self.surface)
    }
}

impl<S: Surface, E: EventSink> ApplicationHandler<SurfaceCommand>
    for OnscreenApp<S, E>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.launched {
            return;
        }

        if let Err(err) = self.init_surface(event_loop) {
            error!("failed to initialize surface: {}", err);
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_id != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.normalizer.notice(WindowNotice::CloseRequested);
                self.shutdown(event_loop);
            }
            WindowEvent::Destroyed => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                self.resized([size.width, size.height]);
            }
            WindowEvent::ScaleFactorChanged { .. } => self.rescaled(),
            WindowEvent::Moved(position) => {
                self.normalizer.notice(WindowNotice::Moved {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::Focused(true) => {
                self.normalizer.notice(WindowNotice::FocusGained);
            }
            WindowEvent::Focused(false) => {
                self.normalizer.notice(WindowNotice::FocusLost);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.tracker
                    .set_modifiers(convert_modifiers(modifiers.state()));
            }
            WindowEvent::CursorMoved { position, .. } => {
                let native = self.tracker.moved(position.x, position.y);
                self.pointer(native);
            }
            WindowEvent::CursorEntered { .. } => {
                let native = self.tracker.entered();
                self.pointer(native);
            }
            WindowEvent::CursorLeft { .. } => {
                let native = self.tracker.left();
                self.pointer(native);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let native = self.tracker.wheel(delta);
                self.pointer(native);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(index) = button_index(button) else {
                    return;
                };
                let now = Instant::now();
                for native in self.tracker.button(index, state, now) {
                    self.pointer(native);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let native = native_key(
                    &event.logical_key,
                    event.state,
                    event.repeat,
                    self.tracker.modifiers(),
                );
                self.normalizer.key(&native);
            }
            _ => {}
        }
    }

    fn user_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        command: SurfaceCommand,
    ) {
        self.on_command(event_loop, command);
    }

    // Ends the loop once the pacer stops on its own, which is how a
    // renderer's exit request or a fault surfaces here.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.launched && !self.halted && self.surface.is_stopped() {
            info!("animation ended, closing window");
            self.shutdown(event_loop);
            return;
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(
            Instant::now() + STOP_POLL_INTERVAL,
        ));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.normalizer.detach();
        self.surface.stop_thread();
    }
}

/// Owns the native event loop for one onscreen surface. Create it on the
/// main thread, hand out [`SurfaceControl`]s, then [`Onscreen::run`].
pub struct Onscreen<S: Surface, E: EventSink> {
    event_loop: EventLoop<SurfaceCommand>,
    app: OnscreenApp<S, E>,
}

impl<S: Surface, E: EventSink> Onscreen<S, E> {
    pub fn new(surface: S, sink: E) -> Result<Self, SurfaceError> {
        let event_loop = EventLoop::<SurfaceCommand>::with_user_event()
            .build()
            .map_err(|err| SurfaceError::EventLoop(err.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let app = OnscreenApp::new(surface, sink, event_loop.create_proxy());
        Ok(Self { event_loop, app })
    }

    pub fn control(&self) -> SurfaceControl<S::Target> {
        self.app.control()
    }

    /// Blocks until the window closes. Returns the surface, or re-raises a
    /// pacer fault on this thread.
    pub fn run(self) -> Result<S, SurfaceError> {
        let Self {
            event_loop,
            mut app,
        } = self;

        event_loop
            .run_app(&mut app)
            .map_err(|err| SurfaceError::EventLoop(err.to_string()))?;

        app.finish()
    }
}

/// Installs the logger and runs `surface` in a window until it closes.
pub fn run_onscreen<S: Surface, E: EventSink>(
    surface: S,
    sink: E,
) -> Result<S, SurfaceError> {
    logging::init_logger();
    Onscreen::new(surface, sink)?.run()
}

/// Builds the surface named by `config.renderer` around a raster renderer
/// and runs it until it ends. Accelerated and software surfaces open a
/// window; a headless one animates until the renderer asks to exit.
pub fn run_sketch<R, E>(
    config: SurfaceConfig,
    renderer: R,
    sink: E,
) -> Result<(), SurfaceError>
where
    R: RasterRenderer,
    E: EventSink,
{
    logging::init_logger();
    info!("running {:?} sketch", config.renderer);

    match config.renderer {
        RendererKind::Accelerated => {
            let surface = GpuSurface::new(config, RasterBridge::new(renderer));
            Onscreen::new(surface, sink)?.run()?;
        }
        RendererKind::Software => {
            let surface = RasterSurface::new(config, renderer);
            Onscreen::new(surface, sink)?.run()?;
        }
        RendererKind::Headless => run_headless(config, renderer)?,
    }

    Ok(())
}

// Drives the pacer with no window until it stops on its own, then re-raises
// any relayed fault here.
fn run_headless<R: RasterRenderer>(
    config: SurfaceConfig,
    renderer: R,
) -> Result<(), SurfaceError> {
    let mut surface =
        HeadlessSurface::new(config.clone(), move |resize: &Resize| {
            let [width, height] = resize.physical;
            Ok(RasterTarget::new(renderer, width, height, resize.scale))
        });

    let fault: Arc<Mutex<Option<PacerFault>>> = Arc::new(Mutex::new(None));
    let slot = fault.clone();
    surface.set_fault_handler(Arc::new(move |fault| {
        slot.lock().get_or_insert(fault);
    }));

    surface.init_offscreen(&config)?;
    surface.set_frame_rate(config.frame_rate)?;
    surface.start_thread()?;

    while !surface.is_stopped() {
        thread::sleep(STOP_POLL_INTERVAL);
    }
    surface.stop_thread();
    info!("headless sketch ended");

    let fault = fault.lock().take();
    if let Some(fault) = fault {
        relay::raise(fault);
    }

    Ok(())
}
