use winit::event_loop::{EventLoopClosed, EventLoopProxy};

use super::pacer::{ContextHandle, FrameTarget, PacerState};
use crate::error::SurfaceError;
use crate::surface::cursor::{CursorImage, CursorKind};

/// Requests delivered to the native loop, which owns the window and the
/// pacer.
#[derive(Debug)]
pub enum SurfaceCommand {
    SetFrameRate(f32),
    Pause,
    Resume,
    Stop,
    Exit,
    SetSize { width: i32, height: i32 },
    SetTitle(String),
    SetVisible(bool),
    SetResizable(bool),
    SetAlwaysOnTop(bool),
    SetLocation { x: i32, y: i32 },
    SetCursor(i32),
    SetCustomCursor(CursorImage),
    ShowCursor,
    HideCursor,
    SetIcon {
        rgba: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// The pacer halted on a fault; the loop closes and re-raises it.
    Faulted,
}

pub type SurfaceCommandProxy = EventLoopProxy<SurfaceCommand>;

/// Thread-safe handle to a running onscreen surface. Context work runs
/// directly on the context-owning thread; window and pacer changes are
/// posted to the native loop.
pub struct SurfaceControl<T: FrameTarget> {
    proxy: SurfaceCommandProxy,
    context: ContextHandle<T>,
}

impl<T: FrameTarget> Clone for SurfaceControl<T> {
    fn clone(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
            context: self.context.clone(),
        }
    }
}

impl<T: FrameTarget> SurfaceControl<T> {
    pub fn new(proxy: SurfaceCommandProxy, context: ContextHandle<T>) -> Self {
        Self { proxy, context }
    }

    /// Runs `f` on the context-owning thread and waits for it.
    pub fn render<R, F>(&self, f: F) -> Result<R, SurfaceError>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.context.render(f)
    }

    pub fn send(&self, command: SurfaceCommand) -> Result<(), SurfaceError> {
        self.proxy.send_event(command).map_err(|EventLoopClosed(command)| {
            SurfaceError::EventLoop(format!(
                "event loop closed, dropped {:?}",
                command
            ))
        })
    }

    pub fn state(&self) -> PacerState {
        self.context.state()
    }

    pub fn frame_count(&self) -> u64 {
        self.context.frame_count()
    }

    pub fn set_frame_rate(&self, fps: f32) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetFrameRate(fps))
    }

    pub fn pause(&self) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::Resume)
    }

    /// Stops animating; the window stays open.
    pub fn stop(&self) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::Stop)
    }

    pub fn exit(&self) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::Exit)
    }

    pub fn set_size(
        &self,
        width: i32,
        height: i32,
    ) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetSize { width, height })
    }

    pub fn set_title(
        &self,
        title: impl Into<String>,
    ) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetTitle(title.into()))
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetVisible(visible))
    }

    pub fn set_resizable(&self, resizable: bool) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetResizable(resizable))
    }

    pub fn set_always_on_top(&self, on_top: bool) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetAlwaysOnTop(on_top))
    }

    pub fn set_location(&self, x: i32, y: i32) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetLocation { x, y })
    }

    pub fn set_cursor(&self, kind: CursorKind) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetCursor(kind.code()))
    }

    /// Unknown codes are reported by the loop with a warning.
    pub fn set_cursor_code(&self, code: i32) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetCursor(code))
    }

    pub fn set_custom_cursor(
        &self,
        image: CursorImage,
    ) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetCustomCursor(image))
    }

    pub fn show_cursor(&self) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::ShowCursor)
    }

    pub fn hide_cursor(&self) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::HideCursor)
    }

    pub fn set_icon(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<(), SurfaceError> {
        self.send(SurfaceCommand::SetIcon {
            rgba,
            width,
            height,
        })
    }
}
