use std::sync::mpsc::{self, Receiver, Sender};

use bitflags::bitflags;

/// Character carried by key events that have no printable representation.
pub const CODED: char = '\u{ffff}';

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const CTRL = 1 << 1;
        const META = 1 << 2;
        const ALT = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PointerAction {
    Press,
    Release,
    Click,
    Drag,
    Move,
    Wheel,
    Enter,
    Exit,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PointerButton {
    #[default]
    None,
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub modifiers: Modifiers,
    pub x: i32,
    pub y: i32,
    pub button: PointerButton,
    /// Click count, or the signed wheel delta for wheel events.
    pub count: i32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyAction {
    Press,
    Release,
    Type,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub modifiers: Modifiers,
    pub key: char,
    pub key_code: i32,
    pub coded: bool,
    pub repeat: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        InputEvent::Pointer(event)
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowNotice {
    Moved { x: i32, y: i32 },
    Resized { width: u32, height: u32 },
    FocusGained,
    FocusLost,
    CloseRequested,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceEvent {
    Input(InputEvent),
    Window(WindowNotice),
}

/// The application's event queue. Posting must never block.
pub trait EventSink: Send + Sync {
    fn post_event(&self, event: InputEvent);

    fn post_notice(&self, _notice: WindowNotice) {}
}

impl EventSink for Sender<SurfaceEvent> {
    fn post_event(&self, event: InputEvent) {
        let _ = self.send(SurfaceEvent::Input(event));
    }

    fn post_notice(&self, notice: WindowNotice) {
        let _ = self.send(SurfaceEvent::Window(notice));
    }
}

pub fn event_channel() -> (Sender<SurfaceEvent>, Receiver<SurfaceEvent>) {
    mpsc::channel()
}
