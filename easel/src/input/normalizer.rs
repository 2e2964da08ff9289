use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use super::events::{
    CODED, EventSink, KeyAction, KeyEvent, Modifiers, PointerAction,
    PointerButton, PointerEvent, WindowNotice,
};
use super::keys::{self, KeyClass};
use crate::surface::geometry::scale_point;

/// A pointer notification as delivered by a window backend, positions in
/// physical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativePointer {
    pub action: PointerAction,
    pub x: f64,
    pub y: f64,
    /// 1 = primary, 2 = middle, 3 = secondary.
    pub button: Option<u16>,
    pub modifiers: Modifiers,
    pub click_count: u32,
    /// Wheel travel in lines, positive toward the user.
    pub wheel: f32,
}

impl NativePointer {
    pub fn new(action: PointerAction, x: f64, y: f64) -> Self {
        Self {
            action,
            x,
            y,
            button: None,
            modifiers: Modifiers::empty(),
            click_count: 0,
            wheel: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeKey {
    pub code: u16,
    pub character: Option<char>,
    pub printable: bool,
    pub pressed: bool,
    pub repeat: bool,
    pub modifiers: Modifiers,
}

pub fn map_button(button: Option<u16>) -> PointerButton {
    match button {
        Some(1) => PointerButton::Left,
        Some(2) => PointerButton::Center,
        Some(3) => PointerButton::Right,
        _ => PointerButton::None,
    }
}

fn wheel_count(wheel: f32, modifiers: Modifiers) -> i32 {
    let wheel = if modifiers.contains(Modifiers::SHIFT) {
        -wheel
    } else {
        wheel
    };

    let count = wheel.round() as i32;
    if count == 0 && wheel != 0.0 {
        wheel.signum() as i32
    } else {
        count
    }
}

pub fn normalize_pointer(native: &NativePointer, scale: f64) -> PointerEvent {
    let (x, y) = scale_point(native.x, native.y, scale);

    let count = match native.action {
        PointerAction::Wheel => wheel_count(native.wheel, native.modifiers),
        _ => native.click_count as i32,
    };

    PointerEvent {
        action: native.action,
        modifiers: native.modifiers,
        x,
        y,
        button: map_button(native.button),
        count,
    }
}

/// Returns the press/release event plus, for presses of ordinary keys, the
/// synthesized typed event that follows it.
pub fn normalize_key(native: &NativeKey) -> (KeyEvent, Option<KeyEvent>) {
    let class = keys::classify(native.code, native.printable);

    let (key, key_code, coded) = match class {
        KeyClass::Coded(code) => (CODED, code, true),
        KeyClass::Hacky(code, key) => (key, code, false),
        KeyClass::Ordinary => {
            (native.character.unwrap_or('\0'), native.code as i32, false)
        }
    };

    let event = KeyEvent {
        action: if native.pressed {
            KeyAction::Press
        } else {
            KeyAction::Release
        },
        modifiers: native.modifiers,
        key,
        key_code,
        coded,
        repeat: native.repeat,
    };

    let typed = (native.pressed && class == KeyClass::Ordinary).then_some(
        KeyEvent {
            action: KeyAction::Type,
            key_code: 0,
            ..event
        },
    );

    (event, typed)
}

/// Feeds normalized events into the application's sink. Events arriving
/// while detached (no window or context) are dropped.
pub struct InputNormalizer<S: EventSink> {
    sink: S,
    attached: AtomicBool,
    warned: AtomicBool,
}

impl<S: EventSink> InputNormalizer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            attached: AtomicBool::new(false),
            warned: AtomicBool::new(false),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::Release);
        self.warned.store(false, Ordering::Relaxed);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn accepting(&self) -> bool {
        if self.is_attached() {
            return true;
        }

        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("dropping input events, surface has no window or context");
        }
        false
    }

    pub fn pointer(&self, native: &NativePointer, scale: f64) -> bool {
        if !self.accepting() {
            return false;
        }

        self.sink.post_event(normalize_pointer(native, scale).into());
        true
    }

    pub fn key(&self, native: &NativeKey) -> bool {
        if !self.accepting() {
            return false;
        }

        let (event, typed) = normalize_key(native);
        self.sink.post_event(event.into());
        if let Some(typed) = typed {
            self.sink.post_event(typed.into());
        }
        true
    }

    pub fn notice(&self, notice: WindowNotice) {
        if self.is_attached() {
            self.sink.post_notice(notice);
        }
    }
}
