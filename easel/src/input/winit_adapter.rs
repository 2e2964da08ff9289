//! Translation from winit notifications into native pointer and key records.
//! Nothing winit-specific escapes this module.

use std::time::{Duration, Instant};

use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{Key, ModifiersState, NamedKey};

use super::events::{Modifiers, PointerAction};
use super::keys::native;
use super::normalizer::{NativeKey, NativePointer};

pub const MULTI_CLICK_INTERVAL: Duration = Duration::from_millis(500);

// Pointer travel (physical px) that turns a press into a drag.
const CLICK_SLOP: f64 = 4.0;

const PIXELS_PER_LINE: f32 = 40.0;

pub fn convert_modifiers(state: ModifiersState) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, state.shift_key());
    modifiers.set(Modifiers::CTRL, state.control_key());
    modifiers.set(Modifiers::META, state.super_key());
    modifiers.set(Modifiers::ALT, state.alt_key());
    modifiers
}

pub fn button_index(button: MouseButton) -> Option<u16> {
    match button {
        MouseButton::Left => Some(1),
        MouseButton::Middle => Some(2),
        MouseButton::Right => Some(3),
        _ => None,
    }
}

/// Wheel travel in lines, positive toward the user. Backends that turn
/// shift+wheel into horizontal travel report it on the x axis.
pub fn wheel_lines(delta: MouseScrollDelta) -> f32 {
    let (x, y) = match delta {
        MouseScrollDelta::LineDelta(x, y) => (x, y),
        MouseScrollDelta::PixelDelta(position) => (
            position.x as f32 / PIXELS_PER_LINE,
            position.y as f32 / PIXELS_PER_LINE,
        ),
    };

    if y != 0.0 { -y } else { -x }
}

pub fn native_key(
    logical: &Key,
    state: ElementState,
    repeat: bool,
    modifiers: Modifiers,
) -> NativeKey {
    let (code, character, printable) = match logical {
        Key::Character(text) => {
            let character = text.chars().next();
            let code =
                character.map(code_for_char).unwrap_or(native::UNDEFINED);
            (code, character, true)
        }
        Key::Named(NamedKey::Space) => (native::SPACE, Some(' '), true),
        Key::Named(named) => (code_for_named(*named), None, false),
        _ => (native::UNDEFINED, None, false),
    };

    NativeKey {
        code,
        character,
        printable,
        pressed: state == ElementState::Pressed,
        repeat,
        modifiers,
    }
}

fn code_for_named(named: NamedKey) -> u16 {
    match named {
        NamedKey::ArrowUp => native::UP,
        NamedKey::ArrowDown => native::DOWN,
        NamedKey::ArrowLeft => native::LEFT,
        NamedKey::ArrowRight => native::RIGHT,
        NamedKey::Alt | NamedKey::AltGraph => native::ALT,
        NamedKey::Control => native::CONTROL,
        NamedKey::Shift => native::SHIFT,
        NamedKey::Super | NamedKey::Meta => native::WINDOWS,
        NamedKey::Backspace => native::BACK_SPACE,
        NamedKey::Tab => native::TAB,
        NamedKey::Enter => native::ENTER,
        NamedKey::Escape => native::ESCAPE,
        NamedKey::Delete => native::DELETE,
        NamedKey::Insert => native::INSERT,
        NamedKey::Home => native::HOME,
        NamedKey::End => native::END,
        NamedKey::PageUp => native::PAGE_UP,
        NamedKey::PageDown => native::PAGE_DOWN,
        NamedKey::CapsLock => native::CAPS_LOCK,
        NamedKey::NumLock => native::NUM_LOCK,
        NamedKey::ScrollLock => native::SCROLL_LOCK,
        NamedKey::PrintScreen => native::PRINT_SCREEN,
        NamedKey::Pause => native::PAUSE,
        NamedKey::ContextMenu => native::CONTEXT_MENU,
        NamedKey::F1 => native::F1,
        NamedKey::F2 => native::F1 + 1,
        NamedKey::F3 => native::F1 + 2,
        NamedKey::F4 => native::F1 + 3,
        NamedKey::F5 => native::F1 + 4,
        NamedKey::F6 => native::F1 + 5,
        NamedKey::F7 => native::F1 + 6,
        NamedKey::F8 => native::F1 + 7,
        NamedKey::F9 => native::F1 + 8,
        NamedKey::F10 => native::F1 + 9,
        NamedKey::F11 => native::F1 + 10,
        NamedKey::F12 => native::F12,
        _ => native::UNDEFINED,
    }
}

fn code_for_char(c: char) -> u16 {
    match c {
        'a'..='z' => c.to_ascii_uppercase() as u16,
        'A'..='Z' | '0'..='9' => c as u16,
        ',' | '-' | '.' | '/' | ';' | '=' | '[' | '\\' | ']' => c as u16,
        _ => native::UNDEFINED,
    }
}

/// Derives drag, click, enter and exit notifications that winit does not
/// report directly.
#[derive(Debug, Default)]
pub struct PointerTracker {
    position: (f64, f64),
    held: Vec<u16>,
    modifiers: Modifiers,
    press_origin: Option<(f64, f64)>,
    dragged: bool,
    last_press: Option<(u16, Instant)>,
    click_count: u32,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    fn event(&self, action: PointerAction) -> NativePointer {
        NativePointer {
            modifiers: self.modifiers,
            ..NativePointer::new(action, self.position.0, self.position.1)
        }
    }

    pub fn moved(&mut self, x: f64, y: f64) -> NativePointer {
        self.position = (x, y);

        if let Some((ox, oy)) = self.press_origin {
            if (x - ox).abs() > CLICK_SLOP || (y - oy).abs() > CLICK_SLOP {
                self.dragged = true;
            }
        }

        match self.held.first() {
            Some(button) => NativePointer {
                button: Some(*button),
                ..self.event(PointerAction::Drag)
            },
            None => self.event(PointerAction::Move),
        }
    }

    pub fn entered(&mut self) -> NativePointer {
        self.event(PointerAction::Enter)
    }

    pub fn left(&mut self) -> NativePointer {
        self.event(PointerAction::Exit)
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta) -> NativePointer {
        NativePointer {
            wheel: wheel_lines(delta),
            ..self.event(PointerAction::Wheel)
        }
    }

    /// A press yields one event; a release yields the release followed by
    /// a click when the pointer did not drag in between.
    pub fn button(
        &mut self,
        button: u16,
        state: ElementState,
        now: Instant,
    ) -> Vec<NativePointer> {
        match state {
            ElementState::Pressed => {
                let repeated = matches!(
                    self.last_press,
                    Some((last, at)) if last == button
                        && now.saturating_duration_since(at)
                            <= MULTI_CLICK_INTERVAL
                );
                self.click_count = if repeated && !self.dragged {
                    self.click_count + 1
                } else {
                    1
                };
                self.last_press = Some((button, now));
                self.press_origin = Some(self.position);
                self.dragged = false;
                if !self.held.contains(&button) {
                    self.held.push(button);
                }

                vec![NativePointer {
                    button: Some(button),
                    click_count: self.click_count,
                    ..self.event(PointerAction::Press)
                }]
            }
            ElementState::Released => {
                self.held.retain(|held| *held != button);
                let release = NativePointer {
                    button: Some(button),
                    click_count: self.click_count,
                    ..self.event(PointerAction::Release)
                };

                if self.held.is_empty() {
                    self.press_origin = None;
                }

                if self.dragged {
                    return vec![release];
                }

                vec![
                    release,
                    NativePointer {
                        action: PointerAction::Click,
                        ..release
                    },
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[test]
    fn converts_modifier_state() {
        let state = ModifiersState::SHIFT | ModifiersState::ALT;
        assert_eq!(
            convert_modifiers(state),
            Modifiers::SHIFT | Modifiers::ALT
        );
        assert_eq!(
            convert_modifiers(ModifiersState::SUPER),
            Modifiers::META
        );
    }

    #[test]
    fn maps_logical_keys_to_native_codes() {
        let up = native_key(
            &Key::Named(NamedKey::ArrowUp),
            ElementState::Pressed,
            false,
            Modifiers::empty(),
        );
        assert_eq!(up.code, native::UP);
        assert!(!up.printable);

        let a = native_key(
            &Key::Character("a".into()),
            ElementState::Released,
            false,
            Modifiers::empty(),
        );
        assert_eq!(a.code, b'A' as u16);
        assert_eq!(a.character, Some('a'));
        assert!(!a.pressed);
    }

    #[test]
    fn punctuation_never_collides_with_named_codes() {
        for c in ['&', '(', '%', '\''] {
            assert_eq!(code_for_char(c), native::UNDEFINED);
        }
    }

    #[test]
    fn wheel_is_positive_toward_user() {
        assert_eq!(wheel_lines(MouseScrollDelta::LineDelta(0.0, -1.0)), 1.0);
        assert_eq!(wheel_lines(MouseScrollDelta::LineDelta(2.0, 0.0)), -2.0);
        assert_eq!(
            wheel_lines(MouseScrollDelta::PixelDelta(PhysicalPosition::new(
                0.0, 80.0
            ))),
            -2.0
        );
    }

    #[test]
    fn press_release_emits_click() {
        let mut tracker = PointerTracker::new();
        let now = Instant::now();
        tracker.moved(10.0, 10.0);

        let press = tracker.button(1, ElementState::Pressed, now);
        assert_eq!(press.len(), 1);
        assert_eq!(press[0].action, PointerAction::Press);

        let release = tracker.button(1, ElementState::Released, now);
        let actions: Vec<_> = release.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![PointerAction::Release, PointerAction::Click]);
        assert_eq!(release[1].click_count, 1);
    }

    #[test]
    fn quick_presses_count_up() {
        let mut tracker = PointerTracker::new();
        let start = Instant::now();

        tracker.button(1, ElementState::Pressed, start);
        tracker.button(1, ElementState::Released, start);
        let second = start + Duration::from_millis(200);
        let press = tracker.button(1, ElementState::Pressed, second);
        assert_eq!(press[0].click_count, 2);

        tracker.button(1, ElementState::Released, second);
        let late = second + Duration::from_secs(1);
        let press = tracker.button(1, ElementState::Pressed, late);
        assert_eq!(press[0].click_count, 1);
    }

    #[test]
    fn movement_while_held_is_a_drag_without_click() {
        let mut tracker = PointerTracker::new();
        let now = Instant::now();

        tracker.button(3, ElementState::Pressed, now);
        let drag = tracker.moved(40.0, 40.0);
        assert_eq!(drag.action, PointerAction::Drag);
        assert_eq!(drag.button, Some(3));

        let release = tracker.button(3, ElementState::Released, now);
        assert_eq!(release.len(), 1);
        assert_eq!(tracker.moved(41.0, 41.0).action, PointerAction::Move);
    }
}
