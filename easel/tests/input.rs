use easel::input::{InputNormalizer, NativeKey, NativePointer};
use easel::prelude::*;

fn drain(rx: &std::sync::mpsc::Receiver<SurfaceEvent>) -> Vec<SurfaceEvent> {
    rx.try_iter().collect()
}

#[test]
fn pointer_positions_are_divided_by_the_scale() {
    let (tx, rx) = event_channel();
    let normalizer = InputNormalizer::new(tx);
    normalizer.attach();

    let mut native = NativePointer::new(PointerAction::Press, 201.0, 99.0);
    native.button = Some(3);
    native.click_count = 1;
    assert!(normalizer.pointer(&native, 2.0));

    let events = drain(&rx);
    assert_eq!(events.len(), 1);
    let SurfaceEvent::Input(InputEvent::Pointer(event)) = events[0] else {
        panic!("expected a pointer event, got {:?}", events[0]);
    };
    assert_eq!((event.x, event.y), (100, 49));
    assert_eq!(event.button, PointerButton::Right);
    assert_eq!(event.count, 1);
}

#[test]
fn shift_flips_the_wheel_direction() {
    let (tx, rx) = event_channel();
    let normalizer = InputNormalizer::new(tx);
    normalizer.attach();

    let mut native = NativePointer::new(PointerAction::Wheel, 0.0, 0.0);
    native.wheel = 0.3;
    normalizer.pointer(&native, 1.0);
    native.modifiers = Modifiers::SHIFT;
    normalizer.pointer(&native, 1.0);

    let counts: Vec<i32> = drain(&rx)
        .into_iter()
        .filter_map(|event| match event {
            SurfaceEvent::Input(InputEvent::Pointer(p)) => Some(p.count),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![1, -1]);
}

#[test]
fn printable_press_is_followed_by_a_typed_event() {
    let (tx, rx) = event_channel();
    let normalizer = InputNormalizer::new(tx);
    normalizer.attach();

    normalizer.key(&NativeKey {
        code: 'A' as u16,
        character: Some('a'),
        printable: true,
        pressed: true,
        repeat: false,
        modifiers: Modifiers::empty(),
    });

    let actions: Vec<KeyAction> = drain(&rx)
        .into_iter()
        .filter_map(|event| match event {
            SurfaceEvent::Input(InputEvent::Key(k)) => Some(k.action),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec![KeyAction::Press, KeyAction::Type]);
}

#[test]
fn detached_normalizer_drops_everything() {
    let (tx, rx) = event_channel();
    let normalizer = InputNormalizer::new(tx);

    let native = NativePointer::new(PointerAction::Move, 1.0, 1.0);
    assert!(!normalizer.pointer(&native, 1.0));
    normalizer.notice(WindowNotice::FocusGained);
    assert!(drain(&rx).is_empty());

    normalizer.attach();
    normalizer.notice(WindowNotice::FocusGained);
    normalizer.detach();
    assert!(!normalizer.pointer(&native, 1.0));

    assert_eq!(
        drain(&rx),
        vec![SurfaceEvent::Window(WindowNotice::FocusGained)]
    );
}
