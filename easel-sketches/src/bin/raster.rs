use std::thread;
use std::time::Duration;

use easel::prelude::*;
use easel_sketches::sketches::bounce::Bounce;

fn main() {
    init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => SurfaceConfig::load(&path),
        None => Ok(SurfaceConfig {
            title: "easel raster".to_string(),
            renderer: RendererKind::Software,
            frame_rate: 30.0,
            ..SurfaceConfig::new(320, 240)
        }),
    };
    let config = config.unwrap_or_else(|err| {
        eprintln!("easel raster config failed: {}", err);
        std::process::exit(1);
    });

    let (sink, events) = event_channel();
    let surface = RasterSurface::new(config, Bounce::new(None));
    let onscreen = Onscreen::new(surface, sink).unwrap_or_else(|err| {
        eprintln!("easel raster failed: {}", err);
        std::process::exit(1);
    });

    // Clicks toggle the cursor; the window title tracks the frame count.
    let control = onscreen.control();
    thread::spawn(move || {
        let mut hidden = false;
        loop {
            match events.recv_timeout(Duration::from_secs(1)) {
                Ok(SurfaceEvent::Input(InputEvent::Pointer(pointer)))
                    if pointer.action == PointerAction::Click =>
                {
                    hidden = !hidden;
                    let sent = if hidden {
                        control.hide_cursor()
                    } else {
                        control.set_cursor(CursorKind::Cross)
                    };
                    if sent.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    let title =
                        format!("easel raster #{}", control.frame_count());
                    if control.set_title(title).is_err() {
                        break;
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    if let Err(err) = onscreen.run() {
        eprintln!("easel raster failed: {}", err);
        std::process::exit(1);
    }
}
