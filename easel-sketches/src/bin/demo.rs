use std::thread;

use easel::prelude::*;
use easel_sketches::sketches::triangle::Triangle;

fn main() {
    let config = SurfaceConfig {
        title: "easel demo".to_string(),
        resizable: true,
        ..SurfaceConfig::new(640, 480)
    };

    let (sink, events) = event_channel();
    thread::spawn(move || {
        for event in events {
            match event {
                SurfaceEvent::Window(notice) => info!("{:?}", notice),
                SurfaceEvent::Input(InputEvent::Key(key))
                    if key.action == KeyAction::Type =>
                {
                    info!("typed {:?}", key.key)
                }
                SurfaceEvent::Input(_) => {}
            }
        }
    });

    let surface = GpuSurface::new(config, Triangle::new(None));
    if let Err(err) = run_onscreen(surface, sink) {
        eprintln!("easel demo failed: {}", err);
        std::process::exit(1);
    }
}
