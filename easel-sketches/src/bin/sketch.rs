use easel::prelude::*;
use easel_sketches::sketches::bounce::Bounce;

// Runs the bounce sketch on whichever surface the config names. Headless
// runs stop after a fixed number of frames.
const HEADLESS_FRAMES: u64 = 120;

fn main() {
    init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => SurfaceConfig::load(&path),
        None => Ok(SurfaceConfig {
            title: "easel sketch".to_string(),
            ..SurfaceConfig::new(320, 240)
        }),
    };
    let config = config.unwrap_or_else(|err| {
        eprintln!("easel sketch config failed: {}", err);
        std::process::exit(1);
    });

    let limit = match config.renderer {
        RendererKind::Headless => Some(HEADLESS_FRAMES),
        RendererKind::Accelerated | RendererKind::Software => None,
    };

    let (sink, _events) = event_channel();
    if let Err(err) = run_sketch(config, Bounce::new(limit), sink) {
        eprintln!("easel sketch failed: {}", err);
        std::process::exit(1);
    }
}
