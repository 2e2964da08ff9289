use std::path::{Path, PathBuf};

use easel::prelude::*;
use easel_sketches::sketches::bounce::Bounce;

const FRAMES: u64 = 90;

fn main() {
    init_logger();

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("easel-offscreen.png"));

    if let Err(err) = render(&output) {
        eprintln!("easel offscreen failed: {}", err);
        std::process::exit(1);
    }
}

fn render(output: &Path) -> Result<(), String> {
    let config = SurfaceConfig {
        renderer: RendererKind::Software,
        pixel_density: 2,
        ..SurfaceConfig::new(200, 150)
    };

    let mut surface = RasterSurface::new(config.clone(), Bounce::new(None));
    surface
        .init_offscreen(&config)
        .map_err(|err| err.to_string())?;

    for _ in 0..FRAMES {
        surface.draw_frame().map_err(|err| err.to_string())?;
    }

    let capture = surface.read_pixels().map_err(|err| err.to_string())?;
    capture.save_png(output)?;
    info!(
        "wrote {}x{} frame to {}",
        capture.width,
        capture.height,
        output.display()
    );
    Ok(())
}
