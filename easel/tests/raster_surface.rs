mod support;

use std::sync::atomic::Ordering;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use easel::prelude::*;
use support::{Fill, wait_until};

const RED: Rgba = Rgba::new(255, 0, 0, 255);

fn config(width: u32, height: u32) -> SurfaceConfig {
    SurfaceConfig {
        renderer: RendererKind::Software,
        ..SurfaceConfig::new(width, height)
    }
}

#[test]
fn offscreen_raster_surface_draws_and_reads_back() {
    let config = config(32, 16);
    let mut surface = RasterSurface::new(config.clone(), Fill::new(RED));
    surface.init_offscreen(&config).expect("init offscreen");

    assert!(surface.is_stopped());
    surface.draw_frame().expect("draw frame");

    let capture = surface.read_pixels().expect("read pixels");
    assert_eq!((capture.width, capture.height), (32, 16));
    assert_eq!(capture.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(capture.pixel(31, 15), Some([255, 0, 0, 255]));
    assert_eq!(capture.pixel(32, 0), None);
}

#[test]
fn density_two_doubles_the_backing_buffer() {
    let config = SurfaceConfig {
        pixel_density: 2,
        ..config(20, 10)
    };
    let mut surface = RasterSurface::new(config.clone(), Fill::new(RED));
    surface.init_offscreen(&config).expect("init offscreen");

    let size = surface
        .render(|context| {
            let canvas = context.canvas();
            (canvas.width(), canvas.height(), canvas.scale())
        })
        .expect("render");
    assert_eq!(size, (40, 20, 2.0));
    assert_eq!(surface.core().geometry().logical_size(), [20, 10]);
    assert_eq!(surface.core().geometry().physical_size(), [40, 20]);
}

#[test]
fn set_size_reaches_the_canvas_before_returning() {
    let config = config(10, 10);
    let mut surface = RasterSurface::new(config.clone(), Fill::new(RED));
    surface.init_offscreen(&config).expect("init offscreen");

    assert!(surface.set_size(64, 48).expect("set size"));
    let size = surface
        .render(|context| (context.canvas().width(), context.canvas().height()))
        .expect("render");
    assert_eq!(size, (64, 48));

    assert!(!surface.set_size(64, 48).expect("repeat set size"));
}

#[test]
fn pacer_drives_frames_until_stopped() {
    let config = config(8, 8);
    let fill = Fill::new(RED);
    let draws = fill.draws.clone();
    let mut surface = RasterSurface::new(config.clone(), fill);
    surface.init_offscreen(&config).expect("init offscreen");

    surface.set_frame_rate(240.0).expect("frame rate");
    assert!(surface.start_thread().expect("start"));
    assert!(!surface.start_thread().expect("second start"));

    assert!(wait_until(Duration::from_secs(2), || {
        draws.load(Ordering::SeqCst) >= 3
    }));

    assert!(surface.stop_thread());
    assert!(!surface.stop_thread());
    assert!(surface.is_stopped());

    let settled = draws.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(draws.load(Ordering::SeqCst), settled);
}

#[test]
fn frame_rate_is_clamped_and_recorded() {
    let config = config(8, 8);
    let mut surface = RasterSurface::new(config.clone(), Fill::new(RED));
    surface.init_offscreen(&config).expect("init offscreen");

    assert_eq!(surface.set_frame_rate(2000.0).expect("high"), 1000.0);
    assert_eq!(surface.core().config().frame_rate, 1000.0);
    assert_eq!(surface.set_frame_rate(0.0).expect("low"), 1.0);
    assert_eq!(surface.core().pacer().frame_rate(), 1.0);
}

#[test]
fn renderer_exit_ends_animation_quietly() {
    let config = config(8, 8);
    let mut fill = Fill::new(RED);
    fill.exit_after = Some(2);
    let mut surface = RasterSurface::new(config.clone(), fill);
    surface.init_offscreen(&config).expect("init offscreen");

    let (tx, rx) = mpsc::channel::<String>();
    surface.set_fault_handler(Arc::new(move |fault: PacerFault| {
        let _ = tx.send(fault.message());
    }));

    surface.set_frame_rate(500.0).expect("frame rate");
    surface.start_thread().expect("start");

    assert!(wait_until(Duration::from_secs(2), || surface.is_stopped()));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn frame_failure_is_relayed_to_the_fault_handler() {
    let config = config(8, 8);
    let mut fill = Fill::new(RED);
    fill.fail_after = Some(1);
    let mut surface = RasterSurface::new(config.clone(), fill);
    surface.init_offscreen(&config).expect("init offscreen");

    let (tx, rx) = mpsc::channel::<String>();
    surface.set_fault_handler(Arc::new(move |fault: PacerFault| {
        let _ = tx.send(fault.message());
    }));

    surface.set_frame_rate(500.0).expect("frame rate");
    surface.start_thread().expect("start");

    let message = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("fault delivered");
    assert_eq!(message, "fill failed on draw 2");
    assert!(wait_until(Duration::from_secs(2), || surface.is_stopped()));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn onscreen_only_operations_are_harmless_offscreen() {
    let config = config(8, 8);
    let mut surface = RasterSurface::new(config.clone(), Fill::new(RED));
    surface.init_offscreen(&config).expect("init offscreen");

    surface.set_visible(false);
    assert!(!surface.is_visible());
    assert!(matches!(surface.native_handle(), NativeHandle::None));
    assert_eq!(surface.pixel_scale(), 1.0);
}

#[test]
fn headless_surface_wraps_a_raster_target() {
    let config = SurfaceConfig {
        renderer: RendererKind::Headless,
        ..SurfaceConfig::new(12, 6)
    };
    let mut surface = HeadlessSurface::new(config.clone(), |resize| {
        let [width, height] = resize.physical;
        Ok(easel::render::raster::RasterTarget::new(
            Fill::new(Rgba::WHITE),
            width,
            height,
            resize.scale,
        ))
    });
    surface.init_offscreen(&config).expect("init offscreen");
    surface.draw_frame().expect("draw frame");

    let capture = surface
        .render(|target| target.read_pixels())
        .expect("render");
    assert_eq!((capture.width, capture.height), (12, 6));
    assert_eq!(capture.pixel(5, 5), Some([255, 255, 255, 255]));
}

// Notes the canvas size on entry to and exit from every draw.
struct SizeWitness {
    seen: Arc<std::sync::Mutex<Vec<((u32, u32), (u32, u32))>>>,
}

impl RasterRenderer for SizeWitness {
    fn draw(&mut self, canvas: &mut PixelBuffer) -> Result<(), String> {
        let before = (canvas.width(), canvas.height());
        std::thread::sleep(Duration::from_millis(2));
        canvas.fill(RED);
        let after = (canvas.width(), canvas.height());
        self.seen
            .lock()
            .map_err(|_| "size log poisoned".to_string())?
            .push((before, after));
        Ok(())
    }
}

#[test]
fn resize_never_lands_inside_a_frame() {
    let config = config(400, 300);
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let witness = SizeWitness { seen: seen.clone() };
    let mut surface = RasterSurface::new(config.clone(), witness);
    surface.init_offscreen(&config).expect("init offscreen");

    surface.set_frame_rate(500.0).expect("frame rate");
    surface.start_thread().expect("start");

    for round in 0..20 {
        let (width, height) = if round % 2 == 0 {
            (800, 600)
        } else {
            (400, 300)
        };
        surface.set_size(width, height).expect("set size");

        let size = surface
            .render(|context| {
                (context.canvas().width() as i32, context.canvas().height() as i32)
            })
            .expect("render");
        assert_eq!(size, (width, height));
        std::thread::sleep(Duration::from_millis(3));
    }
    surface.stop_thread();

    let seen = seen.lock().expect("size log");
    assert!(!seen.is_empty());
    for (before, after) in seen.iter() {
        assert_eq!(before, after);
        assert!(matches!(before, (400, 300) | (800, 600)));
    }
}

fn headless(width: u32, height: u32) -> SurfaceConfig {
    SurfaceConfig {
        renderer: RendererKind::Headless,
        frame_rate: 500.0,
        ..SurfaceConfig::new(width, height)
    }
}

#[test]
fn headless_sketch_runs_until_the_renderer_exits() {
    let mut fill = Fill::new(RED);
    fill.exit_after = Some(3);
    let draws = fill.draws.clone();

    let (sink, _events) = event_channel();
    run_sketch(headless(8, 8), fill, sink).expect("headless run");

    assert_eq!(draws.load(Ordering::SeqCst), 3);
}

#[test]
#[should_panic(expected = "fill failed on draw 2")]
fn headless_sketch_reraises_frame_failures() {
    let mut fill = Fill::new(RED);
    fill.fail_after = Some(1);

    let (sink, _events) = event_channel();
    let _ = run_sketch(headless(8, 8), fill, sink);
}
