mod support;

use easel::prelude::*;

struct Clear {
    color: wgpu::Color,
}

impl Renderer for Clear {
    fn bind_to_context(
        &mut self,
        _gpu: &GpuContext,
        _target: &TargetInfo,
    ) -> Result<(), String> {
        Ok(())
    }

    fn draw_frame(&mut self, frame: &mut Frame) -> Result<(), String> {
        let _pass = frame.begin_pass(Some(self.color));
        Ok(())
    }
}

#[test]
fn offscreen_gpu_surface_reads_back_the_clear_color() {
    if !support::gpu_tests_enabled() {
        return;
    }
    init_logger();

    let config = SurfaceConfig::new(16, 8);
    let mut surface = GpuSurface::new(
        config.clone(),
        Clear {
            color: wgpu::Color::GREEN,
        },
    );
    surface.init_offscreen(&config).expect("init offscreen");
    surface.draw_frame().expect("draw frame");

    let capture = surface.read_pixels().expect("read pixels");
    assert_eq!((capture.width, capture.height), (16, 8));
    assert_eq!(capture.pixel(3, 3), Some([0, 255, 0, 255]));
    assert!(matches!(surface.native_handle(), NativeHandle::Device(_)));
}

#[test]
fn set_smooth_reports_a_supported_sample_count() {
    if !support::gpu_tests_enabled() {
        return;
    }

    let config = SurfaceConfig::new(16, 16);
    let mut surface = GpuSurface::new(
        config.clone(),
        Clear {
            color: wgpu::Color::BLACK,
        },
    );
    surface.init_offscreen(&config).expect("init offscreen");

    assert_eq!(surface.set_smooth(0).expect("smooth 0"), 1);
    assert_eq!(surface.core().config().smooth, 0);
    surface.draw_frame().expect("draw frame");
}

// Builds pipelines for single-sampled targets only.
struct SingleSampled;

impl Renderer for SingleSampled {
    fn bind_to_context(
        &mut self,
        _gpu: &GpuContext,
        target: &TargetInfo,
    ) -> Result<(), String> {
        if target.sample_count > 1 {
            return Err(format!("{} samples unsupported", target.sample_count));
        }
        Ok(())
    }

    fn draw_frame(&mut self, frame: &mut Frame) -> Result<(), String> {
        let _pass = frame.begin_pass(Some(wgpu::Color::BLACK));
        Ok(())
    }
}

#[test]
fn rejected_smooth_level_keeps_the_previous_binding() {
    if !support::gpu_tests_enabled() {
        return;
    }

    let mut config = SurfaceConfig::new(16, 16);
    config.smooth = 0;
    let mut surface = GpuSurface::new(config.clone(), SingleSampled);
    surface.init_offscreen(&config).expect("init offscreen");

    match surface.set_smooth(4) {
        // Adapter without multisampling: nothing to reject.
        Ok(samples) => assert_eq!(samples, 1),
        Err(err) => {
            assert!(err.to_string().contains("samples unsupported"));
            assert_eq!(surface.core().config().smooth, 0);
            let samples = surface
                .render(|context| context.target_info().sample_count)
                .expect("render");
            assert_eq!(samples, 1);
        }
    }

    surface.draw_frame().expect("draw frame");
}
