use super::factory::WindowFactory;
use super::geometry::Resize;
use super::{
    NativeHandle, RendererKind, SizeProvider, Surface, SurfaceCore,
    SurfaceTarget, warn_unsupported,
};
use crate::error::SurfaceError;
use crate::framework::config::SurfaceConfig;

type Builder<T> = Box<dyn FnOnce(&Resize) -> Result<T, String> + Send>;

/// No window and no GPU: the pacer drives an arbitrary frame target. The
/// target is built once the sketch size is known.
pub struct HeadlessSurface<T: SurfaceTarget> {
    core: SurfaceCore<T>,
    builder: Option<Builder<T>>,
}

impl<T: SurfaceTarget> HeadlessSurface<T> {
    pub fn new<F>(config: SurfaceConfig, builder: F) -> Self
    where
        F: FnOnce(&Resize) -> Result<T, String> + Send + 'static,
    {
        Self {
            core: SurfaceCore::new(config),
            builder: Some(Box::new(builder)),
        }
    }

    /// Uses an existing target, resized to the sketch size on init.
    pub fn with_target(config: SurfaceConfig, target: T) -> Self {
        Self::new(config, move |resize| {
            let mut target = target;
            target.resize(resize);
            Ok(target)
        })
    }
}

impl<T: SurfaceTarget> Surface for HeadlessSurface<T> {
    type Target = T;

    fn core(&self) -> &SurfaceCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SurfaceCore<T> {
        &mut self.core
    }

    fn kind(&self) -> RendererKind {
        RendererKind::Headless
    }

    fn init_offscreen(
        &mut self,
        size: &dyn SizeProvider,
    ) -> Result<(), SurfaceError> {
        let builder = self.builder.take().ok_or_else(|| {
            SurfaceError::Context("surface is already initialized".to_string())
        })?;

        let resize = self.core.prepare(size);
        let target = builder(&resize).map_err(SurfaceError::Context)?;
        self.core.bind(target);
        Ok(())
    }

    fn init_onscreen(
        &mut self,
        _size: &dyn SizeProvider,
        _factory: &dyn WindowFactory,
    ) -> Result<(), SurfaceError> {
        Err(warn_unsupported("onscreen rendering"))
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle::None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::FrameError;
    use crate::runtime::pacer::FrameTarget;

    #[derive(Default)]
    struct Recorder {
        physical: [u32; 2],
        resizes: Arc<AtomicU32>,
    }

    impl FrameTarget for Recorder {
        fn produce_frame(&mut self) -> Result<(), FrameError> {
            Ok(())
        }
    }

    impl SurfaceTarget for Recorder {
        fn resize(&mut self, resize: &Resize) {
            self.physical = resize.physical;
            self.resizes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn init_offscreen_builds_target_at_sketch_size() {
        let config = SurfaceConfig {
            pixel_density: 2,
            ..SurfaceConfig::new(40, 30)
        };
        let mut surface =
            HeadlessSurface::with_target(config.clone(), Recorder::default());

        surface.init_offscreen(&config).unwrap();

        let physical = surface.render(|target| target.physical).unwrap();
        assert_eq!(physical, [80, 60]);
        assert_eq!(surface.pixel_scale(), 2.0);
    }

    #[test]
    fn second_init_is_rejected() {
        let config = SurfaceConfig::new(10, 10);
        let mut surface =
            HeadlessSurface::with_target(config.clone(), Recorder::default());

        surface.init_offscreen(&config).unwrap();
        assert!(surface.init_offscreen(&config).is_err());
    }

    #[test]
    fn set_size_reaches_the_bound_target() {
        let config = SurfaceConfig::new(10, 10);
        let resizes = Arc::new(AtomicU32::new(0));
        let target = Recorder {
            physical: [0, 0],
            resizes: resizes.clone(),
        };
        let mut surface = HeadlessSurface::with_target(config.clone(), target);
        surface.init_offscreen(&config).unwrap();
        let before = resizes.load(Ordering::SeqCst);

        assert!(surface.set_size(25, 0).unwrap());
        assert!(!surface.set_size(25, 1).unwrap());

        let physical = surface.render(|target| target.physical).unwrap();
        assert_eq!(physical, [25, 1]);
        assert_eq!(resizes.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn native_handle_is_empty() {
        let surface = HeadlessSurface::with_target(
            SurfaceConfig::default(),
            Recorder::default(),
        );
        assert!(matches!(surface.native_handle(), NativeHandle::None));
        assert_eq!(surface.kind(), RendererKind::Headless);
    }
}
