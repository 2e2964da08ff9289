//! Logical sketch size, physical backing-buffer size and the pixel scale
//! relating the two.

/// A settled geometry change that must be pushed to both the window and
/// the rendering context.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resize {
    pub logical: [u32; 2],
    pub physical: [u32; 2],
    pub scale: f64,
    /// False for surfaces embedded in a foreign container, whose window
    /// size is owned elsewhere.
    pub resize_window: bool,
}

#[derive(Clone, Debug)]
pub struct Geometry {
    logical: [u32; 2],
    physical: [u32; 2],
    scale: f64,
    pixel_density: u32,
    visible: bool,
    resizable: bool,
    external: bool,
    placeholder: bool,
}

impl Geometry {
    /// Starts as a 1x1 placeholder until real sketch dimensions arrive.
    pub fn new(pixel_density: u32) -> Self {
        Self {
            logical: [1, 1],
            physical: [1, 1],
            scale: 1.0,
            pixel_density: pixel_density.max(1),
            visible: false,
            resizable: false,
            external: false,
            placeholder: true,
        }
    }

    pub fn logical_size(&self) -> [u32; 2] {
        self.logical
    }

    pub fn physical_size(&self) -> [u32; 2] {
        self.physical
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pixel_density(&self) -> u32 {
        self.pixel_density
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn set_external(&mut self, external: bool) {
        self.external = external;
    }

    /// Effective pixel scale. Pixel density 1 pins it to 1; otherwise
    /// `current` is asked for the display's live scale on every call, since
    /// the window may have moved to another monitor.
    pub fn pixel_scale(&self, current: impl FnOnce() -> f64) -> f64 {
        if self.pixel_density <= 1 {
            return 1.0;
        }

        let scale = current();
        if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        }
    }

    /// Applies a program-driven size. Non-positive dimensions clamp to 1.
    /// Returns `None` when logical size and scale are unchanged.
    pub fn set_size(
        &mut self,
        width: i32,
        height: i32,
        scale: f64,
    ) -> Option<Resize> {
        let logical = [width.max(1) as u32, height.max(1) as u32];

        if !self.placeholder
            && logical == self.logical
            && scale == self.scale
        {
            return None;
        }

        self.logical = logical;
        self.scale = scale;
        self.physical = physical_from_logical(logical, scale);
        self.placeholder = false;

        Some(Resize {
            logical: self.logical,
            physical: self.physical,
            scale,
            resize_window: !self.external,
        })
    }

    /// Applies a resize reported by the window system in physical pixels by
    /// funnelling it through [`Geometry::set_size`]. A zero dimension means
    /// the window was minimized; the sketch keeps its last real size.
    pub fn resize_from_physical(
        &mut self,
        physical: [u32; 2],
        scale: f64,
    ) -> Option<Resize> {
        if physical[0] == 0 || physical[1] == 0 {
            return None;
        }

        let [width, height] = logical_from_physical(physical, scale);
        self.set_size(width as i32, height as i32, scale)
    }

    /// Converts a physical-pixel position into sketch space, rounding down.
    pub fn to_logical_point(&self, x: f64, y: f64) -> (i32, i32) {
        scale_point(x, y, self.scale)
    }
}

pub fn physical_from_logical(logical: [u32; 2], scale: f64) -> [u32; 2] {
    [
        ((logical[0] as f64 * scale).round() as u32).max(1),
        ((logical[1] as f64 * scale).round() as u32).max(1),
    ]
}

pub fn logical_from_physical(physical: [u32; 2], scale: f64) -> [u32; 2] {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    [
        ((physical[0] as f64 / scale).floor() as u32).max(1),
        ((physical[1] as f64 / scale).floor() as u32).max(1),
    ]
}

pub fn scale_point(x: f64, y: f64, scale: f64) -> (i32, i32) {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    ((x / scale).floor() as i32, (y / scale).floor() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_as_placeholder() {
        let geometry = Geometry::new(1);
        assert!(geometry.is_placeholder());
        assert_eq!(geometry.logical_size(), [1, 1]);
        assert_eq!(geometry.physical_size(), [1, 1]);
    }

    #[test]
    fn physical_is_logical_times_scale() {
        for scale in [1.0, 2.0, 3.0] {
            for (w, h) in [(1, 1), (100, 100), (640, 360), (1921, 7)] {
                let mut geometry = Geometry::new(2);
                let resize = geometry.set_size(w, h, scale).unwrap();
                assert_eq!(
                    resize.physical,
                    [(w as f64 * scale) as u32, (h as f64 * scale) as u32]
                );
                assert_eq!(geometry.physical_size(), resize.physical);
            }
        }
    }

    #[test]
    fn repeated_size_is_noop() {
        let mut geometry = Geometry::new(1);
        assert!(geometry.set_size(400, 300, 1.0).is_some());
        assert!(geometry.set_size(400, 300, 1.0).is_none());
        assert!(geometry.set_size(400, 300, 2.0).is_some());
    }

    #[test]
    fn minimized_window_keeps_sketch_size() {
        let mut geometry = Geometry::new(1);
        geometry.set_size(400, 300, 1.0);

        assert!(geometry.resize_from_physical([0, 0], 1.0).is_none());
        assert!(geometry.resize_from_physical([0, 300], 1.0).is_none());
        assert_eq!(geometry.logical_size(), [400, 300]);
        assert_eq!(geometry.physical_size(), [400, 300]);

        assert!(geometry.resize_from_physical([400, 300], 1.0).is_none());
    }

    #[test]
    fn non_positive_dimensions_clamp_to_one() {
        let mut geometry = Geometry::new(1);
        let resize = geometry.set_size(0, -20, 1.0).unwrap();
        assert_eq!(resize.logical, [1, 1]);

        let resize = geometry.set_size(50, 0, 2.0).unwrap();
        assert_eq!(resize.logical, [50, 1]);
        assert_eq!(resize.physical, [100, 2]);
    }

    #[test]
    fn pixel_scale_ignores_display_without_density() {
        let geometry = Geometry::new(1);
        assert_eq!(geometry.pixel_scale(|| 2.0), 1.0);

        let geometry = Geometry::new(2);
        assert_eq!(geometry.pixel_scale(|| 2.0), 2.0);
        assert_eq!(geometry.pixel_scale(|| 1.5), 1.5);
        assert_eq!(geometry.pixel_scale(|| f64::NAN), 1.0);
    }

    #[test]
    fn os_resize_converges_with_program_resize() {
        let mut geometry = Geometry::new(2);
        geometry.set_size(400, 300, 2.0);

        let resize = geometry.resize_from_physical([1600, 1200], 2.0).unwrap();
        assert_eq!(resize.logical, [800, 600]);
        assert_eq!(resize.physical, [1600, 1200]);

        assert!(geometry.set_size(800, 600, 2.0).is_none());
        assert!(geometry.resize_from_physical([1600, 1200], 2.0).is_none());
    }

    #[test]
    fn external_surfaces_leave_the_window_alone() {
        let mut geometry = Geometry::new(1);
        geometry.set_external(true);
        let resize = geometry.set_size(320, 240, 1.0).unwrap();
        assert!(!resize.resize_window);
    }

    #[test]
    fn points_round_down() {
        let mut geometry = Geometry::new(2);
        geometry.set_size(100, 100, 2.0);
        assert_eq!(geometry.to_logical_point(199.0, 3.0), (99, 1));
        assert_eq!(geometry.to_logical_point(0.9, 0.0), (0, 0));
    }
}
