use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::runtime::pacer::DEFAULT_FRAME_RATE;
use crate::surface::profile::Tier;
use crate::surface::{RendererKind, SizeProvider};

pub const DEFAULT_WIDTH: u32 = 100;
pub const DEFAULT_HEIGHT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub renderer: RendererKind,
    pub tier: Tier,
    pub smooth: u32,
    pub pixel_density: u32,
    pub frame_rate: f32,
    pub resizable: bool,
    pub always_on_top: bool,
    pub visible: bool,
    /// Embedded in a foreign container that owns the window geometry.
    pub external: bool,
    pub location: Option<[i32; 2]>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            title: "easel".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            renderer: RendererKind::Accelerated,
            tier: Tier::Es2,
            smooth: 2,
            pixel_density: 1,
            frame_rate: DEFAULT_FRAME_RATE,
            resizable: false,
            always_on_top: false,
            visible: true,
            external: false,
            location: None,
        }
    }
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, SurfaceError> {
        let config: Self = serde_yml::from_str(source)
            .map_err(|err| SurfaceError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SurfaceError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| {
            SurfaceError::Config(format!(
                "failed to read '{}': {}",
                path.display(),
                err
            ))
        })?;
        Self::from_yaml_str(&source)
    }

    pub fn validate(&self) -> Result<(), SurfaceError> {
        if self.width == 0 || self.height == 0 {
            return Err(SurfaceError::Config(format!(
                "size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        if !matches!(self.pixel_density, 1 | 2) {
            return Err(SurfaceError::Config(format!(
                "pixel_density must be 1 or 2, got {}",
                self.pixel_density
            )));
        }

        if !self.frame_rate.is_finite() {
            return Err(SurfaceError::Config(
                "frame_rate must be a finite number".to_string(),
            ));
        }

        Ok(())
    }
}

impl SizeProvider for SurfaceConfig {
    fn sketch_width(&self) -> u32 {
        self.width
    }

    fn sketch_height(&self) -> u32 {
        self.height
    }

    fn sketch_pixel_density(&self) -> u32 {
        self.pixel_density
    }

    fn sketch_smooth(&self) -> u32 {
        self.smooth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_yaml_over_defaults() {
        let config = SurfaceConfig::from_yaml_str(
            "
title: Spiral
width: 640
height: 360
tier: gl3
smooth: 4
resizable: true
location: [20, 40]
",
        )
        .expect("valid config");

        assert_eq!(config.title, "Spiral");
        assert_eq!([config.width, config.height], [640, 360]);
        assert_eq!(config.tier, Tier::Gl3);
        assert_eq!(config.smooth, 4);
        assert!(config.resizable);
        assert_eq!(config.location, Some([20, 40]));
        assert_eq!(config.renderer, RendererKind::Accelerated);
        assert_eq!(config.frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn parses_renderer_kind() {
        let config =
            SurfaceConfig::from_yaml_str("renderer: headless").unwrap();
        assert_eq!(config.renderer, RendererKind::Headless);
    }

    #[test]
    fn rejects_zero_size() {
        let err = SurfaceConfig::from_yaml_str("width: 0").unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn rejects_unknown_pixel_density() {
        let err =
            SurfaceConfig::from_yaml_str("pixel_density: 3").unwrap_err();
        assert!(err.to_string().contains("pixel_density"));
    }

    #[test]
    fn keeps_out_of_range_frame_rate_for_the_pacer_to_clamp() {
        let config =
            SurfaceConfig::from_yaml_str("frame_rate: 5000").unwrap();
        assert_eq!(config.frame_rate, 5000.0);
    }
}
