use std::io::Write;

use easel::prelude::*;

#[test]
fn yaml_overrides_defaults() {
    let config = SurfaceConfig::from_yaml_str(
        "title: sketch\nwidth: 320\nheight: 240\nrenderer: software\n\
         tier: gl3\npixel_density: 2\nframe_rate: 30\n",
    )
    .expect("parse config");

    assert_eq!(config.title, "sketch");
    assert_eq!((config.width, config.height), (320, 240));
    assert_eq!(config.renderer, RendererKind::Software);
    assert_eq!(config.tier, Tier::Gl3);
    assert_eq!(config.pixel_density, 2);
    assert_eq!(config.frame_rate, 30.0);
    assert!(config.visible);
    assert_eq!(config.location, None);
}

#[test]
fn invalid_density_is_rejected() {
    let err = SurfaceConfig::from_yaml_str("pixel_density: 3\n")
        .expect_err("density 3");
    assert!(matches!(err, SurfaceError::Config(_)));
}

#[test]
fn load_reads_from_disk() {
    let path = std::env::temp_dir()
        .join(format!("easel-config-{}.yaml", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "width: 64\nheight: 32\nlocation: [10, 20]")
            .expect("write");
    }

    let config = SurfaceConfig::load(&path).expect("load");
    std::fs::remove_file(&path).ok();

    assert_eq!((config.width, config.height), (64, 32));
    assert_eq!(config.location, Some([10, 20]));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = SurfaceConfig::load("/nonexistent/easel.yaml")
        .expect_err("missing file");
    assert!(matches!(err, SurfaceError::Config(_)));
}
