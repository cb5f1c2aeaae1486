//! Configuration file handling

use deepgaze::{
    app::GuiMode,
    color_detection::FilterOptions,
    config::{Config, EXAMPLE_CONFIG},
    face_detection::{CascadeParams, FaceType},
    Error,
};
use opencv::core::Size;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_example_config_loads_and_validates() {
    let file = write_config(EXAMPLE_CONFIG);
    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.tracking.roi_reset_frames, 50);
    assert_eq!(config.cascade.min_size, 40);
}

#[test]
fn test_cascade_params_from_config() {
    let file = write_config(
        "cascade:\n  run_right: false\n  frontal_scale_factor: 1.3\n  min_size: 60\n  rotation_angle: 20.0\n",
    );
    let config = Config::from_file(file.path()).unwrap();
    let params = CascadeParams::from(&config.cascade);

    assert!(!params.run_right);
    assert!(params.run_left);
    assert!((params.frontal_scale_factor - 1.3).abs() < f64::EPSILON);
    assert_eq!(params.min_size, Size::new(60, 60));
    assert!((params.rotation_angle - 20.0).abs() < f64::EPSILON);
    assert_eq!(params.last_face_type, FaceType::None);
    assert!(!params.stage_order().contains(&FaceType::ProfileRight));
}

#[test]
fn test_filter_options_from_config() {
    let file = write_config("color_filter:\n  blur: false\n  kernel_size: 7\n  threshold: 80.0\n");
    let config = Config::from_file(file.path()).unwrap();
    let options = FilterOptions::from(&config.color_filter);

    assert!(options.morph_opening);
    assert!(!options.blur);
    assert_eq!(options.kernel_size, 7);
    assert!((options.threshold - 80.0).abs() < f64::EPSILON);
    assert!(options.validate().is_ok());
}

#[test]
fn test_invalid_values_fall_back_to_defaults() {
    let file = write_config("tracking:\n  roi_reset_frames: 0\n");
    let config = Config::from_file(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    assert_eq!(Config::load_or_default(file.path()), Config::default());
}

#[test]
fn test_unknown_gui_mode_is_rejected() {
    let file = write_config("display:\n  gui_mode: pointers\n");
    let config = Config::from_file(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
}

#[test]
fn test_gui_mode_accepts_command_line_aliases() {
    let file = write_config("display:\n  gui_mode: cam\n");
    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(Config::load_or_default(file.path()).display.gui_mode, "cam");
    assert_eq!(config.display.gui_mode.parse::<GuiMode>().unwrap(), GuiMode::Video);
}

#[test]
fn test_color_filter_checked_like_filter_options() {
    for yaml in [
        "color_filter:\n  kernel_size: 4\n",
        "color_filter:\n  iterations: 0\n",
        "color_filter:\n  threshold: 300.0\n",
    ] {
        let config = Config::from_file(write_config(yaml).path()).unwrap();
        assert!(FilterOptions::from(&config.color_filter).validate().is_err(), "{yaml}");
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))), "{yaml}");
    }

    let file = write_config("color_filter:\n  morph_opening: false\n  iterations: 0\n");
    let config = Config::from_file(file.path()).unwrap();
    assert!(FilterOptions::from(&config.color_filter).validate().is_ok());
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_yaml() {
    let file = write_config("camera: {index: [1, 2}\n");
    assert!(matches!(Config::from_file(file.path()), Err(Error::ConfigError(_))));
}
