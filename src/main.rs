//! deepgaze: webcam head pose tracking and HSV color filtering.

use anyhow::{bail, Context, Result};
use clap::Parser;
use deepgaze::{
    app::{App, AppConfig, AppMode, GuiMode, VideoSource},
    color_detection::HsvRange,
    config::{Config, EXAMPLE_CONFIG},
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use (defaults to the configuration file value)
    #[arg(long)]
    cam: Option<i32>,

    /// Video file to process
    #[arg(short, long)]
    video: Option<String>,

    /// Processing mode (headpose, skin, color, backprojection)
    #[arg(short, long, default_value = "headpose")]
    mode: String,

    /// Template image for the backprojection mode
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Lower HSV bound for the color mode, as H,S,V
    #[arg(long, default_value = "0,0,0")]
    hsv_min: String,

    /// Upper HSV bound for the color mode, as H,S,V
    #[arg(long, default_value = "180,255,255")]
    hsv_max: String,

    /// GUI display mode (all, video, mask, none)
    #[arg(short, long)]
    gui: Option<String>,

    /// Enable debug output and overlays
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

/// Parse "H,S,V" into three bytes
fn parse_hsv(value: &str) -> Result<[u8; 3]> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid HSV triple '{value}'"))?;
    match parts.as_slice() {
        [h, s, v] => Ok([*h, *s, *v]),
        _ => bail!("HSV triple '{value}' must have three components"),
    }
}

fn parse_mode(args: &Args) -> Result<AppMode> {
    match args.mode.as_str() {
        "headpose" => Ok(AppMode::HeadPose),
        "skin" => Ok(AppMode::Skin),
        "color" => {
            let range = HsvRange::new(parse_hsv(&args.hsv_min)?, parse_hsv(&args.hsv_max)?)?;
            Ok(AppMode::Color(range))
        }
        "backprojection" => {
            let template = args
                .template
                .clone()
                .context("The backprojection mode needs --template")?;
            Ok(AppMode::BackProjection(template))
        }
        other => bail!("Unknown mode '{other}'"),
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("deepgaze {}", env!("CARGO_PKG_VERSION"));

    // Load configuration if provided
    let settings = args
        .config
        .as_ref()
        .map_or_else(Config::default, |path| Config::load_or_default(path));

    let gui = args.gui.as_deref().unwrap_or(&settings.display.gui_mode);
    let gui_mode: GuiMode = gui.parse()?;

    let config = AppConfig {
        video_source: if let Some(video_path) = args.video.clone() {
            VideoSource::File(video_path)
        } else {
            VideoSource::Camera(args.cam.unwrap_or(settings.camera.index))
        },
        mode: parse_mode(&args)?,
        gui_mode,
        debug: args.debug || settings.display.debug,
        settings,
    };

    // Create and run application
    let mut app = App::new(config)?;
    app.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hsv() {
        assert_eq!(parse_hsv("0,48,80").unwrap(), [0, 48, 80]);
        assert_eq!(parse_hsv(" 20, 255 ,255").unwrap(), [20, 255, 255]);
        assert!(parse_hsv("1,2").is_err());
        assert!(parse_hsv("1,2,300").is_err());
    }

    #[test]
    fn test_parse_mode() {
        let args = Args::parse_from(["deepgaze", "--mode", "color", "--hsv-min", "10,20,30", "--hsv-max", "40,50,60"]);
        assert_eq!(
            parse_mode(&args).unwrap(),
            AppMode::Color(HsvRange::new([10, 20, 30], [40, 50, 60]).unwrap())
        );

        let args = Args::parse_from(["deepgaze", "--mode", "backprojection"]);
        assert!(parse_mode(&args).is_err());

        let args = Args::parse_from(["deepgaze", "--mode", "backprojection", "--template", "t.png"]);
        assert_eq!(parse_mode(&args).unwrap(), AppMode::BackProjection(PathBuf::from("t.png")));
    }
}
