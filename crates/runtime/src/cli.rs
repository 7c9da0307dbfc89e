use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// GPU when available, otherwise CPU
    Auto,
    Cpu,
    Gpu,
}

/// Render an SDF scene without a window.
#[derive(Debug, Clone, Parser)]
#[command(name = "raymarch", version, about)]
pub struct Args {
    /// Scene description (JSON)
    #[arg(long)]
    pub scene: PathBuf,

    /// Number of frames to render; the last one is written out
    #[arg(long, default_value_t = 1)]
    pub frames: u32,

    /// Viewport width, overriding the scene camera
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height, overriding the scene camera
    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long, value_enum, default_value_t = BackendChoice::Auto)]
    pub backend: BackendChoice,

    /// Where to write the final frame
    #[arg(long, default_value = "raymarch.png")]
    pub output: PathBuf,

    /// Seconds of animation time per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub time_step: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let args = Args::try_parse_from(["raymarch", "--scene", "scene.json"]).unwrap();
        assert_eq!(args.frames, 1);
        assert_eq!(args.backend, BackendChoice::Auto);
        assert_eq!(args.output, PathBuf::from("raymarch.png"));
        assert!(args.width.is_none());
    }

    #[test]
    fn scene_is_required() {
        assert!(Args::try_parse_from(["raymarch"]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "raymarch", "--scene", "s.json", "--frames", "30", "--width", "320", "--height", "200",
            "--backend", "cpu", "--time-step", "0.1",
        ])
        .unwrap();
        assert_eq!(args.frames, 30);
        assert_eq!((args.width, args.height), (Some(320), Some(200)));
        assert_eq!(args.backend, BackendChoice::Cpu);
        assert!((args.time_step - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
