use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use compute::{ComputeBackend, ImageDesc, ImageFormat};
use render::{Compositor, FrameClock, Scene, SceneQuery};
use tracing::{debug, error, info};

use crate::cli::{Args, BackendChoice};
use crate::sky::sky_gradient;

/// Outcome of a [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_rendered: u32,
    pub frames_dropped: u32,
    pub output: PathBuf,
    pub size: (u32, u32),
}

fn select_backend(choice: BackendChoice) -> Result<Arc<dyn ComputeBackend>> {
    match choice {
        BackendChoice::Auto => Ok(compute::default_backend()),
        BackendChoice::Cpu => Ok(Arc::new(compute::CpuBackend::new())),
        #[cfg(feature = "gpu")]
        BackendChoice::Gpu => Ok(Arc::new(compute::WgpuBackend::try_new().context("opening wgpu device")?)),
        #[cfg(not(feature = "gpu"))]
        BackendChoice::Gpu => bail!("this build has no GPU backend; rebuild with `--features gpu`"),
    }
}

/// Renders `args.frames` frames of the scene and writes the last one.
///
/// Dropped frames are logged and counted; the run only fails on setup or
/// output errors.
pub fn run(args: &Args) -> Result<RunSummary> {
    let json = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("reading scene {}", args.scene.display()))?;
    let mut scene = Scene::from_json(&json).with_context(|| format!("parsing scene {}", args.scene.display()))?;
    if args.width.is_some() || args.height.is_some() {
        let camera = scene.camera;
        scene.set_viewport(args.width.unwrap_or(camera.width), args.height.unwrap_or(camera.height));
    }
    let camera = scene.camera();
    let (width, height) = (camera.pixel_width, camera.pixel_height);
    if width == 0 || height == 0 {
        bail!("viewport {width}x{height} has zero area");
    }
    info!("Loaded {} shapes from {}, viewport {width}x{height}", scene.shapes().len(), args.scene.display());

    let backend = select_backend(args.backend)?;
    let source = backend.create_image("camera", ImageDesc::new(width, height, ImageFormat::Rgba32Float))?;
    backend.write_image(source, &sky_gradient(width, height))?;
    let destination = backend.create_image("screen", ImageDesc::new(width, height, ImageFormat::Rgba8Unorm))?;

    let mut compositor = Compositor::new(backend.clone(), scene.render).with_clock(FrameClock::fixed(args.time_step));
    let mut frames_rendered = 0;
    let mut frames_dropped = 0;
    for i in 0..args.frames {
        match compositor.render(&scene, source, destination) {
            Ok(stats) => {
                frames_rendered += 1;
                debug!("frame {i}: {} shapes in {:?} groups at t={:.3}", stats.shape_count, stats.groups, stats.time);
            }
            Err(e) => {
                frames_dropped += 1;
                error!("Frame {i} dropped: {e}");
            }
        }
    }

    let pixels = backend.read_image(destination)?;
    let mut bytes = Vec::with_capacity(pixels.len() * 4);
    for pixel in pixels {
        ImageFormat::Rgba8Unorm.encode_into(pixel, &mut bytes);
    }
    let png = image::RgbaImage::from_raw(width, height, bytes).context("destination image has the wrong size")?;
    png.save(&args.output).with_context(|| format!("writing {}", args.output.display()))?;

    drop(compositor);
    backend.release_image(source);
    backend.release_image(destination);

    let stats = backend.stats();
    info!(
        "Rendered {frames_rendered} frames ({frames_dropped} dropped) to {}; {} buffers uploaded, {} live images",
        args.output.display(),
        stats.buffers_allocated,
        stats.live_images()
    );
    Ok(RunSummary { frames_rendered, frames_dropped, output: args.output.clone(), size: (width, height) })
}
