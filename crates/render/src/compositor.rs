//! Frame compositor: one raymarch pass per frame, blitted over the caller's image.

use std::sync::Arc;
use std::time::Instant;

use compute::layout::names;
use compute::{ComputeBackend, ImageHandle, Kernel, KernelParams};

use crate::collector::collect;
use crate::config::RenderConfig;
use crate::error::FrameError;
use crate::gpu_types::{bind_images, FrameUniforms};
use crate::scene::SceneQuery;
use crate::target::RenderTargetManager;
use crate::upload::upload;

/// Thread groups needed to cover a `width` x `height` viewport.
#[must_use]
pub fn dispatch_grid(width: u32, height: u32, group_size: [u32; 3]) -> [u32; 3] {
    [width.div_ceil(group_size[0].max(1)), height.div_ceil(group_size[1].max(1)), 1]
}

/// Source of the kernel's elapsed-time uniform.
#[derive(Debug, Clone)]
pub enum FrameClock {
    /// Wall time since the clock was created.
    Realtime { start: Instant },
    /// Advances by `step` seconds per frame, starting at zero.
    Fixed { step: f32, frames: u64 },
}

impl FrameClock {
    #[must_use]
    pub fn realtime() -> Self {
        FrameClock::Realtime { start: Instant::now() }
    }

    #[must_use]
    pub fn fixed(step: f32) -> Self {
        FrameClock::Fixed { step: step.max(0.0), frames: 0 }
    }

    /// Elapsed seconds for the next frame. Never decreases.
    pub fn tick(&mut self) -> f32 {
        match self {
            FrameClock::Realtime { start } => start.elapsed().as_secs_f32(),
            FrameClock::Fixed { step, frames } => {
                let time = *frames as f32 * *step;
                *frames += 1;
                time
            }
        }
    }
}

/// What one successful frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub shape_count: usize,
    pub groups: [u32; 3],
    pub time: f32,
    pub used_fallback_light: bool,
}

/// Renders SDF shapes over a source image once per frame.
///
/// Nothing survives between frames except the cached render target.
pub struct Compositor {
    backend: Arc<dyn ComputeBackend>,
    targets: RenderTargetManager,
    config: RenderConfig,
    clock: FrameClock,
    frame_index: u64,
}

impl Compositor {
    #[must_use]
    pub fn new(backend: Arc<dyn ComputeBackend>, config: RenderConfig) -> Self {
        Self {
            targets: RenderTargetManager::new(backend.clone()),
            backend,
            config,
            clock: FrameClock::realtime(),
            frame_index: 0,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: FrameClock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn targets(&self) -> &RenderTargetManager {
        &self.targets
    }

    /// Raymarches `scene` over `source` and writes the result to `destination`.
    ///
    /// `source` must match the camera's viewport size; `destination` may be
    /// any size and format. On error the frame is dropped and the shape
    /// buffer is still released.
    pub fn render(
        &mut self,
        scene: &dyn SceneQuery,
        source: ImageHandle,
        destination: ImageHandle,
    ) -> Result<FrameStats, FrameError> {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let time = self.clock.tick();

        let camera = scene.camera();
        let (width, height) = (camera.pixel_width, camera.pixel_height);
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyViewport { width, height });
        }
        let (light_position, used_fallback_light) = match scene.light() {
            Some(light) => (light, false),
            None => {
                tracing::debug!("scene has no light, using {:?}", self.config.fallback_light);
                (self.config.fallback_light, true)
            }
        };

        let target = self.targets.ensure_target(width, height)?;

        let records = collect(scene.shapes());
        let shape_count = i32::try_from(records.len()).map_err(|_| FrameError::TooManyShapes(records.len()))?;
        let shapes = upload(self.backend.as_ref(), &records)?;

        let group_size = self.backend.kernel_thread_group_size(&Kernel::Raymarch)?;
        let groups = dispatch_grid(width, height, group_size);

        let mut params = KernelParams::new();
        bind_images(&mut params, source, target);
        params.set_buffer(names::SHAPES, shapes.handle());
        FrameUniforms {
            camera_to_world: camera.camera_to_world(),
            inverse_projection: camera.inverse_projection,
            light_position,
            shape_count,
            time,
        }
        .bind(&mut params);

        self.backend.dispatch(&Kernel::Raymarch, &params, groups)?;
        self.backend.blit(target, destination)?;
        shapes.release();

        tracing::trace!("frame {frame_index}: {} shapes, {groups:?} groups, t={time:.3}", records.len());
        Ok(FrameStats { frame_index, shape_count: records.len(), groups, time, used_fallback_light })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hd_grid_at_eight_by_eight() {
        assert_eq!(dispatch_grid(1920, 1080, [8, 8, 1]), [240, 135, 1]);
    }

    #[test]
    fn partial_groups_round_up() {
        assert_eq!(dispatch_grid(1921, 1081, [8, 8, 1]), [241, 136, 1]);
        assert_eq!(dispatch_grid(1, 1, [8, 8, 1]), [1, 1, 1]);
        assert_eq!(dispatch_grid(100, 30, [16, 4, 1]), [7, 8, 1]);
    }

    #[test]
    fn fixed_clock_steps_from_zero() {
        let mut clock = FrameClock::fixed(0.5);
        assert_eq!(clock.tick(), 0.0);
        assert_eq!(clock.tick(), 0.5);
        assert_eq!(clock.tick(), 1.0);
    }

    #[test]
    fn realtime_clock_is_monotonic() {
        let mut clock = FrameClock::realtime();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b >= a);
    }
}
