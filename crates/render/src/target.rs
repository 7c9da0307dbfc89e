//! The intermediate image the raymarch kernel writes into.

use std::sync::Arc;

use compute::{ComputeBackend, ComputeError, ImageDesc, ImageFormat, ImageHandle};

/// Float, random-write target. Only the raymarch kernel's format is supported.
pub const TARGET_FORMAT: ImageFormat = ImageFormat::Rgba32Float;

struct Target {
    handle: ImageHandle,
    width: u32,
    height: u32,
}

/// Owns one cached render target, reallocated only on a size change.
pub struct RenderTargetManager {
    backend: Arc<dyn ComputeBackend>,
    target: Option<Target>,
    allocations: u64,
}

impl RenderTargetManager {
    #[must_use]
    pub fn new(backend: Arc<dyn ComputeBackend>) -> Self {
        Self { backend, target: None, allocations: 0 }
    }

    /// Returns a target of exactly `width` x `height`.
    ///
    /// The cached target is returned unchanged when the size matches.
    /// Otherwise the old one is released before a new one is allocated.
    pub fn ensure_target(&mut self, width: u32, height: u32) -> Result<ImageHandle, ComputeError> {
        if let Some(target) = &self.target {
            if target.width == width && target.height == height {
                return Ok(target.handle);
            }
        }

        if let Some(old) = self.target.take() {
            tracing::debug!("render target resized {}x{} -> {width}x{height}", old.width, old.height);
            self.backend.release_image(old.handle);
        }

        let desc = ImageDesc::new(width, height, TARGET_FORMAT).with_random_write();
        let handle = self.backend.create_image("raymarch target", desc)?;
        self.target = Some(Target { handle, width, height });
        self.allocations += 1;
        Ok(handle)
    }

    /// Current target, if one has been allocated.
    #[must_use]
    pub fn current(&self) -> Option<ImageHandle> {
        self.target.as_ref().map(|t| t.handle)
    }

    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(|t| (t.width, t.height))
    }

    /// Number of targets allocated over the manager's lifetime.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}

impl Drop for RenderTargetManager {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            self.backend.release_image(target.handle);
        }
    }
}
