//! Per-frame upload of the shape buffer.

use compute::layout::SHAPE_STRIDE;
use compute::{BufferHandle, BufferView, ComputeBackend, ComputeError};

use crate::collector::as_bytes;
use crate::gpu_types::ShapeGpu;

/// Device copy of this frame's shapes. Released when dropped.
pub struct FrameShapeBuffer<'a> {
    backend: &'a dyn ComputeBackend,
    handle: BufferHandle,
    count: usize,
    released: bool,
}

impl FrameShapeBuffer<'_> {
    /// Handle to bind; valid while the guard lives.
    #[must_use]
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.count * SHAPE_STRIDE
    }

    /// Releases the device buffer now instead of at end of scope.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.backend.release_buffer(self.handle);
            tracing::trace!("released shape buffer {:?}", self.handle);
        }
    }
}

impl Drop for FrameShapeBuffer<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Allocates a buffer of exactly `records.len() * 56` bytes holding `records`.
pub fn upload<'a>(backend: &'a dyn ComputeBackend, records: &[ShapeGpu]) -> Result<FrameShapeBuffer<'a>, ComputeError> {
    let bytes = as_bytes(records);
    let handle = backend.create_buffer("shapes", &BufferView::new(bytes, SHAPE_STRIDE))?;
    Ok(FrameShapeBuffer { backend, handle, count: records.len(), released: false })
}
