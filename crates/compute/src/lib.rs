#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

use std::sync::Arc;
use thiserror::Error;

pub mod backend;
pub mod layout;
pub mod params;
pub mod reflect;
pub mod resource;

#[cfg(feature = "cpu")]
pub mod cpu_backend;
#[cfg(feature = "cpu")]
pub mod kernels;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::ComputeBackend;
pub use params::{KernelParams, ParamValue};
pub use resource::{BufferHandle, ImageDesc, ImageFormat, ImageHandle, ResourceStats};

#[cfg(feature = "cpu")]
pub use cpu_backend::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("buffer shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("backend not available")]
    BackendUnavailable,
    #[error("kernel parameter `{0}` is not bound")]
    MissingParam(&'static str),
    #[error("kernel parameter `{name}` expects {expected}, got {found}")]
    ParamType {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown buffer handle {0:?}")]
    UnknownBuffer(BufferHandle),
    #[error("unknown image handle {0:?}")]
    UnknownImage(ImageHandle),
    #[error("image is {actual:?}, expected {expected:?}")]
    ImageSizeMismatch { expected: (u32, u32), actual: (u32, u32) },
    #[error("blit source and destination are both {0:?}")]
    SameImage(ImageHandle),
    #[error("image {0:?} was not created with random write access")]
    NotWritable(ImageHandle),
    #[error("kernel writes {expected:?}, image is {actual:?}")]
    FormatMismatch { expected: ImageFormat, actual: ImageFormat },
    #[error("kernel reflection failed: {0}")]
    Reflection(String),
    #[error("device allocation failed: {0}")]
    Allocation(String),
    #[error("image readback failed")]
    Readback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Marches one ray per destination pixel through the shape buffer.
    Raymarch,
}

impl Kernel {
    #[must_use]
    pub const fn binding_count(&self) -> u32 {
        layout::binding_count(self)
    }

    #[must_use]
    pub const fn entry_point(&self) -> &'static str {
        match self {
            Kernel::Raymarch => "main",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Kernel::Raymarch => "raymarch",
        }
    }

    /// WGSL source of the kernel.
    #[must_use]
    pub const fn source(&self) -> &'static str {
        match self {
            Kernel::Raymarch => include_str!("../../../shaders/raymarch.wgsl"),
        }
    }
}

/// Borrowed bytes to upload, interpreted as `len / element_size_in_bytes`
/// elements.
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    pub data: &'a [u8],
    pub element_size_in_bytes: usize,
}

impl<'a> BufferView<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8], element_size_in_bytes: usize) -> Self {
        Self { data, element_size_in_bytes }
    }

    #[must_use]
    pub const fn element_count(&self) -> usize {
        if self.element_size_in_bytes == 0 {
            0
        } else {
            self.data.len() / self.element_size_in_bytes
        }
    }

    /// Checks that the bytes form a whole number of elements.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.element_size_in_bytes == 0 {
            return Err(ComputeError::ShapeMismatch("element size must be non-zero"));
        }
        if self.data.len() % self.element_size_in_bytes != 0 {
            return Err(ComputeError::ShapeMismatch(
                "buffer data length is not a multiple of the element size",
            ));
        }
        Ok(())
    }
}

/// Picks the best available backend: a GPU when the `gpu` feature is on and
/// an adapter exists, otherwise the CPU reference backend.
#[must_use]
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    #[cfg(feature = "gpu")]
    {
        match WgpuBackend::try_new() {
            Ok(gpu) => {
                tracing::info!("Using wgpu backend.");
                return Arc::new(gpu);
            }
            Err(e) => tracing::warn!("wgpu backend initialization failed ({e}), falling back..."),
        }
    }

    #[cfg(feature = "cpu")]
    {
        tracing::info!("Using CPU backend.");
        Arc::new(CpuBackend::new())
    }

    #[cfg(not(feature = "cpu"))]
    {
        compile_error!(
            "No compute backend available. Enable the 'cpu' feature or ensure a GPU backend can initialize."
        );
    }
}
