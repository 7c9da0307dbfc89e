use compute::ComputeError;
use thiserror::Error;

/// Why a frame was dropped.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("viewport {width}x{height} has zero area")]
    EmptyViewport { width: u32, height: u32 },
    #[error("{0} shapes do not fit the kernel's shape count")]
    TooManyShapes(usize),
    #[error(transparent)]
    Compute(#[from] ComputeError),
}
