//! Per-frame SDF raymarching on top of a [`compute::ComputeBackend`].
//!
//! Each frame the [`Compositor`] collects the scene's shapes into a packed
//! buffer, uploads it, dispatches the raymarch kernel into a cached float
//! render target and blits the result onto the caller's destination image.

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub mod camera;
pub mod collector;
pub mod compositor;
pub mod config;
pub mod error;
pub mod gpu_types;
pub mod scene;
pub mod shape;
pub mod target;
pub mod upload;

pub use camera::CameraState;
pub use collector::{as_bytes, collect};
pub use compositor::{dispatch_grid, Compositor, FrameClock, FrameStats};
pub use config::RenderConfig;
pub use error::FrameError;
pub use gpu_types::{FrameUniforms, ShapeGpu};
pub use scene::{Scene, SceneQuery};
pub use shape::{Operation, ShapeEntity, ShapeType, Transform};
pub use target::RenderTargetManager;
pub use upload::{upload, FrameShapeBuffer};
