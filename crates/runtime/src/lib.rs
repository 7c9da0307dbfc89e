//! Headless host for the SDF compositor: loads a JSON scene, renders a run
//! of frames and writes the last one as a PNG.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_precision_loss, clippy::missing_errors_doc)]

mod app;
mod cli;
mod sky;

pub use app::{run, RunSummary};
pub use cli::{Args, BackendChoice};
pub use sky::sky_gradient;
