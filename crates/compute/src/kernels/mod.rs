// CPU implementations of the kernels in `shaders/`.

pub mod raymarch;
pub use raymarch::run as handle_raymarch;
