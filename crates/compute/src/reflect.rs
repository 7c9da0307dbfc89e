//! Kernel reflection through `naga`.
//!
//! The thread-group size is whatever the kernel declares in
//! `@workgroup_size`; hosts never hardcode it.

use std::sync::OnceLock;

use crate::{ComputeError, Kernel};

/// Parses `source` and returns the workgroup size of the compute entry point `entry`.
pub fn reflect_workgroup_size(source: &str, entry: &str) -> Result<[u32; 3], String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry && ep.stage == naga::ShaderStage::Compute)
        .map(|ep| ep.workgroup_size)
        .ok_or_else(|| format!("no compute entry point named `{entry}`"))
}

/// Cached workgroup size of a built-in kernel.
pub fn workgroup_size(kernel: &Kernel) -> Result<[u32; 3], ComputeError> {
    static RAYMARCH: OnceLock<Result<[u32; 3], String>> = OnceLock::new();

    let cell = match kernel {
        Kernel::Raymarch => &RAYMARCH,
    };
    cell.get_or_init(|| {
        let reflected = reflect_workgroup_size(kernel.source(), kernel.entry_point());
        if let Ok(size) = &reflected {
            tracing::debug!("{kernel:?} declares workgroup size {size:?}");
        }
        reflected
    })
    .clone()
    .map_err(ComputeError::Reflection)
}
