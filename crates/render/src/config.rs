use glam::Vec3;
use serde::Deserialize;

/// Renderer settings, usually read from the `render` block of a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Light position used when the scene has no light.
    pub fallback_light: Vec3,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { fallback_light: Vec3::new(0.0, 10.0, 0.0) }
    }
}
