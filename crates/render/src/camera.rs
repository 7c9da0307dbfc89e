//! Camera state the compositor reads every frame.

use glam::{Mat4, Vec3};
use serde::Deserialize;

/// Camera as seen by the kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World-to-camera transform.
    pub view: Mat4,
    pub inverse_projection: Mat4,
    /// Viewport width in pixels
    pub pixel_width: u32,
    /// Viewport height in pixels
    pub pixel_height: u32,
}

impl CameraState {
    /// Right-handed perspective camera at `eye` looking at `target`.
    #[must_use]
    pub fn look_at(eye: Vec3, target: Vec3, fov_y_degrees: f32, pixel_width: u32, pixel_height: u32) -> Self {
        let aspect = pixel_width as f32 / pixel_height.max(1) as f32;
        let projection = Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, 0.1, 100.0);
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            inverse_projection: projection.inverse(),
            pixel_width,
            pixel_height,
        }
    }

    #[must_use]
    pub fn camera_to_world(&self) -> Mat4 {
        self.view.inverse()
    }
}

/// Serialized camera of a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraDesc {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self { eye: Vec3::new(0.0, 1.0, 6.0), target: Vec3::ZERO, fov_y_degrees: 60.0, width: 640, height: 360 }
    }
}

impl From<&CameraDesc> for CameraState {
    fn from(desc: &CameraDesc) -> Self {
        CameraState::look_at(desc.eye, desc.target, desc.fov_y_degrees, desc.width, desc.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_to_world_recovers_eye() {
        let eye = Vec3::new(3.0, 2.0, 8.0);
        let camera = CameraState::look_at(eye, Vec3::ZERO, 45.0, 800, 600);
        let recovered = camera.camera_to_world().w_axis.truncate();
        assert!((recovered - eye).length() < 1e-4, "eye {recovered:?}");
    }

    #[test]
    fn inverse_projection_undoes_projection() {
        let camera = CameraState::look_at(Vec3::Z, Vec3::ZERO, 60.0, 320, 240);
        let projection = camera.inverse_projection.inverse();
        let product = projection * camera.inverse_projection;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}
