//! GPU-compatible type definitions for rendering
//!
//! These structs are uploaded verbatim; their layout must match the
//! `Shape` and `Frame` structs in `shaders/raymarch.wgsl`.

use bytemuck::{Pod, Zeroable};
use compute::layout::{names, SHAPE_STRIDE};
use compute::{ImageHandle, KernelParams};
use glam::{Mat4, Vec3};

use crate::shape::ShapeEntity;

/// One serialized shape: ten floats followed by four integer tags.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShapeGpu {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub color: [f32; 3],
    pub blend_strength: f32,
    pub shape_type: i32,
    pub operation: i32,
    /// 0 or 1
    pub is_animated: i32,
    /// 0 or 1
    pub animate_sphere_radius: i32,
}

const _: () = assert!(std::mem::size_of::<ShapeGpu>() == SHAPE_STRIDE);
const _: () = assert!(std::mem::align_of::<ShapeGpu>() == 4);

impl From<&ShapeEntity> for ShapeGpu {
    fn from(shape: &ShapeEntity) -> Self {
        Self {
            position: shape.transform.position.to_array(),
            scale: shape.transform.scale.to_array(),
            color: shape.clamped_color(),
            blend_strength: shape.clamped_blend_strength(),
            shape_type: shape.shape_type.code(),
            operation: shape.operation.code(),
            is_animated: i32::from(shape.is_animated),
            animate_sphere_radius: i32::from(shape.animate_sphere_radius),
        }
    }
}

/// Per-frame uniforms of the raymarch kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub camera_to_world: Mat4,
    pub inverse_projection: Mat4,
    pub light_position: Vec3,
    pub shape_count: i32,
    /// Seconds since the compositor started.
    pub time: f32,
}

impl FrameUniforms {
    /// Binds the uniforms under the kernel's parameter names.
    pub fn bind(&self, params: &mut KernelParams) {
        params
            .set_int(names::SHAPE_COUNT, self.shape_count)
            .set_vector(names::LIGHT_POSITION, self.light_position.extend(1.0).to_array())
            .set_matrix(names::CAMERA_TO_WORLD, self.camera_to_world.to_cols_array_2d())
            .set_matrix(names::CAMERA_INVERSE_PROJECTION, self.inverse_projection.to_cols_array_2d())
            .set_float(names::TIME, self.time);
    }
}

/// Binds the two images of a raymarch dispatch.
pub fn bind_images(params: &mut KernelParams, source: ImageHandle, destination: ImageHandle) {
    params.set_image(names::SOURCE, source).set_image(names::DESTINATION, destination);
}
