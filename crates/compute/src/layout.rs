//! Binary contract between the host and the raymarch kernel.
//!
//! Binding slots and the structs below must match `shaders/raymarch.wgsl`
//! byte for byte.

use bytemuck::{Pod, Zeroable};

use crate::{ComputeError, KernelParams};

pub const TEXTURE_SOURCE: u32 = 0;
pub const STORAGE_DEST: u32 = 1;
pub const STORAGE_SHAPES: u32 = 2;
pub const UNIFORM_FRAME: u32 = 3;

/// Parameter names understood by [`crate::Kernel::Raymarch`].
pub mod names {
    pub const SOURCE: &str = "source";
    pub const DESTINATION: &str = "destination";
    pub const SHAPES: &str = "shapes";
    pub const SHAPE_COUNT: &str = "shape_count";
    pub const LIGHT_POSITION: &str = "light_position";
    pub const CAMERA_TO_WORLD: &str = "camera_to_world";
    pub const CAMERA_INVERSE_PROJECTION: &str = "camera_inverse_projection";
    pub const TIME: &str = "time";
}

/// Return expected number of bindings for each kernel.
#[must_use]
pub const fn binding_count(kernel: &crate::Kernel) -> u32 {
    match kernel {
        crate::Kernel::Raymarch => 4,
    }
}

pub const SHAPE_STRIDE: usize = 56;

pub const SHAPE_SPHERE: i32 = 0;
pub const SHAPE_CUBE: i32 = 1;
pub const SHAPE_TORUS: i32 = 2;

pub const OP_NONE: i32 = 0;
pub const OP_BLEND: i32 = 1;
pub const OP_CUT: i32 = 2;

/// Kernel-side view of one element of the shape buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShapeRecord {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub color: [f32; 3],
    pub blend_strength: f32,
    pub shape_type: i32,
    pub operation: i32,
    pub is_animated: i32,
    pub animate_sphere_radius: i32,
}

const _: () = assert!(std::mem::size_of::<ShapeRecord>() == SHAPE_STRIDE);

impl ShapeRecord {
    /// Decodes a packed shape buffer. Trailing bytes that do not form a whole
    /// record are rejected.
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Self>, ComputeError> {
        if bytes.len() % SHAPE_STRIDE != 0 {
            return Err(ComputeError::ShapeMismatch(
                "shape buffer length is not a multiple of the record stride",
            ));
        }
        Ok(bytes.chunks_exact(SHAPE_STRIDE).map(bytemuck::pod_read_unaligned).collect())
    }
}

/// Uniform block bound at [`UNIFORM_FRAME`].
///
/// WGSL aligns `vec3<f32>` to 16 bytes, so `shape_count` packs into the
/// light position's fourth lane and the block is padded to 160 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameBlock {
    pub camera_to_world: [[f32; 4]; 4],
    pub camera_inverse_projection: [[f32; 4]; 4],
    pub light_position: [f32; 3],
    pub shape_count: i32,
    pub time: f32,
    pub _pad: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<FrameBlock>() == 160);

impl FrameBlock {
    /// Gathers the scalar, vector and matrix parameters of a raymarch dispatch.
    pub fn from_params(params: &KernelParams) -> Result<Self, ComputeError> {
        let light = params.vector(names::LIGHT_POSITION)?;
        Ok(Self {
            camera_to_world: params.matrix(names::CAMERA_TO_WORLD)?,
            camera_inverse_projection: params.matrix(names::CAMERA_INVERSE_PROJECTION)?,
            light_position: [light[0], light[1], light[2]],
            shape_count: params.int(names::SHAPE_COUNT)?,
            time: params.float(names::TIME)?,
            _pad: [0.0; 3],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn shape_record_offsets_match_kernel() {
        assert_eq!(offset_of!(ShapeRecord, position), 0);
        assert_eq!(offset_of!(ShapeRecord, scale), 12);
        assert_eq!(offset_of!(ShapeRecord, color), 24);
        assert_eq!(offset_of!(ShapeRecord, blend_strength), 36);
        assert_eq!(offset_of!(ShapeRecord, shape_type), 40);
        assert_eq!(offset_of!(ShapeRecord, operation), 44);
        assert_eq!(offset_of!(ShapeRecord, is_animated), 48);
        assert_eq!(offset_of!(ShapeRecord, animate_sphere_radius), 52);
    }

    #[test]
    fn frame_block_offsets_match_kernel() {
        assert_eq!(offset_of!(FrameBlock, camera_to_world), 0);
        assert_eq!(offset_of!(FrameBlock, camera_inverse_projection), 64);
        assert_eq!(offset_of!(FrameBlock, light_position), 128);
        assert_eq!(offset_of!(FrameBlock, shape_count), 140);
        assert_eq!(offset_of!(FrameBlock, time), 144);
    }

    #[test]
    fn decode_rejects_partial_records() {
        let bytes = vec![0u8; SHAPE_STRIDE + 4];
        assert!(matches!(ShapeRecord::decode_all(&bytes), Err(ComputeError::ShapeMismatch(_))));
    }

    #[test]
    fn decode_reads_unaligned_bytes() {
        let record = ShapeRecord {
            position: [1.0, 2.0, 3.0],
            scale: [0.5; 3],
            color: [0.1, 0.2, 0.3],
            blend_strength: 0.7,
            shape_type: SHAPE_TORUS,
            operation: OP_CUT,
            is_animated: 1,
            animate_sphere_radius: 0,
        };
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(bytemuck::bytes_of(&record));
        let decoded = ShapeRecord::decode_all(&bytes[1..]).unwrap();
        assert_eq!(decoded, vec![record]);
    }

    #[test]
    fn frame_block_requires_every_uniform() {
        let mut params = KernelParams::new();
        params.set_vector(names::LIGHT_POSITION, [0.0, 5.0, 0.0, 1.0]);
        let err = FrameBlock::from_params(&params).unwrap_err();
        assert!(matches!(err, ComputeError::MissingParam(names::CAMERA_TO_WORLD)), "{err:?}");
    }
}
