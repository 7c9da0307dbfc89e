//! Turns the scene's shapes into the packed shape buffer.

use crate::gpu_types::ShapeGpu;
use crate::shape::ShapeEntity;

/// Serializes `shapes` sorted by operation: unions first, then blends, then cuts.
///
/// The sort is stable, so shapes sharing an operation keep their scene order.
#[must_use]
pub fn collect(shapes: &[ShapeEntity]) -> Vec<ShapeGpu> {
    let mut ordered: Vec<&ShapeEntity> = shapes.iter().collect();
    ordered.sort_by_key(|shape| shape.operation);
    ordered.into_iter().map(ShapeGpu::from).collect()
}

/// Byte view of a collected shape list, `len * 56` bytes.
#[must_use]
pub fn as_bytes(records: &[ShapeGpu]) -> &[u8] {
    bytemuck::cast_slice(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Operation, ShapeType};
    use glam::Vec3;

    fn shape(name: &str, operation: Operation) -> ShapeEntity {
        ShapeEntity { name: name.into(), ..ShapeEntity::new(ShapeType::Sphere, Vec3::ZERO, Vec3::ONE) }
            .with_operation(operation)
    }

    #[test]
    fn empty_scene_gives_empty_buffer() {
        let records = collect(&[]);
        assert!(records.is_empty());
        assert!(as_bytes(&records).is_empty());
    }

    #[test]
    fn byte_length_is_count_times_stride() {
        let shapes: Vec<_> = (0..5).map(|i| shape(&i.to_string(), Operation::None)).collect();
        assert_eq!(as_bytes(&collect(&shapes)).len(), 5 * 56);
    }

    #[test]
    fn records_sorted_by_operation() {
        let shapes = [
            shape("cut", Operation::Cut),
            shape("blend", Operation::Blend),
            shape("none", Operation::None),
        ];
        let ops: Vec<i32> = collect(&shapes).iter().map(|r| r.operation).collect();
        assert_eq!(ops, vec![0, 1, 2]);
    }

    #[test]
    fn ties_keep_scene_order() {
        let mut shapes = Vec::new();
        for i in 0..6 {
            let op = if i % 2 == 0 { Operation::Cut } else { Operation::None };
            let mut s = shape("", op);
            s.transform.position.x = i as f32;
            shapes.push(s);
        }
        let xs: Vec<f32> = collect(&shapes).iter().map(|r| r.position[0]).collect();
        assert_eq!(xs, vec![1.0, 3.0, 5.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn mixed_scene_decodes_back_in_operation_order() {
        use compute::layout::{ShapeRecord, OP_BLEND, OP_CUT, OP_NONE, SHAPE_CUBE, SHAPE_SPHERE, SHAPE_TORUS};

        let shapes = [
            ShapeEntity::new(ShapeType::Sphere, Vec3::new(0.0, 1.0, 0.0), Vec3::splat(1.5))
                .with_operation(Operation::Cut)
                .with_color([0.9, 0.1, 0.1]),
            ShapeEntity::new(ShapeType::Cube, Vec3::new(-2.0, 0.0, 1.0), Vec3::new(4.0, 0.5, 4.0))
                .with_color([0.2, 0.7, 0.3]),
            ShapeEntity::new(ShapeType::Torus, Vec3::new(1.0, 2.0, -3.0), Vec3::new(2.0, 1.0, 2.0))
                .with_operation(Operation::Blend)
                .with_blend_strength(0.4)
                .animated(false),
            ShapeEntity::new(ShapeType::Sphere, Vec3::new(0.5, -0.5, 0.25), Vec3::ONE)
                .with_operation(Operation::Blend)
                .with_blend_strength(0.75)
                .animated(true),
            ShapeEntity::new(ShapeType::Cube, Vec3::new(3.0, 0.0, 0.0), Vec3::splat(0.5))
                .with_operation(Operation::Cut),
            ShapeEntity::new(ShapeType::Torus, Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 0.5, 1.0))
                .with_color([0.0, 0.0, 1.0]),
        ];

        let records = collect(&shapes);
        let decoded = ShapeRecord::decode_all(as_bytes(&records)).unwrap();
        assert_eq!(decoded.len(), shapes.len());

        // unions in scene order, then blends, then cuts
        let expected_order = [1, 5, 2, 3, 0, 4];
        for (record, &index) in decoded.iter().zip(&expected_order) {
            let shape = &shapes[index];
            assert_eq!(record.position, shape.transform.position.to_array(), "shape {index}");
            assert_eq!(record.scale, shape.transform.scale.to_array(), "shape {index}");
            assert_eq!(record.color, shape.color, "shape {index}");
            assert_eq!(record.blend_strength, shape.blend_strength, "shape {index}");
            assert_eq!(record.shape_type, shape.shape_type.code(), "shape {index}");
            assert_eq!(record.operation, shape.operation.code(), "shape {index}");
            assert_eq!(record.is_animated, i32::from(shape.is_animated), "shape {index}");
            assert_eq!(record.animate_sphere_radius, i32::from(shape.animate_sphere_radius), "shape {index}");
        }

        let ops: Vec<i32> = decoded.iter().map(|r| r.operation).collect();
        assert_eq!(ops, [OP_NONE, OP_NONE, OP_BLEND, OP_BLEND, OP_CUT, OP_CUT]);
        let types: Vec<i32> = decoded.iter().map(|r| r.shape_type).collect();
        assert_eq!(types, [SHAPE_CUBE, SHAPE_TORUS, SHAPE_TORUS, SHAPE_SPHERE, SHAPE_SPHERE, SHAPE_CUBE]);
        assert_eq!((decoded[3].is_animated, decoded[3].animate_sphere_radius), (1, 1));
        assert_eq!((decoded[2].is_animated, decoded[2].animate_sphere_radius), (1, 0));
    }

    #[test]
    fn collecting_does_not_touch_the_scene() {
        let shapes = vec![shape("a", Operation::Cut), shape("b", Operation::None)];
        let before = shapes.clone();
        let _ = collect(&shapes);
        assert_eq!(shapes, before);
    }
}
