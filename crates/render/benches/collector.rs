use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;
use render::{as_bytes, collect, Operation, ShapeEntity, ShapeType};

fn scene(count: usize) -> Vec<ShapeEntity> {
    let ops = [Operation::Cut, Operation::None, Operation::Blend];
    (0..count)
        .map(|i| {
            ShapeEntity::new(ShapeType::Sphere, Vec3::new(i as f32, 0.0, 0.0), Vec3::ONE)
                .with_operation(ops[i % ops.len()])
        })
        .collect()
}

fn bench_collect(c: &mut Criterion) {
    for count in [16, 1024] {
        let shapes = scene(count);
        c.bench_function(&format!("collect_{count}"), |b| {
            b.iter(|| as_bytes(&collect(black_box(&shapes))).len());
        });
    }
}

criterion_group!(benches, bench_collect);
criterion_main!(benches);
