//! CPU implementation of `shaders/raymarch.wgsl`.
//!
//! Every function mirrors its WGSL counterpart so the CPU backend can stand
//! in for the GPU in tests and headless runs.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::layout::{FrameBlock, ShapeRecord, OP_BLEND, OP_CUT, SHAPE_CUBE, SHAPE_SPHERE, SHAPE_TORUS};

pub const MAX_DST: f32 = 80.0;
pub const EPSILON: f32 = 0.001;
pub const MAX_STEPS: u32 = 256;

/// Distance and color of the nearest surface at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub color: Vec3,
    pub distance: f32,
}

impl Surface {
    pub const EMPTY: Self = Self { color: Vec3::ONE, distance: MAX_DST };
}

/// Read-only pixel grid, row 0 at the top.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    pub pixels: &'a [[f32; 4]],
    pub width: u32,
    pub height: u32,
}

impl ImageView<'_> {
    fn load(&self, x: u32, y: u32) -> [f32; 4] {
        if x >= self.width || y >= self.height {
            return [0.0; 4];
        }
        self.pixels[(y * self.width + x) as usize]
    }
}

fn shape_center(shape: &ShapeRecord, time: f32) -> Vec3 {
    let mut center = Vec3::from(shape.position);
    if shape.is_animated != 0 {
        center.y += 0.25 * time.sin();
    }
    center
}

/// Signed distance from `p` to a single primitive.
#[must_use]
pub fn shape_distance(shape: &ShapeRecord, p: Vec3, time: f32) -> f32 {
    let scale = Vec3::from(shape.scale);
    let q = p - shape_center(shape, time);
    match shape.shape_type {
        SHAPE_SPHERE => {
            let mut radius = scale.x * 0.5;
            if shape.is_animated != 0 && shape.animate_sphere_radius != 0 {
                radius *= 1.0 + 0.25 * (2.0 * time).sin();
            }
            q.length() - radius
        }
        SHAPE_CUBE => {
            let o = q.abs() - scale * 0.5;
            o.max(Vec3::ZERO).length() + o.max_element().min(0.0)
        }
        SHAPE_TORUS => {
            let ring = Vec2::new(Vec2::new(q.x, q.z).length() - scale.x * 0.5, q.y);
            ring.length() - scale.y * 0.25
        }
        _ => MAX_DST,
    }
}

/// Folds `local` into the accumulated surface with the shape's CSG operation.
///
/// Unknown operation codes behave like a plain union.
#[must_use]
pub fn combine(acc: Surface, local: Surface, operation: i32, k: f32) -> Surface {
    match operation {
        OP_BLEND => {
            let h = (0.5 + 0.5 * (local.distance - acc.distance) / k).clamp(0.0, 1.0);
            Surface {
                distance: lerp(local.distance, acc.distance, h) - k * h * (1.0 - h),
                color: local.color * (1.0 - h) + acc.color * h,
            }
        }
        OP_CUT => {
            if -local.distance > acc.distance {
                Surface { distance: -local.distance, color: local.color }
            } else {
                acc
            }
        }
        _ => {
            if local.distance < acc.distance {
                local
            } else {
                acc
            }
        }
    }
}

// Same form as WGSL `mix`, exact at both ends.
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Evaluates the whole shape list at `p`, left to right.
#[must_use]
pub fn scene(shapes: &[ShapeRecord], p: Vec3, time: f32) -> Surface {
    shapes.iter().fold(Surface::EMPTY, |acc, shape| {
        let local = Surface { color: Vec3::from(shape.color), distance: shape_distance(shape, p, time) };
        combine(acc, local, shape.operation, shape.blend_strength)
    })
}

fn estimate_normal(shapes: &[ShapeRecord], p: Vec3, time: f32) -> Vec3 {
    let d = |offset: Vec3| scene(shapes, p + offset, time).distance - scene(shapes, p - offset, time).distance;
    Vec3::new(d(Vec3::X * EPSILON), d(Vec3::Y * EPSILON), d(Vec3::Z * EPSILON)).normalize()
}

/// Shades one destination pixel. Misses keep `background`.
#[must_use]
pub fn march_pixel(
    frame: &FrameBlock,
    shapes: &[ShapeRecord],
    x: u32,
    y: u32,
    size: (u32, u32),
    background: [f32; 4],
) -> [f32; 4] {
    let camera_to_world = Mat4::from_cols_array_2d(&frame.camera_to_world);
    let inverse_projection = Mat4::from_cols_array_2d(&frame.camera_inverse_projection);
    let light = Vec3::from(frame.light_position);

    let uv = Vec2::new(
        (x as f32 + 0.5) / size.0 as f32 * 2.0 - 1.0,
        1.0 - (y as f32 + 0.5) / size.1 as f32 * 2.0,
    );
    let mut origin = (camera_to_world * Vec4::new(0.0, 0.0, 0.0, 1.0)).truncate();
    let view_dir = (inverse_projection * Vec4::new(uv.x, uv.y, 0.0, 1.0)).truncate();
    let dir = (camera_to_world * view_dir.extend(0.0)).truncate().normalize();

    let mut travelled = 0.0;
    for _ in 0..MAX_STEPS {
        if travelled >= MAX_DST {
            break;
        }
        let hit = scene(shapes, origin, frame.time);
        if hit.distance <= EPSILON {
            let surface_point = origin + dir * hit.distance;
            let normal = estimate_normal(shapes, surface_point - dir * EPSILON, frame.time);
            let light_dir = (light - origin).normalize();
            let lighting = normal.dot(light_dir).clamp(0.0, 1.0);
            let color = hit.color * lighting;
            return [color.x, color.y, color.z, 1.0];
        }
        origin += dir * hit.distance;
        travelled += hit.distance;
    }
    background
}

/// Runs the kernel over a `groups` grid of `group_size` tiles.
///
/// Invocations outside `destination` are skipped, exactly like the bounds
/// check at the top of the WGSL entry point.
pub fn run(
    frame: &FrameBlock,
    shapes: &[ShapeRecord],
    source: ImageView<'_>,
    destination: &mut [[f32; 4]],
    size: (u32, u32),
    groups: [u32; 3],
    group_size: [u32; 3],
) {
    let count = usize::try_from(frame.shape_count.max(0)).unwrap_or(0).min(shapes.len());
    let shapes = &shapes[..count];

    for gy in 0..groups[1] {
        for gx in 0..groups[0] {
            for ty in 0..group_size[1] {
                for tx in 0..group_size[0] {
                    let x = gx * group_size[0] + tx;
                    let y = gy * group_size[1] + ty;
                    if x >= size.0 || y >= size.1 {
                        continue;
                    }
                    let background = source.load(x, y);
                    destination[(y * size.0 + x) as usize] = march_pixel(frame, shapes, x, y, size, background);
                }
            }
        }
    }
}
