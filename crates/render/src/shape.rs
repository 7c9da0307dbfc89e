//! Scene-side description of a CSG primitive.

use glam::Vec3;
use serde::Deserialize;

pub const MIN_BLEND_STRENGTH: f32 = 0.01;
pub const MAX_BLEND_STRENGTH: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeType {
    #[default]
    Sphere,
    Cube,
    Torus,
}

impl ShapeType {
    /// Code written into the shape buffer.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            ShapeType::Sphere => compute::layout::SHAPE_SPHERE,
            ShapeType::Cube => compute::layout::SHAPE_CUBE,
            ShapeType::Torus => compute::layout::SHAPE_TORUS,
        }
    }
}

/// How a shape combines with everything before it in the sorted list.
///
/// The derived ordering is the sort order of the shape buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Hard union.
    #[default]
    None,
    /// Smooth union, radius set by the blend strength.
    Blend,
    /// Subtraction.
    Cut,
}

impl Operation {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Operation::None => compute::layout::OP_NONE,
            Operation::Blend => compute::layout::OP_BLEND,
            Operation::Cut => compute::layout::OP_CUT,
        }
    }
}

/// World placement of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// Local scale. Each primitive reads the axes it needs.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, scale: Vec3::ONE }
    }
}

/// A shape as authored in the scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShapeEntity {
    pub name: String,
    pub transform: Transform,
    pub shape_type: ShapeType,
    pub operation: Operation,
    /// Linear RGB, each channel in `[0, 1]`.
    pub color: [f32; 3],
    /// Smooth-union radius, in `[0.01, 1.0]`.
    pub blend_strength: f32,
    /// Bob the shape vertically over time.
    pub is_animated: bool,
    /// Also pulse the radius of an animated sphere.
    pub animate_sphere_radius: bool,
}

impl Default for ShapeEntity {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            shape_type: ShapeType::Sphere,
            operation: Operation::None,
            color: [1.0; 3],
            blend_strength: 0.5,
            is_animated: false,
            animate_sphere_radius: false,
        }
    }
}

impl ShapeEntity {
    #[must_use]
    pub fn new(shape_type: ShapeType, position: Vec3, scale: Vec3) -> Self {
        Self { shape_type, transform: Transform { position, scale }, ..Self::default() }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_blend_strength(mut self, blend_strength: f32) -> Self {
        self.blend_strength = blend_strength;
        self
    }

    #[must_use]
    pub fn animated(mut self, animate_sphere_radius: bool) -> Self {
        self.is_animated = true;
        self.animate_sphere_radius = animate_sphere_radius;
        self
    }

    #[must_use]
    pub fn clamped_color(&self) -> [f32; 3] {
        self.color.map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) })
    }

    #[must_use]
    pub fn clamped_blend_strength(&self) -> f32 {
        if self.blend_strength.is_nan() {
            return MIN_BLEND_STRENGTH;
        }
        self.blend_strength.clamp(MIN_BLEND_STRENGTH, MAX_BLEND_STRENGTH)
    }
}
