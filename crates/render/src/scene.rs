//! The host scene the compositor queries each frame.

use glam::Vec3;
use serde::Deserialize;

use crate::camera::{CameraDesc, CameraState};
use crate::config::RenderConfig;
use crate::shape::ShapeEntity;

/// What the compositor needs from the host scene.
pub trait SceneQuery {
    /// Every shape currently in the scene, in scene order.
    fn shapes(&self) -> &[ShapeEntity];

    fn camera(&self) -> CameraState;

    /// Position of the scene's light, if it has one.
    fn light(&self) -> Option<Vec3>;
}

/// In-memory scene, loadable from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub camera: CameraDesc,
    pub light: Option<Vec3>,
    pub shapes: Vec<ShapeEntity>,
    pub render: RenderConfig,
}

impl Scene {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Overrides the viewport size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.camera.width = width;
        self.camera.height = height;
    }
}

impl SceneQuery for Scene {
    fn shapes(&self) -> &[ShapeEntity] {
        &self.shapes
    }

    fn camera(&self) -> CameraState {
        CameraState::from(&self.camera)
    }

    fn light(&self) -> Option<Vec3> {
        self.light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Operation, ShapeType};

    const SCENE: &str = r#"{
        "camera": { "eye": [0.0, 2.0, 6.0], "width": 320, "height": 200 },
        "light": [1.0, 5.0, 2.0],
        "shapes": [
            { "name": "body", "shape_type": "sphere", "transform": { "scale": [2.0, 2.0, 2.0] } },
            { "name": "hole", "shape_type": "cube", "operation": "cut", "color": [0.2, 0.4, 1.0] }
        ],
        "render": { "fallback_light": [0.0, 3.0, 0.0] }
    }"#;

    #[test]
    fn loads_scene_file() {
        let scene = Scene::from_json(SCENE).unwrap();
        assert_eq!(scene.shapes().len(), 2);
        assert_eq!(scene.shapes()[1].shape_type, ShapeType::Cube);
        assert_eq!(scene.shapes()[1].operation, Operation::Cut);
        assert_eq!(scene.light(), Some(Vec3::new(1.0, 5.0, 2.0)));
        assert_eq!(scene.render.fallback_light, Vec3::new(0.0, 3.0, 0.0));

        let camera = scene.camera();
        assert_eq!((camera.pixel_width, camera.pixel_height), (320, 200));
    }

    #[test]
    fn light_is_optional() {
        let scene = Scene::from_json(r#"{ "shapes": [] }"#).unwrap();
        assert_eq!(scene.light(), None);
        assert_eq!(scene.render, RenderConfig::default());
    }

    #[test]
    fn unknown_shape_type_is_rejected() {
        let err = Scene::from_json(r#"{ "shapes": [{ "shape_type": "cone" }] }"#).unwrap_err();
        assert!(err.to_string().contains("cone"), "{err}");
    }
}
