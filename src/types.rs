use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use image::{ImageBuffer, Rgb};

/// One captured camera frame at the logical working resolution.
pub type Frame = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Represents a single 3D point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBox {
    pub top_left: (f32, f32),
    pub bottom_right: (f32, f32),
}

/// One detected face as produced by the model: the landmark list in frame
/// coordinates (`scaled_mesh`), the raw model-local list (`mesh`), and the
/// semantic annotation groups keyed by region name.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    pub face_in_view_confidence: f32,
    pub bounding_box: BoundingBox,
    pub mesh: Vec<Point3>,
    pub scaled_mesh: Vec<Point3>,
    pub annotations: HashMap<String, Vec<Point3>>,
}

impl Prediction {
    pub fn compute_bounding_box(points: &[Point3]) -> BoundingBox {
        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);
        for p in points {
            min.0 = min.0.min(p.x);
            min.1 = min.1.min(p.y);
            max.0 = max.0.max(p.x);
            max.1 = max.1.max(p.y);
        }
        BoundingBox {
            top_left: min,
            bottom_right: max,
        }
    }
}

/// Named anatomical points extracted from one prediction. Rebuilt from
/// scratch every frame; serialized as `{"name": {"x":..,"y":..,"z":..}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkMap(pub BTreeMap<String, Point3>);

impl LandmarkMap {
    pub fn insert(&mut self, name: &str, point: Point3) {
        self.0.insert(name.to_string(), point);
    }

    pub fn get(&self, name: &str) -> Option<&Point3> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
