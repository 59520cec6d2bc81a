use serde::{Deserialize, Serialize};

use crate::types::{LandmarkMap, Point3, Prediction};

/// Where a named landmark comes from inside a prediction: either a raw
/// index into the scaled mesh, or one entry of a semantic annotation group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkSource {
    MeshIndex(usize),
    Annotation { group: String, index: usize },
}

/// One row of the remap table. `offset_x`/`offset_y` compensate for the
/// host's composited layout; the host contract documents the layout the
/// offsets assume (camera panel on the left, annotation panel alongside).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSpec {
    pub name: String,
    pub source: LandmarkSource,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

impl LandmarkSpec {
    pub fn mesh(name: &str, index: usize, offset_x: f32, offset_y: f32) -> Self {
        Self {
            name: name.to_string(),
            source: LandmarkSource::MeshIndex(index),
            offset_x,
            offset_y,
        }
    }

    pub fn annotation(name: &str, group: &str, index: usize, offset_x: f32, offset_y: f32) -> Self {
        Self {
            name: name.to_string(),
            source: LandmarkSource::Annotation {
                group: group.to_string(),
                index,
            },
            offset_x,
            offset_y,
        }
    }
}

pub type LandmarkTable = Vec<LandmarkSpec>;

/// The plain extraction set: cheeks from annotation groups, the rest by
/// mesh index, no layout offsets.
pub fn face_basic() -> LandmarkTable {
    vec![
        LandmarkSpec::annotation("leftCheek", "leftCheek", 0, 0.0, 0.0),
        LandmarkSpec::annotation("rightCheek", "rightCheek", 0, 0.0, 0.0),
        LandmarkSpec::mesh("forehead", 10, 0.0, 0.0),
        LandmarkSpec::mesh("chin", 152, 0.0, 0.0),
        LandmarkSpec::mesh("leftEyeInnerCorner", 133, 0.0, 0.0),
    ]
}

/// The composited-layout set: extra mouth/eye points, every x shifted by
/// +480 and every y by -20 to land on the host's side-by-side canvas.
pub fn face_composite() -> LandmarkTable {
    const OFFSET_X: f32 = 480.0;
    const OFFSET_Y: f32 = -20.0;
    vec![
        LandmarkSpec::annotation("leftCheek", "leftCheek", 0, OFFSET_X, OFFSET_Y),
        LandmarkSpec::annotation("rightCheek", "rightCheek", 0, OFFSET_X, OFFSET_Y),
        LandmarkSpec::mesh("forehead", 10, OFFSET_X, OFFSET_Y),
        LandmarkSpec::mesh("chin", 152, OFFSET_X, OFFSET_Y),
        LandmarkSpec::mesh("leftEyeInnerCorner", 133, OFFSET_X, OFFSET_Y),
        LandmarkSpec::mesh("rightEyeInnerCorner", 362, OFFSET_X, OFFSET_Y),
        LandmarkSpec::mesh("mouthTop", 13, OFFSET_X, OFFSET_Y),
        LandmarkSpec::mesh("mouthBottom", 14, OFFSET_X, OFFSET_Y),
    ]
}

pub fn table_by_name(name: &str) -> Option<LandmarkTable> {
    match name {
        "basic" => Some(face_basic()),
        "composite" => Some(face_composite()),
        _ => None,
    }
}

fn lookup(prediction: &Prediction, source: &LandmarkSource) -> Option<Point3> {
    match source {
        LandmarkSource::MeshIndex(i) => prediction.scaled_mesh.get(*i).copied(),
        LandmarkSource::Annotation { group, index } => prediction
            .annotations
            .get(group)
            .and_then(|points| points.get(*index))
            .copied(),
    }
}

/// Builds a fresh LandmarkMap from one prediction. Entries whose source is
/// absent from the prediction are skipped; the map never carries partial
/// coordinates. z passes through unchanged.
pub fn remap(prediction: &Prediction, table: &LandmarkTable) -> LandmarkMap {
    let mut map = LandmarkMap::default();
    for spec in table {
        if let Some(p) = lookup(prediction, &spec.source) {
            map.insert(
                &spec.name,
                Point3::new(p.x + spec.offset_x, p.y + spec.offset_y, p.z),
            );
        }
    }
    map
}
