use anyhow::{Context, Result};
use image::imageops::FilterType;
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::bridge::HostBridge;
use crate::error::BridgeError;
use crate::types::{Frame, Point3, Prediction};

/// Mesh input side expected by the face mesh model.
const MESH_INPUT: u32 = 192;
/// Landmark count in one mesh output (468 points * 3 floats).
const MESH_POINTS: usize = 468;
const MESH_FLOATS: usize = MESH_POINTS * 3;
/// Face-flag logit below this sigmoid score counts as "no face".
const FACE_SCORE_THRESHOLD: f32 = 0.5;

/// Annotation groups the remap tables reference, as mesh index lists.
const MESH_ANNOTATIONS: &[(&str, &[usize])] = &[
    ("leftCheek", &[425]),
    ("rightCheek", &[205]),
    ("noseTip", &[1]),
    ("midwayBetweenEyes", &[168]),
];

/// Inference seam. The pretrained detector lives behind this; the loop
/// never sees anything model-specific.
pub trait FaceModel {
    fn name(&self) -> String;
    /// Runs one frame through the model. `flip_horizontal` mirrors the
    /// returned x coordinates, matching a front-facing camera preview.
    fn estimate_faces(&mut self, frame: &Frame, flip_horizontal: bool) -> Result<Vec<Prediction>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Detection is capped here; 1 keeps the single-face fast path.
    pub max_faces: usize,
    pub mesh_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_faces: 1,
            mesh_model: "models/face_mesh.onnx".to_string(),
        }
    }
}

/// Builds the annotation groups from an already-scaled mesh.
pub fn annotate(scaled_mesh: &[Point3]) -> HashMap<String, Vec<Point3>> {
    let mut annotations = HashMap::new();
    for (group, indices) in MESH_ANNOTATIONS {
        let points: Vec<Point3> = indices
            .iter()
            .filter_map(|&i| scaled_mesh.get(i).copied())
            .collect();
        if !points.is_empty() {
            annotations.insert(group.to_string(), points);
        }
    }
    annotations
}

/// ONNX Runtime session around the pretrained MediaPipe face mesh model.
pub struct OnnxFaceMesh {
    session: Session,
    max_faces: usize,
}

impl OnnxFaceMesh {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        if !Path::new(&config.mesh_model).exists() {
            anyhow::bail!("model file not found: {}", config.mesh_model);
        }

        println!("Loading Face Mesh from {}...", config.mesh_model);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .with_execution_providers([
                ort::execution_providers::CoreMLExecutionProvider::default().build(),
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])?
            .commit_from_file(&config.mesh_model)
            .context("Failed to load face mesh session")?;

        Ok(Self {
            session,
            max_faces: config.max_faces.max(1),
        })
    }
}

impl FaceModel for OnnxFaceMesh {
    fn name(&self) -> String {
        "Face Mesh (468 pts)".to_string()
    }

    fn estimate_faces(&mut self, frame: &Frame, flip_horizontal: bool) -> Result<Vec<Prediction>> {
        let resized = image::imageops::resize(frame, MESH_INPUT, MESH_INPUT, FilterType::Triangle);

        // NHWC [1, 192, 192, 3], pixels normalized to [-1, 1].
        let mut input_data = Vec::with_capacity((MESH_INPUT * MESH_INPUT * 3) as usize);
        for y in 0..MESH_INPUT {
            for x in 0..MESH_INPUT {
                let pixel = resized.get_pixel(x, y);
                input_data.push((pixel[0] as f32 / 127.5) - 1.0);
                input_data.push((pixel[1] as f32 / 127.5) - 1.0);
                input_data.push((pixel[2] as f32 / 127.5) - 1.0);
            }
        }

        let shape = vec![1_i64, MESH_INPUT as i64, MESH_INPUT as i64, 3];
        let input = ort::value::Tensor::from_array((shape, input_data))?;
        let outputs = self.session.run(ort::inputs![input])?;

        let (_landmark_shape, landmark_data) = outputs[0].try_extract_tensor::<f32>()?;
        if landmark_data.len() < MESH_FLOATS {
            return Ok(Vec::new());
        }

        // Second output is the face-presence logit; absent on stripped
        // exports, in which case we trust the landmarks.
        let confidence = if outputs.len() > 1 {
            let (_score_shape, score_data) = outputs[1].try_extract_tensor::<f32>()?;
            score_data
                .first()
                .map(|logit| 1.0 / (1.0 + (-logit).exp()))
                .unwrap_or(1.0)
        } else {
            1.0
        };
        if confidence < FACE_SCORE_THRESHOLD {
            return Ok(Vec::new());
        }

        let scale_x = frame.width() as f32 / MESH_INPUT as f32;
        let scale_y = frame.height() as f32 / MESH_INPUT as f32;

        let mut mesh = Vec::with_capacity(MESH_POINTS);
        let mut scaled_mesh = Vec::with_capacity(MESH_POINTS);
        for i in 0..MESH_POINTS {
            let mx = landmark_data[i * 3];
            let my = landmark_data[i * 3 + 1];
            let mz = landmark_data[i * 3 + 2];
            mesh.push(Point3::new(mx, my, mz));

            let x = mx * scale_x;
            let x = if flip_horizontal {
                frame.width() as f32 - x
            } else {
                x
            };
            scaled_mesh.push(Point3::new(x, my * scale_y, mz));
        }

        let prediction = Prediction {
            face_in_view_confidence: confidence,
            bounding_box: Prediction::compute_bounding_box(&scaled_mesh),
            annotations: annotate(&scaled_mesh),
            mesh,
            scaled_mesh,
        };

        let mut faces = vec![prediction];
        faces.truncate(self.max_faces);
        Ok(faces)
    }
}

/// Stand-in when no model file is around: one face, landmarks tracing a
/// slow oval around the frame center.
pub struct SyntheticModel {
    max_faces: usize,
    start_time: std::time::Instant,
}

impl SyntheticModel {
    pub fn new(max_faces: usize) -> Self {
        Self {
            max_faces: max_faces.max(1),
            start_time: std::time::Instant::now(),
        }
    }
}

impl FaceModel for SyntheticModel {
    fn name(&self) -> String {
        "Synthetic Face (Simulated)".to_string()
    }

    fn estimate_faces(&mut self, frame: &Frame, flip_horizontal: bool) -> Result<Vec<Prediction>> {
        let w = frame.width() as f32;
        let h = frame.height() as f32;
        let cx = w / 2.0;
        let cy = h / 2.0;
        let t = self.start_time.elapsed().as_secs_f32();

        let radius = (w.min(h) / 3.0) + (t * 2.0).sin() * 10.0;
        let mut scaled_mesh = Vec::with_capacity(MESH_POINTS);
        for i in 0..MESH_POINTS {
            let angle = (i as f32 / MESH_POINTS as f32) * std::f32::consts::PI * 2.0 + t;
            let x = cx + angle.cos() * radius;
            let x = if flip_horizontal { w - x } else { x };
            let y = cy + angle.sin() * radius;
            scaled_mesh.push(Point3::new(x, y, 0.0));
        }

        let prediction = Prediction {
            face_in_view_confidence: 1.0,
            bounding_box: Prediction::compute_bounding_box(&scaled_mesh),
            annotations: annotate(&scaled_mesh),
            mesh: scaled_mesh.clone(),
            scaled_mesh,
        };

        let mut faces = vec![prediction];
        faces.truncate(self.max_faces);
        Ok(faces)
    }
}

/// Startup-time model load with host signaling: `ready()` on success,
/// `error(401, ...)` and a propagated failure otherwise.
pub fn load_model<B: HostBridge>(config: &ModelConfig, bridge: &B) -> Result<Box<dyn FaceModel>> {
    match OnnxFaceMesh::load(config) {
        Ok(model) => {
            bridge.ready();
            Ok(Box::new(model))
        }
        Err(e) => {
            let err = BridgeError::ModelLoadFailed;
            bridge.error(err.code(), err.message());
            Err(e)
        }
    }
}
