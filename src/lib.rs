//! Camera-to-host face landmark bridge.
//!
//! Acquires live camera frames, runs them through a pretrained face mesh
//! model, remaps a configured set of named landmarks, and reports both the
//! landmark JSON and the rendered frame to a host through the
//! [`bridge::HostBridge`] callback surface. The per-frame loop lives in
//! [`controller::FrameLoopController`].

pub mod args;
pub mod bridge;
pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod remap;
pub mod render;
pub mod session;
pub mod types;

pub use bridge::{BridgeEvent, ChannelBridge, HostBridge, LogBridge};
pub use camera::{CameraSource, Facing, FrameSource};
pub use controller::{FrameLoopController, LoopOptions, SourceFactory, Tick};
pub use error::BridgeError;
pub use model::{FaceModel, ModelConfig, OnnxFaceMesh, SyntheticModel};
pub use remap::{remap, LandmarkSource, LandmarkSpec, LandmarkTable};
pub use session::{CancelToken, LoopState, SessionState};
pub use types::{Frame, LandmarkMap, Point3, Prediction};
