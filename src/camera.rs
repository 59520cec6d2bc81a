use anyhow::Result;
use colored::*;
use image::imageops::FilterType;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::types::Frame;

/// Which way the active camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// User-facing ("selfie") camera; frames are mirrored for display.
    Forward,
    /// World-facing camera.
    Backward,
}

impl Default for Facing {
    fn default() -> Self {
        Facing::Forward
    }
}

impl Facing {
    pub fn is_forward(&self) -> bool {
        matches!(self, Facing::Forward)
    }

    pub fn toggled(&self) -> Facing {
        match self {
            Facing::Forward => Facing::Backward,
            Facing::Backward => Facing::Forward,
        }
    }
}

/// Source of frames for the loop. The camera implements this; tests feed
/// synthetic frames through it.
pub trait FrameSource {
    fn capture(&mut self) -> Result<Frame>;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

pub struct CameraSource {
    camera: Camera,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Opens the camera device for the requested facing direction and binds
    /// it to the logical working resolution. Returns once the stream format
    /// is known and the stream is live. Any backend or device failure maps
    /// to `UnsupportedEnvironment`; the caller reports it to the host.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self, BridgeError> {
        let cam_index = CameraIndex::Index(index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera =
            Camera::new(cam_index, requested).map_err(|_| BridgeError::UnsupportedEnvironment)?;

        camera
            .open_stream()
            .map_err(|_| BridgeError::UnsupportedEnvironment)?;

        println!(
            "{}",
            format!("Opened camera: {}", camera.info().human_name()).green()
        );
        println!("Format: {}", camera.camera_format());

        Ok(Self {
            camera,
            width,
            height,
        })
    }

    pub fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

impl FrameSource for CameraSource {
    fn capture(&mut self) -> Result<Frame> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| anyhow::anyhow!("Failed to get frame: {e}"))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow::anyhow!("Failed to decode frame: {e}"))?;

        // Native format rarely matches the logical resolution exactly.
        if decoded.width() == self.width && decoded.height() == self.height {
            Ok(decoded)
        } else {
            Ok(image::imageops::resize(
                &decoded,
                self.width,
                self.height,
                FilterType::Triangle,
            ))
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Enumerate cameras the backend can see (used by `--list`).
pub fn list_cameras() -> Result<Vec<(u32, String)>> {
    let cameras = nokhwa::query(nokhwa::utils::ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|c| (c.index().as_index().unwrap_or(0), c.human_name()))
        .collect())
}
