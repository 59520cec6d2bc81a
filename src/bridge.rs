use colored::*;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Outbound callback surface toward the native host. Mirrors the four
/// callbacks the host registers: model readiness, coded errors, the
/// per-frame landmark JSON and the per-frame rendered image.
pub trait HostBridge {
    fn ready(&self);
    fn error(&self, code: u16, message: &str);
    /// Serialized `LandmarkMap` for the current frame.
    fn report_result(&self, json: &str);
    /// `data:image/png;base64,...` URL of the rendered frame.
    fn report_image(&self, data_url: &str);
}

/// Console bridge for standalone runs. Image payloads are summarized
/// rather than dumped.
pub struct LogBridge;

impl HostBridge for LogBridge {
    fn ready(&self) {
        println!("{}", "Model ready".green());
    }

    fn error(&self, code: u16, message: &str) {
        eprintln!("{}", format!("Error {}: {}", code, message).red());
    }

    fn report_result(&self, json: &str) {
        println!("Landmarks: {}", json);
    }

    fn report_image(&self, data_url: &str) {
        println!("Frame: {} bytes encoded", data_url.len());
    }
}

/// Everything a bridge can deliver, as an owned event.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Ready,
    Error { code: u16, message: String },
    Result(String),
    Image(String),
}

/// Bridge backed by an mpsc channel. The host side (or a test) drains the
/// receiver at its own pace.
pub struct ChannelBridge {
    tx: Sender<BridgeEvent>,
}

impl ChannelBridge {
    pub fn new() -> (Self, Receiver<BridgeEvent>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }
}

impl HostBridge for ChannelBridge {
    fn ready(&self) {
        let _ = self.tx.send(BridgeEvent::Ready);
    }

    fn error(&self, code: u16, message: &str) {
        let _ = self.tx.send(BridgeEvent::Error {
            code,
            message: message.to_string(),
        });
    }

    fn report_result(&self, json: &str) {
        let _ = self.tx.send(BridgeEvent::Result(json.to_string()));
    }

    fn report_image(&self, data_url: &str) {
        let _ = self.tx.send(BridgeEvent::Image(data_url.to_string()));
    }
}
