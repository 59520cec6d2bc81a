use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use colored::*;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::Duration;

use facebridge::args::Args;
use facebridge::bridge::{BridgeEvent, ChannelBridge};
use facebridge::camera::{self, CameraSource, Facing, FrameSource};
use facebridge::config::AppConfig;
use facebridge::controller::{FrameLoopController, LoopOptions, Tick};
use facebridge::model::{self, FaceModel, SyntheticModel};
use facebridge::session::LoopState;
use facebridge::HostBridge;

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list {
        let cameras = camera::list_cameras()?;
        println!("Available Cameras:");
        println!("{:<5} | {:<30}", "Index", "Name");
        println!("{}", "-".repeat(40));
        for (index, name) in cameras {
            println!("{:<5} | {:<30}", index, name);
        }
        return Ok(());
    }

    // 0. Load Config
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(index) = args.camera {
        config.video.forward_index = index;
    }
    if let Some(variant) = &args.variant {
        config.landmarks.variant = variant.clone();
    }
    if let Some(path) = &args.model {
        config.model.mesh_model = path.clone();
    }
    if args.overlay {
        config.runtime.overlay = true;
    }
    if args.backward {
        config.video.facing = Facing::Backward;
    }

    // 1. Load Model (readiness and 401 signaling happen through the bridge)
    let (bridge, events) = ChannelBridge::new();
    let model: Box<dyn FaceModel> = if args.synthetic {
        let model = Box::new(SyntheticModel::new(config.model.max_faces));
        bridge.ready();
        model
    } else {
        model::load_model(&config.model, &bridge)?
    };
    println!("Active Model: {}", model.name());

    // 2. Build the loop controller around the real camera
    let forward_index = config.video.forward_index;
    let backward_index = config.video.backward_index;
    let options = LoopOptions {
        width: config.video.width,
        height: config.video.height,
        overlay: config.runtime.overlay,
        max_consecutive_failures: config.runtime.max_consecutive_failures,
        tick_interval: Duration::from_secs_f64(1.0 / config.runtime.tick_rate_hz.max(1) as f64),
    };
    let tick_interval = options.tick_interval;
    let mut controller = FrameLoopController::new(
        model,
        bridge,
        Box::new(move |facing, w, h| {
            let index = match facing {
                Facing::Forward => forward_index,
                Facing::Backward => backward_index,
            };
            CameraSource::open(index, w, h).map(|s| Box::new(s) as Box<dyn FrameSource>)
        }),
        config.landmark_table(),
        config.video.facing,
        options,
    );

    // 3. Preview window, doubling as the interactive host
    let width = config.video.width as usize;
    let height = config.video.height as usize;
    let mut window = Window::new(
        "facebridge",
        width,
        height,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )
    .map_err(|e| anyhow::anyhow!("Failed to create window: {}", e))?;

    println!("{}", "Starting capture loop...".green());
    println!("Controls: [Space] start/stop [F] switch facing [Q/Esc] quit");

    controller.start()?;

    let mut display = vec![0u32; width * height];
    let mut viewport = (0usize, 0usize);

    while window.is_open() && !window.is_key_down(Key::Escape) && !window.is_key_down(Key::Q) {
        let started = std::time::Instant::now();

        // Host commands
        if window.is_key_pressed(Key::Space, KeyRepeat::No) {
            match controller.state() {
                LoopState::Idle => {
                    let _ = controller.start();
                }
                _ => controller.stop(),
            }
        }
        if window.is_key_pressed(Key::F, KeyRepeat::No) {
            controller.set_facing(controller.facing().toggled());
            println!("Switching camera facing to {:?}", controller.facing());
        }

        // The window size stands in for the host's render viewport.
        let size = window.get_size();
        if size != viewport {
            viewport = size;
            controller.set_viewport(size.0 as u32, size.1 as u32);
        }

        match controller.tick()? {
            Tick::Stopped => println!("{}", "Capture loop stopped".yellow()),
            Tick::Restarted => println!("{}", "Capture loop restarted".green()),
            _ => {}
        }

        // Drain bridge events; keep the latest frame for display.
        let mut latest_frame: Option<String> = None;
        while let Ok(event) = events.try_recv() {
            match event {
                BridgeEvent::Ready => println!("{}", "Model ready".green()),
                BridgeEvent::Error { code, message } => {
                    eprintln!("{}", format!("Error {}: {}", code, message).red())
                }
                BridgeEvent::Result(_json) => {}
                BridgeEvent::Image(data_url) => latest_frame = Some(data_url),
            }
        }
        if let Some(data_url) = latest_frame {
            if let Some(pixels) = decode_data_url(&data_url, width, height) {
                display = pixels;
            }
        }
        window.update_with_buffer(&display, width, height)?;

        if let Some(rest) = tick_interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}

/// Decodes a `data:image/png;base64,` URL back into a 0RGB buffer for the
/// preview window.
fn decode_data_url(data_url: &str, width: usize, height: usize) -> Option<Vec<u32>> {
    let payload = data_url.strip_prefix("data:image/png;base64,")?;
    let bytes = STANDARD.decode(payload).ok()?;
    let image = image::load_from_memory(&bytes).ok()?.to_rgb8();
    if image.width() as usize != width || image.height() as usize != height {
        return None;
    }
    let mut buffer = Vec::with_capacity(width * height);
    for pixel in image.pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        buffer.push((r << 16) | (g << 8) | b);
    }
    Some(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facebridge::render::encode_data_url;
    use facebridge::types::Frame;

    #[test]
    fn decode_round_trips_reported_frames() {
        let frame = Frame::from_fn(4, 2, |x, y| image::Rgb([x as u8 * 10, y as u8 * 10, 7]));
        let url = encode_data_url(&frame).unwrap();
        let pixels = decode_data_url(&url, 4, 2).unwrap();
        assert_eq!(pixels.len(), 8);
        assert_eq!(pixels[1], (10 << 16) | 7);
    }

    #[test]
    fn decode_rejects_wrong_geometry_and_garbage() {
        let frame = Frame::new(4, 2);
        let url = encode_data_url(&frame).unwrap();
        assert!(decode_data_url(&url, 8, 8).is_none());
        assert!(decode_data_url("data:image/png;base64,!!!", 4, 2).is_none());
        assert!(decode_data_url("nonsense", 4, 2).is_none());
    }
}
