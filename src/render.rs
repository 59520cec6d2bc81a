use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb};

use crate::types::{Frame, Prediction};

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const OVERLAY_DOT_SIZE: i32 = 1;

/// Redraws the frame for reporting: mirrored for a front-facing camera
/// (the scale(-1) + translate(width) canvas trick), untouched otherwise.
pub fn render_frame(frame: &Frame, mirror: bool) -> Frame {
    if mirror {
        image::imageops::flip_horizontal(frame)
    } else {
        frame.clone()
    }
}

/// Draws every landmark of the prediction as a dot, rescaled from the
/// logical resolution the mesh was computed at to the host's reported
/// viewport. Debug aid only; the reported coordinates are untouched.
pub fn draw_overlay(frame: &mut Frame, prediction: &Prediction, viewport: Option<(u32, u32)>) {
    let (scale_x, scale_y) = match viewport {
        Some((vw, vh)) if frame.width() > 0 && frame.height() > 0 => (
            vw as f32 / frame.width() as f32,
            vh as f32 / frame.height() as f32,
        ),
        _ => (1.0, 1.0),
    };

    let w = frame.width() as i32;
    let h = frame.height() as i32;
    for p in &prediction.scaled_mesh {
        let px = (p.x * scale_x) as i32;
        let py = (p.y * scale_y) as i32;
        for dy in -OVERLAY_DOT_SIZE..=OVERLAY_DOT_SIZE {
            for dx in -OVERLAY_DOT_SIZE..=OVERLAY_DOT_SIZE {
                let x = px + dx;
                let y = py + dy;
                if x >= 0 && x < w && y >= 0 && y < h {
                    frame.put_pixel(x as u32, y as u32, OVERLAY_COLOR);
                }
            }
        }
    }
}

/// PNG-encodes the frame as a `data:` URL, the canvas `toDataURL`
/// equivalent the host consumes.
pub fn encode_data_url(frame: &Frame) -> Result<String> {
    let mut png = Vec::new();
    let encoder = PngEncoder::new(&mut png);
    encoder.write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
}
