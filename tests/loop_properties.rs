//! End-to-end properties of the capture/inference/report loop, driven
//! with scripted models and synthetic frame sources over the channel
//! bridge.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use facebridge::{
    BridgeError, BridgeEvent, ChannelBridge, Facing, FaceModel, Frame, FrameLoopController,
    FrameSource, LandmarkSpec, LandmarkTable, LoopOptions, LoopState, Point3, Prediction, Tick,
};

struct GradientSource {
    width: u32,
    height: u32,
}

impl FrameSource for GradientSource {
    fn capture(&mut self) -> Result<Frame> {
        Ok(Frame::from_fn(self.width, self.height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        }))
    }
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
}

/// Model that plays back one prediction set per call, then repeats the
/// last set.
struct ScriptedModel {
    script: Vec<Vec<Prediction>>,
    calls: usize,
}

impl ScriptedModel {
    fn new(script: Vec<Vec<Prediction>>) -> Self {
        Self { script, calls: 0 }
    }
}

impl FaceModel for ScriptedModel {
    fn name(&self) -> String {
        "Scripted".to_string()
    }
    fn estimate_faces(&mut self, _: &Frame, _: bool) -> Result<Vec<Prediction>> {
        let index = self.calls.min(self.script.len().saturating_sub(1));
        self.calls += 1;
        Ok(self.script.get(index).cloned().unwrap_or_default())
    }
}

fn single_face(forehead: Point3) -> Prediction {
    let mut scaled_mesh = vec![Point3::default(); 468];
    scaled_mesh[10] = forehead;
    scaled_mesh[152] = Point3::new(150.0, 230.0, 2.0);
    scaled_mesh[133] = Point3::new(170.0, 100.0, -1.0);
    let mut annotations = HashMap::new();
    annotations.insert("leftCheek".to_string(), vec![Point3::new(90.0, 150.0, 4.0)]);
    annotations.insert(
        "rightCheek".to_string(),
        vec![Point3::new(210.0, 150.0, 4.0)],
    );
    Prediction {
        face_in_view_confidence: 1.0,
        bounding_box: Default::default(),
        mesh: Vec::new(),
        scaled_mesh,
        annotations,
    }
}

fn build_controller(
    model: Box<dyn FaceModel>,
    table: LandmarkTable,
) -> (FrameLoopController<ChannelBridge>, Receiver<BridgeEvent>) {
    let (bridge, rx) = ChannelBridge::new();
    let controller = FrameLoopController::new(
        model,
        bridge,
        Box::new(|_, w, h| {
            Ok(Box::new(GradientSource {
                width: w,
                height: h,
            }) as Box<dyn FrameSource>)
        }),
        table,
        Facing::Forward,
        LoopOptions::default(),
    );
    (controller, rx)
}

fn drain(rx: &Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

fn count_kinds(events: &[BridgeEvent]) -> (usize, usize) {
    let results = events
        .iter()
        .filter(|e| matches!(e, BridgeEvent::Result(_)))
        .count();
    let images = events
        .iter()
        .filter(|e| matches!(e, BridgeEvent::Image(_)))
        .count();
    (results, images)
}

#[test]
fn empty_prediction_set_still_reports_one_image() {
    let model = ScriptedModel::new(vec![Vec::new()]);
    let (mut controller, rx) = build_controller(Box::new(model), facebridge::remap::face_basic());
    controller.start().unwrap();

    for _ in 0..3 {
        assert_eq!(controller.tick().unwrap(), Tick::Ran);
        let (results, images) = count_kinds(&drain(&rx));
        assert_eq!(results, 0);
        assert_eq!(images, 1);
    }
}

#[test]
fn multi_face_set_reports_first_face_only() {
    let first = single_face(Point3::new(100.0, 50.0, -5.0));
    let second = single_face(Point3::new(900.0, 900.0, 9.0));
    let model = ScriptedModel::new(vec![vec![first, second]]);
    let table = vec![LandmarkSpec::mesh("forehead", 10, 0.0, 0.0)];
    let (mut controller, rx) = build_controller(Box::new(model), table);
    controller.start().unwrap();
    controller.tick().unwrap();

    let events = drain(&rx);
    let (results, images) = count_kinds(&events);
    assert_eq!(results, 1);
    assert_eq!(images, 1);
    let json = events
        .iter()
        .find_map(|e| match e {
            BridgeEvent::Result(json) => Some(json.clone()),
            _ => None,
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["forehead"]["x"], 100.0);
    assert_eq!(value["forehead"]["y"], 50.0);
}

#[test]
fn forehead_offset_scenario_reports_580() {
    // scaledMesh[10] = [100, 50, -5] with a +480 x offset.
    let model = ScriptedModel::new(vec![vec![single_face(Point3::new(100.0, 50.0, -5.0))]]);
    let table = vec![LandmarkSpec::mesh("forehead", 10, 480.0, 0.0)];
    let (mut controller, rx) = build_controller(Box::new(model), table);
    controller.start().unwrap();
    controller.tick().unwrap();

    let json = drain(&rx)
        .into_iter()
        .find_map(|e| match e {
            BridgeEvent::Result(json) => Some(json),
            _ => None,
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["forehead"]["x"], 580.0);
    assert_eq!(value["forehead"]["y"], 50.0);
    assert_eq!(value["forehead"]["z"], -5.0);
}

#[test]
fn reported_keys_match_active_table_exactly() {
    let model = ScriptedModel::new(vec![vec![single_face(Point3::new(100.0, 50.0, -5.0))]]);
    let (mut controller, rx) = build_controller(Box::new(model), facebridge::remap::face_basic());
    controller.start().unwrap();
    controller.tick().unwrap();

    let json = drain(&rx)
        .into_iter()
        .find_map(|e| match e {
            BridgeEvent::Result(json) => Some(json),
            _ => None,
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "chin",
            "forehead",
            "leftCheek",
            "leftEyeInnerCorner",
            "rightCheek"
        ]
    );
}

#[test]
fn stop_silences_bridge_after_inflight_iteration() {
    let model = ScriptedModel::new(vec![vec![single_face(Point3::new(1.0, 2.0, 3.0))]]);
    let (mut controller, rx) = build_controller(Box::new(model), facebridge::remap::face_basic());
    controller.start().unwrap();
    controller.tick().unwrap();
    drain(&rx);

    controller.stop();
    // Boundary tick observes the stop without emitting anything.
    assert_eq!(controller.tick().unwrap(), Tick::Stopped);
    assert_eq!(controller.tick().unwrap(), Tick::Idle);
    assert_eq!(controller.tick().unwrap(), Tick::Idle);
    assert!(drain(&rx).is_empty());
}

#[test]
fn facing_switch_restarts_once_without_interleaving() {
    let model = ScriptedModel::new(vec![Vec::new()]);
    let (mut controller, rx) = build_controller(Box::new(model), facebridge::remap::face_basic());
    controller.start().unwrap();
    controller.tick().unwrap();
    drain(&rx);

    controller.set_facing(Facing::Backward);
    let mut restarts = 0;
    let mut ticks = Vec::new();
    for _ in 0..4 {
        let tick = controller.tick().unwrap();
        if tick == Tick::Restarted {
            restarts += 1;
        }
        ticks.push(tick);
    }
    assert_eq!(restarts, 1);
    assert_eq!(controller.facing(), Facing::Backward);
    assert_eq!(controller.state(), LoopState::Running);
    // The restart tick itself emits nothing; subsequent ticks run normally.
    assert_eq!(ticks[0], Tick::Restarted);
    assert!(ticks[1..].iter().all(|t| *t == Tick::Ran));
    let (_, images) = count_kinds(&drain(&rx));
    assert_eq!(images, 3);
}

#[test]
fn unavailable_camera_reports_400_and_never_loops() {
    let (bridge, rx) = ChannelBridge::new();
    let mut controller = FrameLoopController::new(
        Box::new(ScriptedModel::new(vec![Vec::new()])),
        bridge,
        Box::new(|_, _, _| Err(BridgeError::UnsupportedEnvironment)),
        facebridge::remap::face_basic(),
        Facing::Forward,
        LoopOptions::default(),
    );

    assert_eq!(controller.start(), Err(BridgeError::UnsupportedEnvironment));
    let events = drain(&rx);
    assert_eq!(
        events,
        vec![BridgeEvent::Error {
            code: 400,
            message: "WebView does not support navigator.mediaDevices".to_string()
        }]
    );
    assert_eq!(controller.state(), LoopState::Idle);
    assert_eq!(controller.tick().unwrap(), Tick::Idle);
    assert!(drain(&rx).is_empty());
}

#[test]
fn mirrored_image_is_reported_for_forward_facing() {
    let model = ScriptedModel::new(vec![Vec::new()]);
    let (mut controller, rx) = build_controller(Box::new(model), facebridge::remap::face_basic());
    controller.start().unwrap();
    controller.tick().unwrap();

    let data_url = drain(&rx)
        .into_iter()
        .find_map(|e| match e {
            BridgeEvent::Image(url) => Some(url),
            _ => None,
        })
        .unwrap();

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let payload = data_url.strip_prefix("data:image/png;base64,").unwrap();
    let bytes = STANDARD.decode(payload).unwrap();
    let reported = image::load_from_memory(&bytes).unwrap().to_rgb8();

    // The gradient source puts red = x; forward facing mirrors it, so the
    // leftmost reported column carries the source's rightmost red value.
    assert_eq!(reported.width(), 300);
    assert_eq!(reported.get_pixel(0, 0)[0], ((300 - 1) % 256) as u8);
    assert_eq!(reported.get_pixel(299, 0)[0], 0);
}
