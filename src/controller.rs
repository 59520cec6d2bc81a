use anyhow::{Context, Result};
use colored::*;
use std::time::{Duration, Instant};

use crate::bridge::HostBridge;
use crate::camera::{Facing, FrameSource};
use crate::error::BridgeError;
use crate::model::FaceModel;
use crate::remap::{remap, LandmarkTable};
use crate::render;
use crate::session::{LoopState, SessionState};

/// Opens a frame source for a facing direction at the logical resolution.
/// The binary plugs the camera in here; tests plug synthetic sources.
pub type SourceFactory =
    Box<dyn FnMut(Facing, u32, u32) -> Result<Box<dyn FrameSource>, BridgeError>>;

/// Outcome of one scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Loop not started; nothing to do.
    Idle,
    /// One full capture/inference/report iteration ran.
    Ran,
    /// Iteration failed and was skipped; the loop continues.
    Skipped,
    /// Stop observed at the boundary; the loop is down.
    Stopped,
    /// Stop observed, and a pending facing switch restarted the loop.
    Restarted,
}

#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub width: u32,
    pub height: u32,
    /// Draw every landmark index onto the reported frame.
    pub overlay: bool,
    /// Consecutive iteration failures tolerated before the loop halts.
    pub max_consecutive_failures: u32,
    /// Pacing budget per tick, standing in for the display refresh signal.
    pub tick_interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 250,
            overlay: false,
            max_consecutive_failures: 30,
            tick_interval: Duration::from_micros(16_600), // ~60 Hz
        }
    }
}

/// Drives the capture/inference/report loop. Single-threaded and
/// cooperative: control calls mutate the session state, iterations observe
/// it only at tick boundaries.
pub struct FrameLoopController<B: HostBridge> {
    session: SessionState,
    model: Box<dyn FaceModel>,
    bridge: B,
    table: LandmarkTable,
    factory: SourceFactory,
    source: Option<Box<dyn FrameSource>>,
    options: LoopOptions,
    consecutive_failures: u32,
}

impl<B: HostBridge> FrameLoopController<B> {
    pub fn new(
        model: Box<dyn FaceModel>,
        bridge: B,
        factory: SourceFactory,
        table: LandmarkTable,
        facing: Facing,
        options: LoopOptions,
    ) -> Self {
        Self {
            session: SessionState::new(facing),
            model,
            bridge,
            table,
            factory,
            source: None,
            options,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.session.state()
    }

    pub fn facing(&self) -> Facing {
        self.session.facing()
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Host command: start capture. Acquires the camera for the current
    /// facing; on failure reports the coded error and stays Idle. No
    /// loop comes up and nothing is retried.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        if !self.session.begin() {
            // Already running; the original page ignored repeated starts.
            return Ok(());
        }
        match (self.factory)(
            self.session.facing(),
            self.options.width,
            self.options.height,
        ) {
            Ok(source) => {
                self.source = Some(source);
                self.consecutive_failures = 0;
                Ok(())
            }
            Err(err) => {
                self.session.request_stop();
                self.session.finish_stop();
                self.bridge.error(err.code(), err.message());
                Err(err)
            }
        }
    }

    /// Host command: stop capture. Takes effect at the next tick boundary;
    /// an in-flight iteration still completes and reports.
    pub fn stop(&mut self) {
        self.session.request_stop();
    }

    /// Host command: switch camera facing. Forces a stop now and restarts
    /// with the new facing on the next tick, exactly one restart.
    pub fn set_facing(&mut self, facing: Facing) {
        self.session.request_facing(facing);
    }

    /// Host command: actual render viewport, used to rescale the debug
    /// overlay dots.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.session.set_viewport(width, height);
    }

    /// One scheduled tick. Observes stop requests first, then runs one
    /// iteration. Iteration failures follow the skip-and-continue policy,
    /// bounded by `max_consecutive_failures`.
    pub fn tick(&mut self) -> Result<Tick> {
        if self.session.state() == LoopState::Idle {
            return Ok(Tick::Idle);
        }

        if self.session.stop_observed() {
            self.source = None;
            if self.session.finish_stop().is_some() {
                return match self.start() {
                    Ok(()) => Ok(Tick::Restarted),
                    Err(_) => Ok(Tick::Stopped),
                };
            }
            return Ok(Tick::Stopped);
        }

        let facing = self.session.facing();
        match self.run_iteration(facing) {
            Ok(()) => {
                self.consecutive_failures = 0;
                Ok(Tick::Ran)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                eprintln!(
                    "{}",
                    format!(
                        "Frame skipped ({}/{}): {e:#}",
                        self.consecutive_failures, self.options.max_consecutive_failures
                    )
                    .yellow()
                );
                if self.consecutive_failures >= self.options.max_consecutive_failures {
                    eprintln!("{}", "Too many consecutive failures, stopping loop".red());
                    self.session.request_stop();
                }
                Ok(Tick::Skipped)
            }
        }
    }

    fn run_iteration(&mut self, facing: Facing) -> Result<()> {
        let source = self.source.as_mut().context("no active frame source")?;
        let frame = source.capture()?;

        let predictions = self.model.estimate_faces(&frame, facing.is_forward())?;

        let mut rendered = render::render_frame(&frame, facing.is_forward());

        // Single-face mode: only the first prediction is ever reported.
        if let Some(first) = predictions.first() {
            if self.options.overlay {
                render::draw_overlay(&mut rendered, first, self.session.viewport());
            }
            let map = remap(first, &self.table);
            self.bridge.report_result(&map.to_json()?);
        }

        let data_url = render::encode_data_url(&rendered)?;
        self.bridge.report_image(&data_url);
        Ok(())
    }

    /// Convenience driver: starts, then ticks at the configured cadence
    /// until the loop winds down. The cadence check gives the implicit
    /// backpressure a display refresh callback would: a slow consumer
    /// stretches the tick instead of piling work up.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        loop {
            let started = Instant::now();
            match self.tick()? {
                Tick::Idle | Tick::Stopped => break,
                Tick::Ran | Tick::Skipped | Tick::Restarted => {}
            }
            if let Some(rest) = self.options.tick_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        Ok(())
    }
}
