use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::camera::Facing;

/// Cooperative cancellation for the frame loop. Set from control calls,
/// observed only at iteration boundaries; never preempts an in-flight
/// iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    StopRequested,
}

/// All mutable per-session state: the loop state machine, the facing
/// direction, a pending facing switch and the host viewport. Owned by the
/// controller; transitions go through these methods only.
#[derive(Debug)]
pub struct SessionState {
    state: LoopState,
    facing: Facing,
    pending_facing: Option<Facing>,
    viewport: Option<(u32, u32)>,
    cancel: CancelToken,
}

impl SessionState {
    pub fn new(facing: Facing) -> Self {
        Self {
            state: LoopState::Idle,
            facing,
            pending_facing: None,
            viewport: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Idle -> Running. A start while already running is absorbed; the
    /// active loop keeps going and no second loop comes up.
    pub fn begin(&mut self) -> bool {
        if self.state != LoopState::Idle {
            return false;
        }
        self.cancel.reset();
        self.state = LoopState::Running;
        true
    }

    /// Running -> StopRequested. No effect on an in-flight iteration.
    pub fn request_stop(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::StopRequested;
            self.cancel.cancel();
        }
    }

    /// Schedules a facing switch: forces a stop now, records the facing
    /// for the restart the next tick performs.
    pub fn request_facing(&mut self, facing: Facing) {
        self.pending_facing = Some(facing);
        match self.state {
            LoopState::Idle => {
                // Not running; the switch takes effect on the next start.
                self.facing = facing;
                self.pending_facing = None;
            }
            LoopState::Running | LoopState::StopRequested => {
                self.request_stop();
                // Already stop-requested: just update the recorded target.
                self.state = LoopState::StopRequested;
            }
        }
    }

    /// StopRequested -> Idle, once the boundary is reached. Returns the
    /// facing to restart with, if the stop came from a facing switch.
    pub fn finish_stop(&mut self) -> Option<Facing> {
        self.state = LoopState::Idle;
        self.cancel.reset();
        if let Some(facing) = self.pending_facing.take() {
            self.facing = facing;
            Some(facing)
        } else {
            None
        }
    }

    pub fn stop_observed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
