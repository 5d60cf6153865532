//! Pause/resume coordination between the conversion worker and the thread
//! delivering interruption notifications.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Initial,
    Running,
    Paused,
    Done,
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConversionState::Initial => "initial",
            ConversionState::Running => "running",
            ConversionState::Paused => "paused",
            ConversionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Reacquires the audio hardware once an interruption ends.
pub trait SessionActivator: Send + Sync {
    fn activate(&self) -> Result<()>;
}

/// Owns the [`ConversionState`]. Every transition happens under one lock,
/// and the worker parks on a condition variable guarded by that same lock,
/// so a resume that lands before the worker checks is never lost.
pub struct InterruptionController {
    state: Mutex<ConversionState>,
    resumed: Condvar,
    activator: Option<Arc<dyn SessionActivator>>,
}

impl InterruptionController {
    pub fn new() -> Self {
        Self::with_activator(None)
    }

    pub fn with_activator(activator: Option<Arc<dyn SessionActivator>>) -> Self {
        Self {
            state: Mutex::new(ConversionState::Initial),
            resumed: Condvar::new(),
            activator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConversionState {
        *self.lock()
    }

    /// Running -> Paused. No-op in any other state.
    pub fn begin_interruption(&self) {
        let mut state = self.lock();
        if *state == ConversionState::Running {
            *state = ConversionState::Paused;
            info!("Conversion paused by interruption");
        } else {
            debug!("Begin interruption ignored while {}", *state);
        }
    }

    /// Reactivates the session (best effort), then Paused -> Running and wakes
    /// the waiting worker. No-op in any other state.
    pub fn end_interruption(&self) {
        if let Some(activator) = &self.activator {
            if let Err(e) = activator.activate() {
                error!("Session reactivation failed: {}", e);
            }
        }

        let mut state = self.lock();
        if *state == ConversionState::Paused {
            *state = ConversionState::Running;
            self.resumed.notify_one();
            info!("Conversion resumed after interruption");
        } else {
            debug!("End interruption ignored while {}", *state);
        }
    }

    /// Blocks while paused. Returns whether a pause was observed.
    pub fn wait_if_paused(&self) -> bool {
        let mut state = self.lock();
        debug_assert_ne!(*state, ConversionState::Done, "wait_if_paused called after completion");

        let mut was_interrupted = false;
        while *state == ConversionState::Paused {
            was_interrupted = true;
            state = self.resumed.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        debug_assert_eq!(*state, ConversionState::Running, "worker resumed in an unexpected state");
        was_interrupted
    }

    /// Initial -> Running. Returns false if the job already left `Initial`.
    pub fn mark_running(&self) -> bool {
        let mut state = self.lock();
        if *state == ConversionState::Initial {
            *state = ConversionState::Running;
            true
        } else {
            false
        }
    }

    /// Moves to the terminal `Done` state from anywhere.
    pub fn mark_done(&self) {
        let mut state = self.lock();
        *state = ConversionState::Done;
        self.resumed.notify_all();
    }
}

impl Default for InterruptionController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterruptionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptionController")
            .field("state", &self.state())
            .field("has_activator", &self.activator.is_some())
            .finish()
    }
}
