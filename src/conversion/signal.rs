//! Process-wide interruption notifications
//!
//! Interruptions come from outside the job (an audio session losing its
//! hardware). An [`InterruptionCenter`] fans those events out to every
//! subscribed [`InterruptionController`]. Jobs subscribe when they are built
//! and hold a [`Registration`] that unsubscribes when released, so no
//! registration outlives its job.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, info};
use once_cell::sync::Lazy;

use crate::conversion::InterruptionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionEvent {
    Began,
    Ended,
}

impl fmt::Display for InterruptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptionEvent::Began => f.write_str("Begin Interruption"),
            InterruptionEvent::Ended => f.write_str("End Interruption"),
        }
    }
}

#[derive(Default)]
struct CenterInner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Weak<InterruptionController>>>,
}

impl CenterInner {
    fn subscribers(&self) -> MutexGuard<'_, HashMap<u64, Weak<InterruptionController>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

static GLOBAL_CENTER: Lazy<InterruptionCenter> = Lazy::new(InterruptionCenter::new);

/// Publisher of interruption events. Cloning shares the subscriber list.
#[derive(Clone, Default)]
pub struct InterruptionCenter {
    inner: Arc<CenterInner>,
}

impl InterruptionCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide center.
    pub fn global() -> &'static InterruptionCenter {
        &GLOBAL_CENTER
    }

    pub fn subscribe(&self, controller: &Arc<InterruptionController>) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers().insert(id, Arc::downgrade(controller));
        debug!("Interruption subscriber {} registered", id);
        Registration { center: Arc::downgrade(&self.inner), id }
    }

    /// Delivers `event` to every live subscriber and returns how many got it.
    pub fn post(&self, event: InterruptionEvent) -> usize {
        info!("Session interrupted > --- {} ---", event);

        // deliver outside the lock, reactivation may block
        let targets: Vec<Arc<InterruptionController>> = {
            let mut subscribers = self.inner.subscribers();
            subscribers.retain(|_, weak| weak.strong_count() > 0);
            subscribers.values().filter_map(Weak::upgrade).collect()
        };

        for controller in &targets {
            match event {
                InterruptionEvent::Began => controller.begin_interruption(),
                InterruptionEvent::Ended => controller.end_interruption(),
            }
        }
        targets.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}

impl fmt::Debug for InterruptionCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptionCenter")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Subscription handle. Dropping or releasing it unsubscribes.
#[derive(Debug)]
pub struct Registration {
    center: Weak<CenterInner>,
    id: u64,
}

impl Registration {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn release(self) {}
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(center) = self.center.upgrade() {
            center.subscribers().remove(&self.id);
            debug!("Interruption subscriber {} released", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionState;

    #[test]
    fn test_post_reaches_subscribers() {
        let center = InterruptionCenter::new();
        let controller = Arc::new(InterruptionController::new());
        controller.mark_running();
        let _registration = center.subscribe(&controller);

        assert_eq!(center.post(InterruptionEvent::Began), 1);
        assert_eq!(controller.state(), ConversionState::Paused);
        assert_eq!(center.post(InterruptionEvent::Ended), 1);
        assert_eq!(controller.state(), ConversionState::Running);
    }

    #[test]
    fn test_release_unsubscribes() {
        let center = InterruptionCenter::new();
        let controller = Arc::new(InterruptionController::new());
        controller.mark_running();
        let registration = center.subscribe(&controller);
        assert_eq!(center.subscriber_count(), 1);

        registration.release();
        assert_eq!(center.subscriber_count(), 0);
        assert_eq!(center.post(InterruptionEvent::Began), 0);
        assert_eq!(controller.state(), ConversionState::Running);
    }

    #[test]
    fn test_dropped_controller_is_pruned() {
        let center = InterruptionCenter::new();
        let controller = Arc::new(InterruptionController::new());
        let registration = center.subscribe(&controller);
        drop(controller);

        assert_eq!(center.post(InterruptionEvent::Began), 0);
        assert_eq!(center.subscriber_count(), 0);
        drop(registration);
    }

    #[test]
    fn test_centers_are_isolated() {
        let a = InterruptionCenter::new();
        let b = InterruptionCenter::new();
        let controller = Arc::new(InterruptionController::new());
        controller.mark_running();
        let _registration = a.subscribe(&controller);

        assert_eq!(b.post(InterruptionEvent::Began), 0);
        assert_eq!(controller.state(), ConversionState::Running);
    }
}
