// ABOUTME: Latest-wins event slots for the session's outbound callbacks
// ABOUTME: One handler per event kind; registering again replaces the previous one

use crate::client::types::StopReason;
use std::sync::{Arc, Mutex, MutexGuard};

pub type StopHandler = Arc<dyn Fn(Option<StopReason>) + Send + Sync>;
pub type OutputHandler = Arc<dyn Fn(&str) + Send + Sync>;
pub type SignalHandler = Arc<dyn Fn() + Send + Sync>;

/// Registry of the session's outbound event handlers.
///
/// Each event kind has a single slot and the latest registration wins.
/// Handlers are cloned out of the slot before invocation, so a handler may
/// re-register without deadlocking; it must not call back into the session
/// synchronously.
#[derive(Default)]
pub struct EventRegistry {
    stop: Mutex<Option<StopHandler>>,
    stdout: Mutex<Option<OutputHandler>>,
    error: Mutex<Option<SignalHandler>>,
    close: Mutex<Option<SignalHandler>>,
}

fn slot<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventRegistry {
    pub fn set_stop(&self, handler: StopHandler) {
        *slot(&self.stop) = Some(handler);
    }

    pub fn set_stdout(&self, handler: OutputHandler) {
        *slot(&self.stdout) = Some(handler);
    }

    pub fn set_error(&self, handler: SignalHandler) {
        *slot(&self.error) = Some(handler);
    }

    pub fn set_close(&self, handler: SignalHandler) {
        *slot(&self.close) = Some(handler);
    }

    pub fn emit_stop(&self, reason: Option<StopReason>) {
        if let Some(handler) = slot(&self.stop).clone() {
            handler(reason);
        }
    }

    pub fn emit_stdout(&self, text: &str) {
        if let Some(handler) = slot(&self.stdout).clone() {
            handler(text);
        }
    }

    pub fn emit_error(&self) {
        if let Some(handler) = slot(&self.error).clone() {
            handler();
        }
    }

    pub fn emit_close(&self) {
        if let Some(handler) = slot(&self.close).clone() {
            handler();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn latest_registration_wins() {
        let registry = EventRegistry::default();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let counter = first.clone();
        registry.set_close(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = second.clone();
        registry.set_close(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.emit_close();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emit_without_handler_is_silent() {
        let registry = EventRegistry::default();
        registry.emit_stop(Some(StopReason::Exception));
        registry.emit_stdout("hello");
        registry.emit_error();
    }
}
