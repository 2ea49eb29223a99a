// ABOUTME: Background status and console polls with edge-detected stop events
// ABOUTME: StatusTracker is the pure edge detector; the loops drive it over the gate

use crate::client::session::SessionInner;
use crate::client::types::StopReason;
use crate::datatypes::{Command, Status};
use crate::loader::ClassLoader;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;
use tracing::{debug, trace};

/// Outcome of folding one freshly polled status byte into the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    None,
    Stopped { reason: Option<StopReason> },
}

/// Edge detector over the polled status byte.
///
/// The agent raises `STOP_SET` as a one-shot latch when a new stop lands
/// and clears it once reported, so observing `STOP_SET|STOP` always means
/// a fresh stop even if the `STOP` bit itself never toggled (stop at a
/// breakpoint, step, stop while already stopped on another thread).
/// Without the latch, only a running-to-stopped transition counts.
#[derive(Debug, Default)]
pub struct StatusTracker {
    current: Status,
}

impl StatusTracker {
    pub fn current(&self) -> Status {
        self.current
    }

    /// Fold in a polled status byte. Mid-reset responses are discarded
    /// without touching the tracked state.
    pub fn observe(&mut self, new: Status) -> StatusChange {
        if new.is_resetting() {
            return StatusChange::None;
        }
        let prev = self.current;
        self.current = new;

        if new.stop_just_set() && new.is_stopped() {
            let reason = new.has_exception().then_some(StopReason::Exception);
            StatusChange::Stopped { reason }
        } else if prev.stop_edge(new) && new.is_stopped() {
            StatusChange::Stopped { reason: None }
        } else {
            StatusChange::None
        }
    }
}

/// Periodic READ_STATUS poll. Reschedules itself a fixed delay after each
/// completion so a slow target stretches the period instead of stacking
/// requests. Individual poll failures are ignored; the loop only ends when
/// the transport is gone.
pub(crate) async fn status_loop<S, L>(inner: Arc<SessionInner<S, L>>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    L: ClassLoader,
{
    while inner.transport.is_connected() {
        poll_status(&inner).await;
        sleep(inner.config.status_interval).await;
    }
    debug!("status poll ended: transport closed");
    if !inner.closing.load(Ordering::SeqCst) {
        inner.events.emit_error();
    }
    inner.emit_close_once();
}

async fn poll_status<S, L>(inner: &Arc<SessionInner<S, L>>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    L: ClassLoader,
{
    let Some(response) = inner
        .transport
        .send_cmd(Command::ReadStatus, &[], inner.config.command_timeout)
        .await
    else {
        return;
    };
    if !response.is_ok() || response.data.is_empty() {
        return;
    }

    let status = Status::from_byte(response.data[0]);
    trace!(?status, "status poll");

    let change = {
        let mut state = inner.lock_state();
        let change = state.tracker.observe(status);
        if matches!(change, StatusChange::Stopped { .. }) {
            state.stack_frames = None;
        }
        change
    };

    if let StatusChange::Stopped { reason } = change {
        debug!(?reason, "target stopped");
        inner.events.emit_stop(reason);
    }
}

/// Periodic READ_CONSOLE poll, gated on the CONSOLE bit of the last known
/// status so an idle target costs nothing beyond the status poll.
pub(crate) async fn console_loop<S, L>(inner: Arc<SessionInner<S, L>>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    L: ClassLoader,
{
    while inner.transport.is_connected() {
        let pending = inner.lock_state().tracker.current().has_console_output();
        if pending {
            poll_console(&inner).await;
        }
        sleep(inner.config.console_interval).await;
    }
}

async fn poll_console<S, L>(inner: &Arc<SessionInner<S, L>>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    L: ClassLoader,
{
    let Some(response) = inner
        .transport
        .send_cmd(Command::ReadConsole, &[], inner.config.command_timeout)
        .await
    else {
        return;
    };
    if !response.is_ok() || response.data.is_empty() {
        return;
    }
    let text = String::from_utf8_lossy(&response.data);
    inner.events.emit_stdout(&text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observe(tracker: &mut StatusTracker, byte: u8) -> StatusChange {
        tracker.observe(Status::from_byte(byte))
    }

    #[test]
    fn fresh_stop_with_exception_reports_reason() {
        let mut tracker = StatusTracker::default();
        // running -> stopped on a thrown exception
        let change = observe(&mut tracker, 0x07);
        assert_eq!(
            change,
            StatusChange::Stopped {
                reason: Some(StopReason::Exception)
            }
        );
    }

    #[test]
    fn stop_latch_fires_even_without_stop_edge() {
        let mut tracker = StatusTracker::default();
        assert_eq!(
            observe(&mut tracker, Status::STOP),
            StatusChange::Stopped { reason: None }
        );
        // still stopped, but the agent latched a new stop (e.g. a step)
        assert_eq!(
            observe(&mut tracker, Status::STOP | Status::STOP_SET),
            StatusChange::Stopped { reason: None }
        );
    }

    #[test]
    fn steady_state_emits_nothing() {
        let mut tracker = StatusTracker::default();
        observe(&mut tracker, Status::STOP);
        assert_eq!(observe(&mut tracker, Status::STOP), StatusChange::None);
        assert_eq!(
            observe(&mut tracker, Status::STOP | Status::CONSOLE),
            StatusChange::None
        );
    }

    #[test]
    fn resume_emits_nothing() {
        let mut tracker = StatusTracker::default();
        observe(&mut tracker, Status::STOP);
        assert_eq!(observe(&mut tracker, 0x00), StatusChange::None);
    }

    #[test]
    fn reset_responses_are_discarded() {
        let mut tracker = StatusTracker::default();
        let change = observe(&mut tracker, Status::RESET | Status::STOP | Status::STOP_SET);
        assert_eq!(change, StatusChange::None);
        assert_eq!(tracker.current().as_byte(), 0x00);
    }

    #[test]
    fn latch_while_running_does_not_fire() {
        let mut tracker = StatusTracker::default();
        // STOP_SET without STOP: agent mid-transition, wait for both
        assert_eq!(
            observe(&mut tracker, Status::STOP_SET),
            StatusChange::None
        );
    }
}
