// ABOUTME: Single-inflight request/response gate over the frame connection
// ABOUTME: Serializes commands, applies per-request timeouts, discards stale responses

use crate::codec::DataResponse;
use crate::connection::Connection;
use crate::datatypes::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// Default per-request timeout for ordinary commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// The wire gate: at most one request is inflight at any time.
///
/// Callers from any task funnel through one fair async mutex, so requests
/// hit the wire strictly in submission order and responses pair 1:1 with
/// requests. A request that times out releases the gate; if its response
/// arrives late, the next request finds it first, sees a command echo that
/// does not match, and discards it, so a straggler can never be taken for
/// the answer to a different command.
#[derive(Debug)]
pub struct TransportGate<S> {
    conn: Mutex<Connection<S>>,
    connected: AtomicBool,
}

impl<S> TransportGate<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> TransportGate<S> {
        TransportGate {
            conn: Mutex::new(Connection::new(stream)),
            connected: AtomicBool::new(true),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Send one command and await its response.
    ///
    /// Returns `None` on write failure, timeout, or a dead transport; the
    /// caller treats all three as the operation failing. A returned
    /// response is guaranteed to echo the requested command (response bit
    /// masked).
    pub async fn send_cmd(
        &self,
        cmd: Command,
        payload: &[u8],
        timeout: Duration,
    ) -> Option<DataResponse> {
        if !self.is_connected() {
            return None;
        }

        let mut conn = self.conn.lock().await;
        if !self.is_connected() {
            return None;
        }

        if let Err(err) = conn.write_frame(cmd, payload).await {
            warn!(?cmd, %err, "write failed");
            self.mark_disconnected();
            return None;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match timeout_at(deadline, conn.read_frame()).await {
                Err(_) => {
                    debug!(?cmd, ?timeout, "request timed out");
                    return None;
                }
                Ok(Ok(Some(response))) => {
                    if cmd.matches(response.cmd) {
                        return Some(response);
                    }
                    debug!(?cmd, stale = response.cmd, "discarding stale response frame");
                }
                Ok(Ok(None)) => {
                    debug!(?cmd, "connection closed by peer");
                    self.mark_disconnected();
                    return None;
                }
                Ok(Err(err)) => {
                    warn!(?cmd, %err, "receive failed");
                    self.mark_disconnected();
                    return None;
                }
            }
        }
    }

    /// Close the transport. Pending and future `send_cmd` calls resolve
    /// `None`.
    pub async fn shutdown(&self) {
        self.mark_disconnected();
        let mut conn = self.conn.lock().await;
        if let Err(err) = conn.shutdown().await {
            debug!(%err, "shutdown");
        }
    }
}
