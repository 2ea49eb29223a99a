// ABOUTME: The debug-session facade: run control, inspection, events, lifecycle
// ABOUTME: Owns the transport gate, the class loader, and all session-scoped state

use crate::client::breakpoints::{self, Breakpoint};
use crate::client::error::{DebugError, DebugResult};
use crate::client::events::EventRegistry;
use crate::client::poller::{self, StatusTracker};
use crate::client::types::{StackTraceEntry, StopReason, Variable};
use crate::client::{install, stack, variables};
use crate::codec::DataResponse;
use crate::datatypes::wire_string::{put_wire_string, wire_string_len};
use crate::datatypes::{Command, ExceptionInfo, StackFrame, Status, ValueInfo};
use crate::loader::ClassLoader;
use crate::transport::TransportGate;
use bytes::BytesMut;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;

/// Session tuning knobs.
///
/// The defaults match the agent's expectations: status is polled every
/// 100 ms, console output every 300 ms, ordinary commands time out after
/// 200 ms, run-control commands that restart or kill the program get 5 s,
/// and each file-install step gets 2 s.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub status_interval: Duration,
    pub console_interval: Duration,
    pub command_timeout: Duration,
    pub control_timeout: Duration,
    pub install_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(100),
            console_interval: Duration::from_millis(300),
            command_timeout: crate::transport::DEFAULT_TIMEOUT,
            control_timeout: Duration::from_secs(5),
            install_timeout: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    pub fn with_console_interval(mut self, interval: Duration) -> Self {
        self.console_interval = interval;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }
}

/// Mutable session state, guarded by one short-lived lock.
///
/// Only ever touched between awaits, never across them.
pub(crate) struct SessionState {
    pub(crate) tracker: StatusTracker,
    pub(crate) breakpoints: Vec<Breakpoint>,
    pub(crate) stack_frames: Option<Vec<StackFrame>>,
    pub(crate) variable_refs: HashMap<u32, ValueInfo>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            tracker: StatusTracker::default(),
            breakpoints: Vec::new(),
            stack_frames: None,
            variable_refs: HashMap::new(),
        }
    }
}

pub(crate) struct SessionInner<S, L> {
    pub(crate) transport: TransportGate<S>,
    pub(crate) loader: L,
    pub(crate) config: SessionConfig,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) events: EventRegistry,
    pub(crate) closing: AtomicBool,
    close_emitted: AtomicBool,
    polls: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, L> SessionInner<S, L> {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn invalidate_frames(&self) {
        self.lock_state().stack_frames = None;
    }

    pub(crate) fn emit_close_once(&self) {
        if !self.close_emitted.swap(true, Ordering::SeqCst) {
            self.events.emit_close();
        }
    }
}

impl<S, L> SessionInner<S, L>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Issue one command and require an OK response.
    pub(crate) async fn request(
        &self,
        cmd: Command,
        payload: &[u8],
        timeout: Duration,
    ) -> DebugResult<DataResponse> {
        let response = self
            .transport
            .send_cmd(cmd, payload, timeout)
            .await
            .ok_or(DebugError::NoResponse(cmd))?;
        if !response.is_ok() {
            return Err(DebugError::CommandFailed(cmd));
        }
        Ok(response)
    }
}

/// A debug session against one target runtime.
///
/// Cheap to clone; clones share the same underlying session. All
/// operations funnel through the single-inflight transport gate, so user
/// commands and the background status polls never overlap on the wire.
///
/// # Example
///
/// ```rust,no_run
/// use vmdbg::{DebugSession, SessionConfig};
/// # use vmdbg::{ClassLoader, FieldInfo, LineInfo};
/// # struct MyLoader;
/// # impl ClassLoader for MyLoader {
/// #     fn line_info_from_line(&self, _: u32, _: &str) -> Option<LineInfo> { None }
/// #     fn line_info_from_pc(&self, _: u32, _: &str, _: &str, _: &str) -> Option<LineInfo> { None }
/// #     fn is_instance_of(&self, _: &str, _: &str) -> bool { false }
/// #     fn field_list(&self, _: &str, _: bool) -> Option<Vec<FieldInfo>> { None }
/// # }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let loader = MyLoader;
///     let session = DebugSession::connect("192.168.1.10:5555", loader, SessionConfig::default()).await?;
///
///     session.on_stop(|reason| println!("stopped: {reason:?}"));
///     session.on_stdout(|text| print!("{text}"));
///     session.start_check_status();
///
///     session.set_breakpoints(&[10], "Main.java").await?;
///     session.run().await?;
///
///     // ... drive the front end; eventually:
///     session.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct DebugSession<S, L> {
    pub(crate) inner: Arc<SessionInner<S, L>>,
}

impl<S, L> Clone for DebugSession<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L> DebugSession<TcpStream, L>
where
    L: ClassLoader,
{
    /// Connect to a debug agent listening on `addr`.
    pub async fn connect<T: ToSocketAddrs>(
        addr: T,
        loader: L,
        config: SessionConfig,
    ) -> DebugResult<DebugSession<TcpStream, L>> {
        let socket = TcpStream::connect(addr).await?;
        Ok(DebugSession::new(socket, loader, config))
    }
}

impl<S, L> DebugSession<S, L>
where
    S: AsyncRead + AsyncWrite + Unpin,
    L: ClassLoader,
{
    /// Wrap an already-established byte stream to the agent.
    pub fn new(stream: S, loader: L, config: SessionConfig) -> DebugSession<S, L> {
        DebugSession {
            inner: Arc::new(SessionInner {
                transport: TransportGate::new(stream),
                loader,
                config,
                state: Mutex::new(SessionState::new()),
                events: EventRegistry::default(),
                closing: AtomicBool::new(false),
                close_emitted: AtomicBool::new(false),
                polls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// The last status byte reported by the target.
    pub fn status(&self) -> Status {
        self.inner.lock_state().tracker.current()
    }

    /// Register the `stop` handler; the latest registration wins.
    pub fn on_stop(&self, handler: impl Fn(Option<StopReason>) + Send + Sync + 'static) {
        self.inner.events.set_stop(Arc::new(handler));
    }

    /// Register the `stdout` handler for console output.
    pub fn on_stdout(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        self.inner.events.set_stdout(Arc::new(handler));
    }

    /// Register the `error` handler for unexpected transport loss.
    pub fn on_error(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.events.set_error(Arc::new(handler));
    }

    /// Register the `close` handler.
    pub fn on_close(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.events.set_close(Arc::new(handler));
    }

    /// Resume execution. A no-op when the target is already running.
    pub async fn run(&self) -> DebugResult<()> {
        if !self.status().is_stopped() {
            return Ok(());
        }
        self.inner
            .request(Command::Run, &[], self.inner.config.command_timeout)
            .await?;
        self.inner.invalidate_frames();
        Ok(())
    }

    /// Suspend execution. A no-op when the target is already stopped.
    pub async fn stop(&self) -> DebugResult<()> {
        if self.status().is_stopped() {
            return Ok(());
        }
        self.inner
            .request(Command::Stop, &[], self.inner.config.command_timeout)
            .await?;
        self.inner.invalidate_frames();
        Ok(())
    }

    pub async fn step_in(&self) -> DebugResult<()> {
        self.step(Command::StepIn).await
    }

    pub async fn step_over(&self) -> DebugResult<()> {
        self.step(Command::StepOver).await
    }

    pub async fn step_out(&self) -> DebugResult<()> {
        self.step(Command::StepOut).await
    }

    /// Steps carry the top frame's code length as a hint so the agent can
    /// bound its single-stepping; step-out needs none.
    async fn step(&self, cmd: Command) -> DebugResult<()> {
        let hint = if cmd == Command::StepOut {
            0
        } else {
            self.top_frame_code_length().await
        };
        self.inner
            .request(cmd, &hint.to_le_bytes(), self.inner.config.command_timeout)
            .await?;
        self.inner.invalidate_frames();
        Ok(())
    }

    async fn top_frame_code_length(&self) -> u32 {
        let cached = self
            .inner
            .lock_state()
            .stack_frames
            .as_ref()
            .and_then(|frames| frames.first().map(|f| f.line_info.code_length));
        if let Some(len) = cached {
            return len;
        }
        match stack::read_stack_frame(&self.inner, 0).await {
            Ok(Some(frame)) => frame.line_info.code_length,
            _ => 0,
        }
    }

    /// Restart the program with `main_class` as the entry point.
    pub async fn restart(&self, main_class: &str) -> DebugResult<()> {
        let mut payload = BytesMut::with_capacity(wire_string_len(main_class));
        put_wire_string(&mut payload, main_class);
        self.inner
            .request(Command::Restart, &payload, self.inner.config.control_timeout)
            .await?;
        self.inner.invalidate_frames();
        Ok(())
    }

    /// Terminate the program; `include_debugger` also shuts the agent down.
    pub async fn terminate(&self, include_debugger: bool) -> DebugResult<()> {
        self.inner
            .request(
                Command::Terminate,
                &[u8::from(include_debugger)],
                self.inner.config.control_timeout,
            )
            .await?;
        Ok(())
    }

    /// Reconcile the breakpoints for one source file against `lines`.
    pub async fn set_breakpoints(&self, lines: &[u32], source_path: &str) -> DebugResult<()> {
        breakpoints::set_breakpoints(&self.inner, lines, source_path).await
    }

    /// Clear the agent-side breakpoint set unconditionally.
    pub async fn remove_all_breakpoints(&self) -> DebugResult<()> {
        breakpoints::remove_all_breakpoints(&self.inner).await
    }

    /// Enable or disable stop-on-exception.
    pub async fn set_exception_breakpoints(&self, enabled: bool) -> DebugResult<()> {
        self.inner
            .request(
                Command::SetExceptionMode,
                &[u8::from(enabled)],
                self.inner.config.command_timeout,
            )
            .await?;
        Ok(())
    }

    /// Fetch the type and message of the exception the target stopped on.
    pub async fn read_exception_info(&self) -> DebugResult<ExceptionInfo> {
        let response = self
            .inner
            .request(
                Command::ReadExceptionInfo,
                &[],
                self.inner.config.command_timeout,
            )
            .await?;
        let mut cur = Cursor::new(response.data.as_ref());
        let malformed = |_| DebugError::MalformedResponse(Command::ReadExceptionInfo);
        let type_name =
            crate::datatypes::wire_string::get_name_string(&mut cur, "exception type")
                .map_err(malformed)?;
        let message =
            crate::datatypes::wire_string::get_name_string(&mut cur, "exception message")
                .map_err(malformed)?;
        Ok(ExceptionInfo { type_name, message })
    }

    /// The current stack trace in front-end shape, cached until the next
    /// stop edge, run, stop, or step.
    pub async fn stack_frame_request(&self) -> DebugResult<Vec<StackTraceEntry>> {
        stack::stack_frame_request(&self.inner).await
    }

    /// Decode the local variables of `frame_id`. Clears the
    /// variable-reference table; previously returned references die here.
    pub async fn read_local_variables(&self, frame_id: u32) -> DebugResult<Vec<Variable>> {
        variables::read_local_variables(&self.inner, frame_id).await
    }

    /// Expand a variable reference into its children. `Ok(None)` for
    /// unknown handles and primitives.
    pub async fn read_variable(&self, reference: u32) -> DebugResult<Option<Vec<Variable>>> {
        variables::read_variable(&self.inner, reference).await
    }

    /// Upload a file to the target, calling `progress(bytes_sent, total)`
    /// after each acknowledged chunk.
    pub async fn install_file(
        &self,
        file_name: &str,
        data: &[u8],
        progress: impl FnMut(usize, usize),
    ) -> DebugResult<()> {
        install::install_file(&self.inner, file_name, data, progress).await
    }
}

impl<S, L> DebugSession<S, L>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    L: ClassLoader + 'static,
{
    /// Start the background status and console polls. Idempotent; the
    /// polls run until the transport drops or [`disconnect`] is called.
    ///
    /// [`disconnect`]: DebugSession::disconnect
    pub fn start_check_status(&self) {
        let mut polls = self
            .inner
            .polls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !polls.is_empty() {
            return;
        }
        polls.push(tokio::spawn(poller::status_loop(Arc::clone(&self.inner))));
        polls.push(tokio::spawn(poller::console_loop(Arc::clone(&self.inner))));
    }

    /// Cancel the polls and close the transport. Pending commands resolve
    /// as failed; the `close` event fires exactly once.
    pub async fn disconnect(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
        let handles = {
            let mut polls = self
                .inner
                .polls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *polls)
        };
        for handle in handles {
            handle.abort();
        }
        self.inner.transport.shutdown().await;
        self.inner.emit_close_once();
    }
}
