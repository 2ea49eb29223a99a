// ABOUTME: Debug-session client module: facade, events, and the operation engines
// ABOUTME: Exports the session, its config, errors, and the front-end shapes

//! Debug-session client.
//!
//! The [`DebugSession`] facade is the embedder's entry point. It owns the
//! single-inflight transport gate, the background status/console polls, the
//! breakpoint reconciler, the stack walker, the value decoder with its
//! variable-reference table, and the file installer.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vmdbg::{DebugSession, SessionConfig};
//! # use vmdbg::{ClassLoader, FieldInfo, LineInfo};
//! # struct MyLoader;
//! # impl ClassLoader for MyLoader {
//! #     fn line_info_from_line(&self, _: u32, _: &str) -> Option<LineInfo> { None }
//! #     fn line_info_from_pc(&self, _: u32, _: &str, _: &str, _: &str) -> Option<LineInfo> { None }
//! #     fn is_instance_of(&self, _: &str, _: &str) -> bool { false }
//! #     fn field_list(&self, _: &str, _: bool) -> Option<Vec<FieldInfo>> { None }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = DebugSession::connect("192.168.1.10:5555", MyLoader, SessionConfig::default()).await?;
//! session.on_stop(|reason| println!("stopped: {reason:?}"));
//! session.start_check_status();
//!
//! session.set_breakpoints(&[10, 25], "Main.java").await?;
//! session.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! * [`DebugSession`] — the public facade; cheap clones share one session
//! * `poller` — background status/console polls with edge-detected events
//! * `breakpoints` — add/remove diffing against the acknowledged set
//! * `stack` / `variables` — inspection engines behind the same gate
//! * `install` — chunked file upload

pub mod error;
pub mod events;
pub mod session;
pub mod types;

pub(crate) mod breakpoints;
pub(crate) mod install;
pub(crate) mod poller;
pub(crate) mod stack;
pub(crate) mod variables;

pub use error::{DebugError, DebugResult};
pub use poller::{StatusChange, StatusTracker};
pub use session::{DebugSession, SessionConfig};
pub use types::{StackTraceEntry, StopReason, Variable};
