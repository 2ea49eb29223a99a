//! Debug-session client core for a small managed-code runtime.
//!
//! The target executes class-file-format programs and embeds a debug agent
//! speaking a compact binary command/response protocol over a byte stream
//! (typically TCP). This crate mediates between a front-end debug adapter
//! and that agent: framed CRC-checked transport with a single-inflight
//! gate, status polling with edge-detected stop events, line-level
//! breakpoint reconciliation, stack and variable inspection, and chunked
//! file install.
//!
//! # Examples
//!
//! ## Stop at a breakpoint and read locals
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
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The loader resolves lines to code positions from the program's
//!     // class files; supply your own implementation.
//!     let session =
//!         DebugSession::connect("192.168.1.10:5555", MyLoader, SessionConfig::default()).await?;
//!
//!     session.on_stop(|reason| println!("stopped ({reason:?})"));
//!     session.on_stdout(|text| print!("{text}"));
//!     session.start_check_status();
//!
//!     session.set_breakpoints(&[10], "Main.java").await?;
//!     session.run().await?;
//!
//!     // ...once stopped:
//!     let frames = session.stack_frame_request().await?;
//!     let locals = session.read_local_variables(frames[0].id).await?;
//!     for local in &locals {
//!         println!("{} = {}", local.name, local.value);
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod loader;
pub mod transport;


// Re-export codec types for direct access
pub use codec::{CodecError, DataResponse};

// Re-export the main client API for easy access
pub use client::{
    DebugError, DebugResult, DebugSession, SessionConfig, StackTraceEntry, StatusChange,
    StatusTracker, StopReason, Variable,
};
pub use connection::Connection;
pub use datatypes::{
    Command, ExceptionInfo, FieldInfo, LineInfo, LocalVar, ResponseCode, StackFrame, Status,
    Value, ValueInfo,
};
pub use loader::ClassLoader;
pub use transport::TransportGate;
