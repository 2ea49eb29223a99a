// ABOUTME: Front-end-facing shapes produced by the session
// ABOUTME: Variables, stack-trace rows, and stop reasons in debug-adapter form

use std::fmt;

/// Why the target stopped, attached to a `stop` event when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exception,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exception => write!(f, "exception"),
        }
    }
}

/// One row of a variables view.
///
/// `variables_reference` is nonzero for expandable objects and arrays; pass
/// it back to [`DebugSession::read_variable`](crate::client::DebugSession::read_variable)
/// to fetch children. Zero marks a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub variables_reference: u32,
}

impl Variable {
    /// Placeholder row for a value that failed to decode; the surrounding
    /// batch still succeeds.
    pub(crate) fn not_available(name: impl Into<String>) -> Variable {
        Variable {
            name: name.into(),
            value: "not available".into(),
            variables_reference: 0,
        }
    }
}

/// One row of the front-end stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceEntry {
    /// Frame id, 0 at the top of the stack
    pub id: u32,
    /// Display name, e.g. `Main.run(int, String[])`
    pub name: String,
    /// Source display name, e.g. `Main.java`
    pub source_name: String,
    /// On-disk path of the source file
    pub source_path: String,
    /// 1-based source line
    pub line: u32,
    /// The frame's pc, stringified for the adapter protocol
    pub instruction_pointer_reference: String,
}
