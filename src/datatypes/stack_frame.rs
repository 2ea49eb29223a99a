// ABOUTME: A decoded stack frame with its in-scope local variables

use crate::datatypes::line_info::{LineInfo, LocalVar};

/// One frame of the stopped target's call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Index of the frame, 0 being the top of the stack
    pub frame_id: u32,
    pub line_info: LineInfo,
    /// Set on the outermost frame; walking stops here
    pub is_end_frame: bool,
    /// Local-variable-table entries whose scope contains the frame's pc,
    /// `None` when no entry applies
    pub local_variables: Option<Vec<LocalVar>>,
}
