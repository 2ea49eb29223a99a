// ABOUTME: Defines the debug-agent command opcodes and shared response codes
// ABOUTME: Implements response-bit masking for echoed commands

use num_enum::TryFromPrimitive;

/// Commands understood by the on-target debug agent.
///
/// Each request frame carries one of these opcodes; the agent echoes the
/// opcode in its response, optionally with the top bit set to mark the frame
/// as a response. Compare echoed opcodes through [`Command::matches`] so the
/// response bit never leaks into equality checks.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Poll the run/stop/exception/console status byte
    ReadStatus = 0x00,
    /// Read one stack frame by index
    ReadStackTrace = 0x01,
    /// Install a breakpoint at (pc, class, method, descriptor)
    AddBreakpoint = 0x02,
    /// Remove a single breakpoint
    RemoveBreakpoint = 0x03,
    /// Clear the agent-side breakpoint set unconditionally
    RemoveAllBreakpoints = 0x04,
    /// Resume execution
    Run = 0x05,
    /// Suspend execution
    Stop = 0x06,
    /// Step into the next call
    StepIn = 0x07,
    /// Step over the current line
    StepOver = 0x08,
    /// Step out of the current frame
    StepOut = 0x09,
    /// Enable or disable stop-on-exception
    SetExceptionMode = 0x0A,
    /// Read the pending exception's type and message
    ReadExceptionInfo = 0x0B,
    /// Read a local-variable slot of a frame
    ReadLocal = 0x0C,
    /// Read an object field by name
    ReadField = 0x0D,
    /// Read a span of array elements
    ReadArray = 0x0E,
    /// Read an object's size and runtime type name
    ReadSizeAndType = 0x0F,
    /// Drain buffered console output
    ReadConsole = 0x10,
    /// Restart the program with a new main class
    Restart = 0x11,
    /// Terminate the program (optionally the debug agent too)
    Terminate = 0x12,
    /// Begin a chunked file upload
    InstallFile = 0x13,
    /// Append one chunk to the upload in progress
    WriteFileData = 0x14,
    /// Finish the upload in progress
    CompleteInstall = 0x15,
}

/// Bit set on an echoed opcode to mark the frame as a response.
pub const RESPONSE_BIT: u8 = 0x80;

impl Command {
    /// Check whether an echoed opcode refers to this command, ignoring the
    /// response bit.
    pub fn matches(self, echoed: u8) -> bool {
        self as u8 == echoed & !RESPONSE_BIT
    }
}

/// Result code carried in the first payload byte of every response.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    /// Operation succeeded; the rest of the payload is valid
    Ok = 0x00,
    /// Agent cannot service the request right now
    Busy = 0x01,
    /// Operation failed on the target
    Fail = 0x02,
    /// Opcode not recognised by the agent
    Unknown = 0xFF,
}
