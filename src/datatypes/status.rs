// ABOUTME: Strongly-typed wrapper for the agent's status byte bitfield
// ABOUTME: Provides named accessors for the stop/exception/console/reset flags

use std::fmt;

/// Status byte returned by `READ_STATUS`.
///
/// The agent packs its run state into one byte of flags. `STOP` reports the
/// current run state, `STOP_SET` is a one-shot latch the agent raises when a
/// new stop lands (and clears once it has been reported), `EXCP` qualifies a
/// stop as exceptional, `CONSOLE` signals buffered console output, and
/// `RESET` marks a response produced while the target is mid-reset, which
/// the client must discard.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status(u8);

impl Status {
    /// Target is currently stopped
    pub const STOP: u8 = 0x01;
    /// A new stop landed since the last report
    pub const STOP_SET: u8 = 0x02;
    /// The stop was caused by an exception
    pub const EXCP: u8 = 0x04;
    /// Console output is waiting to be drained
    pub const CONSOLE: u8 = 0x08;
    /// Target is mid-reset; discard this response
    pub const RESET: u8 = 0x80;

    pub fn from_byte(raw: u8) -> Self {
        Self(raw)
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn is_stopped(self) -> bool {
        self.0 & Self::STOP != 0
    }

    pub fn stop_just_set(self) -> bool {
        self.0 & Self::STOP_SET != 0
    }

    pub fn has_exception(self) -> bool {
        self.0 & Self::EXCP != 0
    }

    pub fn has_console_output(self) -> bool {
        self.0 & Self::CONSOLE != 0
    }

    pub fn is_resetting(self) -> bool {
        self.0 & Self::RESET != 0
    }

    /// True when the `STOP` bit differs between `self` and `other`.
    pub fn stop_edge(self, other: Status) -> bool {
        (self.0 ^ other.0) & Self::STOP != 0
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_stopped() {
            names.push("STOP");
        }
        if self.stop_just_set() {
            names.push("STOP_SET");
        }
        if self.has_exception() {
            names.push("EXCP");
        }
        if self.has_console_output() {
            names.push("CONSOLE");
        }
        if self.is_resetting() {
            names.push("RESET");
        }
        write!(f, "Status({:#04x}; {})", self.0, names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_accessors() {
        let status = Status::from_byte(Status::STOP | Status::EXCP);
        assert!(status.is_stopped());
        assert!(status.has_exception());
        assert!(!status.stop_just_set());
        assert!(!status.has_console_output());
        assert!(!status.is_resetting());
    }

    #[test]
    fn stop_edge_detects_transitions() {
        let running = Status::from_byte(0x00);
        let stopped = Status::from_byte(Status::STOP);
        assert!(running.stop_edge(stopped));
        assert!(stopped.stop_edge(running));
        assert!(!stopped.stop_edge(Status::from_byte(Status::STOP | Status::CONSOLE)));
    }
}
