//! Reserved runtime command characters.

use serde::Deserialize;

/// Bytes picked off the input stream before it reaches program text handling.
///
/// They must never appear in a streamed program: control characters and
/// extended ASCII (> 127) are safe choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct RuntimeCommands {
    /// Request a status report.
    pub status_report: u8,
    /// Decelerate to a stop and hold.
    pub feed_hold: u8,
    /// Start or resume a cycle.
    pub cycle_start: u8,
    /// Abort all motion.
    pub reset: u8,
}

impl Default for RuntimeCommands {
    fn default() -> Self {
        Self {
            status_report: b'?',
            feed_hold: b'!',
            cycle_start: b'~',
            reset: 0x18,
        }
    }
}

/// Punctuation with a meaning in program text.
const PROGRAM_PUNCTUATION: &[u8] = b".-+()[];%/#=*,:$";

impl RuntimeCommands {
    /// The four command bytes.
    #[inline]
    pub fn as_array(&self) -> [u8; 4] {
        [self.status_report, self.feed_hold, self.cycle_start, self.reset]
    }

    /// Check that all four bytes differ.
    pub fn are_distinct(&self) -> bool {
        let bytes = self.as_array();
        (0..bytes.len()).all(|i| (i + 1..bytes.len()).all(|j| bytes[i] != bytes[j]))
    }

    /// Check whether a byte could be part of program text.
    pub fn is_program_syntax(byte: u8) -> bool {
        byte.is_ascii_alphanumeric()
            || byte.is_ascii_whitespace()
            || PROGRAM_PUNCTUATION.contains(&byte)
    }
}
