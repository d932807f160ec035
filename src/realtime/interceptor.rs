//! Runtime command recognition on the raw input stream.

use crate::config::RuntimeCommands;

use super::flags::RuntimeFlags;

/// A reserved runtime command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RealtimeCommand {
    /// Report machine state and position.
    StatusReport,
    /// Decelerate to a hold, keeping the queue.
    FeedHold,
    /// Start a cycle or resume a hold.
    CycleStart,
    /// Abort all motion.
    Reset,
}

impl RealtimeCommand {
    /// Execution flag raised by this command.
    pub fn flag(self) -> u8 {
        match self {
            Self::StatusReport => RuntimeFlags::STATUS_REPORT,
            Self::FeedHold => RuntimeFlags::FEED_HOLD,
            Self::CycleStart => RuntimeFlags::CYCLE_START,
            Self::Reset => RuntimeFlags::RESET,
        }
    }
}

/// Picks runtime commands off incoming bytes before program text handling.
///
/// Recognised bytes raise their flag and are swallowed; every other byte is
/// passed through unchanged. Safe to call from a receive interrupt.
#[derive(Debug, Clone, Copy)]
pub struct RealtimeInterceptor<'a> {
    commands: RuntimeCommands,
    flags: &'a RuntimeFlags,
}

impl<'a> RealtimeInterceptor<'a> {
    /// Create an interceptor raising flags in `flags`.
    pub fn new(commands: RuntimeCommands, flags: &'a RuntimeFlags) -> Self {
        Self { commands, flags }
    }

    /// Identify a runtime command byte.
    pub fn classify(&self, byte: u8) -> Option<RealtimeCommand> {
        let commands = &self.commands;
        if byte == commands.status_report {
            Some(RealtimeCommand::StatusReport)
        } else if byte == commands.feed_hold {
            Some(RealtimeCommand::FeedHold)
        } else if byte == commands.cycle_start {
            Some(RealtimeCommand::CycleStart)
        } else if byte == commands.reset {
            Some(RealtimeCommand::Reset)
        } else {
            None
        }
    }

    /// Handle one incoming byte; returns it if it belongs to program text.
    #[inline]
    pub fn intercept(&self, byte: u8) -> Option<u8> {
        match self.classify(byte) {
            Some(command) => {
                self.flags.set(command.flag());
                None
            }
            None => Some(byte),
        }
    }

    /// Strip runtime commands from a byte stream.
    pub fn filter<I>(&self, bytes: I) -> impl Iterator<Item = u8> + 'a
    where
        I: IntoIterator<Item = u8> + 'a,
        I::IntoIter: 'a,
    {
        let interceptor = *self;
        bytes
            .into_iter()
            .filter_map(move |byte| interceptor.intercept(byte))
    }
}
