//! Execution flags shared between input handling, the foreground loop and
//! the scheduler tick.

use portable_atomic::{AtomicU8, Ordering};

/// Bit set of pending runtime events.
///
/// Writers only ever set bits; the foreground consumes them with
/// [`RuntimeFlags::take`]. Each operation is a single atomic word access, so
/// a `static` instance can be shared with interrupt handlers.
#[derive(Debug, Default)]
pub struct RuntimeFlags(AtomicU8);

impl RuntimeFlags {
    /// A status report was requested.
    pub const STATUS_REPORT: u8 = 1 << 0;
    /// Start or resume a cycle.
    pub const CYCLE_START: u8 = 1 << 1;
    /// The scheduler ran out of segments.
    pub const CYCLE_STOP: u8 = 1 << 2;
    /// Decelerate to a hold.
    pub const FEED_HOLD: u8 = 1 << 3;
    /// Abort all motion.
    pub const RESET: u8 = 1 << 4;
    /// A hard limit tripped.
    pub const ALARM: u8 = 1 << 5;

    /// Create with no flag raised.
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Raise every flag in `bits`.
    #[inline]
    pub fn set(&self, bits: u8) {
        self.0.fetch_or(bits, Ordering::AcqRel);
    }

    /// Lower every flag in `bits`.
    #[inline]
    pub fn clear(&self, bits: u8) {
        self.0.fetch_and(!bits, Ordering::AcqRel);
    }

    /// Check if any flag in `bits` is raised.
    #[inline]
    pub fn is_set(&self, bits: u8) -> bool {
        self.0.load(Ordering::Acquire) & bits != 0
    }

    /// Raised flags, without consuming them.
    #[inline]
    pub fn peek(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    /// Consume every raised flag.
    #[inline]
    pub fn take(&self) -> u8 {
        self.0.swap(0, Ordering::AcqRel)
    }
}
