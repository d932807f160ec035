//! Real-time command handling.
//!
//! Runtime commands bypass program text: the interceptor raises atomic
//! flags that the motion system consumes from its foreground loop, and the
//! status report command is answered with a [`StatusReport`].

mod flags;
mod interceptor;
mod report;

pub use flags::RuntimeFlags;
pub use interceptor::{RealtimeCommand, RealtimeInterceptor};
pub use report::{StatusReport, STATUS_REPORT_CAPACITY};
