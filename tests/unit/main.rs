//! Unit test harness for cnc-motion.
//!
//! This module organizes the configuration tests that run against the
//! public API.

mod config_parsing;
mod config_validation;
