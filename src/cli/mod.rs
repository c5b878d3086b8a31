//! CLI command implementations
//!
//! Each handler returns the process exit code.

pub mod bot;
pub mod check;
pub mod status;
