//! Utility functions.

pub mod format;
pub mod time;

pub use format::{format_bytes, format_percent};
pub use time::format_clock;
