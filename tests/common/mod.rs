//! Common test utilities for integration tests.
//!
//! # Modules
//!
//! - `logger`: Structured test logging infrastructure
//! - `log_capture`: Assertions over `tracing` events emitted by the crate
//! - `mock`: Canned responses for the Google and Telegram endpoints

#![allow(dead_code)]

pub mod log_capture;
pub mod logger;
pub mod mock;
