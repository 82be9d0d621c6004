//! # Trellis Support
//!
//! Shared utilities for the Trellis DI crates.
//!
//! This crate provides:
//! - Text rendering for error messages and construction reports
//! - A `tracing-subscriber` bootstrap for binaries and tests

pub mod logging;
pub mod rendering;
