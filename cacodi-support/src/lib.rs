//! # Cacodi Support
//!
//! Shared utilities for the cacodi crates.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - `tracing` subscriber setup for resolution diagnostics

pub mod logging;
pub mod rendering;
