//! Common utilities for the keyboard move workspace
//!
//! This crate provides the square, file, rank and piece-code conversions
//! shared by the chess rules crate, the keyboard move controller and the
//! terminal client.

pub mod converters;

// Re-export commonly used items
pub use converters::*;
