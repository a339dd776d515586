//! Common utilities for chessmux
//!
//! This crate provides the shared square/piece/color conversion helpers
//! used across the chessmux rules engine, search engine, and client layers.

pub mod converters;

// Re-export commonly used items
pub use converters::*;
