//! Gifsmith - Video clip to GIF converter
//!
//! This library crate exposes the core functionality for integration testing.

pub mod artifacts;
pub mod config;
pub mod conversion;
pub mod intake;
pub mod server;
