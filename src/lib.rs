//! Cachemux - reconstructs playable MP4s from a fragmented m4s cache
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cache;
pub mod config;
pub mod duplicate;
pub mod hashing;
pub mod metadata;
pub mod subtitle;
pub mod synthesis;
