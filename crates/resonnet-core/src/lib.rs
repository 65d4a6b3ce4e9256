//! # Resonnet Core
//!
//! Runtime-free request coordination for Resonnet: the findings model,
//! content fingerprinting, the bounded result cache, typing-cadence tracking
//! with adaptive debounce, response parsing, and the scheduler state machine
//! that decides when an analysis call fires.
//!
//! This crate contains no tokio, network, or filesystem code. Time is passed
//! in by the caller and side effects come back as [`scheduler::Effect`]
//! values, so every transition can be driven and asserted synchronously.

pub mod cache;
pub mod cadence;
pub mod fingerprint;
pub mod models;
pub mod parse;
pub mod scheduler;

/// Content whose trimmed length is below this many characters is never sent
/// for analysis.
pub const MIN_CONTENT_LENGTH: usize = 15;

/// Default capacity of the result cache.
pub const MAX_CACHE_ITEMS: usize = 20;

/// Length of `content` after trimming, in UTF-16 code units.
///
/// This is the unit the minimum-length threshold is measured in, so a prompt
/// counts the same here as in a browser editor.
pub fn trimmed_len(content: &str) -> usize {
    content.trim().encode_utf16().count()
}
