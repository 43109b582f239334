//! Shared vocabulary for the RVOIS notification and fallback engine.
//!
//! This crate holds the id/timestamp aliases, well-known status and channel
//! constants, the volunteer capacity model, and the common error enum used
//! across the workspace.

pub mod capacity;
pub mod error;
pub mod status;
pub mod types;

pub use error::CoreError;
