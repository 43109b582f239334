//! Typed row models for the engine's tables.

pub mod fallback;
pub mod incident;
pub mod notification;
pub mod volunteer;
