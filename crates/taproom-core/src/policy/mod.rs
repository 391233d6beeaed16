//! Policy layer: pre-routing gates and the mute registry
//!
//! - [`violation`]: stateless scan of raw user text for house-rule
//!   violations (shouting, empty input)
//! - [`crisis`]: stateless crisis-language detection
//! - [`mute`]: per-router registry of suppressed personas

pub mod crisis;
pub mod mute;
pub mod violation;

pub use crisis::is_crisis;
pub use mute::MuteRegistry;
pub use violation::{scan, Violation};
