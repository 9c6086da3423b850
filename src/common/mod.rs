//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod types;

pub use messages::{BusEvent, PlatformEvent};
pub use types::VoiceStateSnapshot;
