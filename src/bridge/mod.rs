//! Discord to MQTT bridge.
//!
//! ## Module Structure
//!
//! - `channels`: Event and shutdown channels
//! - `commands`: Command Interpreter for the command topic
//! - `controller`: Dispatch loop (`BridgeController`)
//! - `discovery`: Home Assistant discovery catalog
//! - `ports`: `ChatPlatform` / `MessageBus` seams
//! - `projector`: Pure state projections

pub mod channels;
pub mod commands;
pub mod controller;
pub mod discovery;
pub mod ports;
pub mod projector;

#[cfg(test)]
pub(crate) mod testing;

pub use channels::ChannelBundle;
pub use controller::BridgeController;
