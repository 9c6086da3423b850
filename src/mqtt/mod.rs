//! MQTT broker connection.

pub mod client;

pub use client::MqttBus;
