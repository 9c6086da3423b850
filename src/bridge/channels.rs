//! Bridge channel management.
//!
//! Groups the channels that carry platform and bus events into the
//! controller, plus the shutdown flag.

use tokio::sync::{mpsc, watch};

use crate::common::{BusEvent, PlatformEvent};

/// Sending halves handed to the Discord and MQTT adapters.
pub struct EventSenders {
    /// Discord adapter -> controller.
    pub platform_tx: mpsc::UnboundedSender<PlatformEvent>,
    /// MQTT event loop pump -> controller.
    pub bus_tx: mpsc::UnboundedSender<BusEvent>,
}

/// Receiving halves consumed by the controller.
pub struct ControllerChannels {
    pub platform_rx: mpsc::UnboundedReceiver<PlatformEvent>,
    pub bus_rx: mpsc::UnboundedReceiver<BusEvent>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created at startup.
pub struct ChannelBundle {
    pub senders: EventSenders,
    pub controller: ControllerChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    pub fn new() -> Self {
        let (platform_tx, platform_rx) = mpsc::unbounded_channel();
        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            senders: EventSenders { platform_tx, bus_tx },
            controller: ControllerChannels {
                platform_rx,
                bus_rx,
                shutdown_rx,
            },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
