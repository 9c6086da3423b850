//! `MessageBus` over rumqttc.
//!
//! The event loop runs on its own task and reports connection changes and
//! inbound publishes as `BusEvent`s. rumqttc reconnects on the next poll after
//! an error; the pump only paces those polls.

use std::time::Duration;

use backon::BackoffBuilder;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet,
    QoS,
};
use serenity::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::bridge::ports::MessageBus;
use crate::common::error::BusResult;
use crate::common::BusEvent;
use crate::config::types::BridgeConfig;

/// Outstanding requests buffered while the broker is unreachable.
const REQUEST_CAPACITY: usize = 64;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// 1s initial, 30s max, unlimited retries.
fn bus_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(MAX_RETRY_DELAY)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Broker options: credentials, keep-alive, clean session and the offline will.
pub fn mqtt_options(config: &BridgeConfig) -> MqttOptions {
    let mqtt = &config.mqtt;
    let mut options = MqttOptions::new(mqtt.broker_client_id(), mqtt.host.clone(), mqtt.port);
    options
        .set_credentials(mqtt.username.clone(), mqtt.password.clone())
        .set_keep_alive(Duration::from_secs(mqtt.keep_alive_secs))
        .set_clean_session(true)
        .set_last_will(LastWill::new(
            config.topics.connected.clone(),
            "false",
            QoS::AtLeastOnce,
            true,
        ));
    options
}

/// Map a raw event loop event to a bridge event.
fn translate(event: &Event) -> Option<BusEvent> {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
            Some(BusEvent::Connected)
        }
        Event::Incoming(Packet::ConnAck(ack)) => Some(BusEvent::Disconnected(format!(
            "connection refused: {:?}",
            ack.code
        ))),
        Event::Incoming(Packet::Publish(publish)) => Some(BusEvent::Message {
            topic: publish.topic.clone(),
            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
        }),
        _ => None,
    }
}

pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client and start pumping its event loop.
    pub fn connect(
        config: &BridgeConfig,
        bus_tx: mpsc::UnboundedSender<BusEvent>,
    ) -> (Self, JoinHandle<()>) {
        info!(
            "Connecting to MQTT broker {}:{} as {}",
            config.mqtt.host,
            config.mqtt.port,
            config.mqtt.broker_client_id()
        );
        let (client, eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
        let pump = tokio::spawn(run_event_loop(eventloop, bus_tx));
        (Self { client }, pump)
    }

    /// Send a clean DISCONNECT; the event loop task ends once it is written.
    pub async fn disconnect(&self) -> BusResult<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}

async fn run_event_loop(mut eventloop: EventLoop, bus_tx: mpsc::UnboundedSender<BusEvent>) {
    let mut backoff = bus_backoff();

    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("Disconnected from MQTT broker");
                break;
            }
            Ok(event) => {
                let Some(bus_event) = translate(&event) else {
                    continue;
                };
                if matches!(bus_event, BusEvent::Connected) {
                    backoff = bus_backoff();
                }
                if let Err(e) = bus_tx.send(bus_event) {
                    debug!("Bus event channel closed: {}", e);
                }
            }
            Err(e) => {
                if let Err(e) = bus_tx.send(BusEvent::Disconnected(e.to_string())) {
                    debug!("Bus event channel closed: {}", e);
                }
                let delay = backoff.next().unwrap_or(MAX_RETRY_DELAY);
                warn!("MQTT error: {}. Retrying in {:.1}s...", e, delay.as_secs_f64());
                sleep(delay).await;
            }
        }
    }
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> BusResult<()> {
        self.client.try_publish(topic, qos, retain, payload)?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> BusResult<()> {
        self.client.try_subscribe(topic, qos)?;
        Ok(())
    }
}
