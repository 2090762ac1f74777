//! mqtt_tx.rs — MQTT transmitter for amplitude readings
//!
//! Publishes one JSON [`AmplitudeReading`] per microphone per epoch to the
//! amplitudes topic — the message a real listener node would emit after
//! its ADC/FSK chain. Publish errors are logged but never crash the sim;
//! the event loop task keeps polling so rumqttc can reconnect on its own.

use std::time::Duration;

use rumqttc::{AsyncClient, MqttOptions, QoS};
use tracing::{debug, warn};

use echogrid_core::AmplitudeReading;

pub struct MqttTransmitter {
    client: AsyncClient,
    topic: String,
}

impl MqttTransmitter {
    /// Connect to the broker and spawn the driving event-loop task.
    pub fn new(host: &str, port: u16, topic: &str, client_id: &str) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(options, 32);

        tokio::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    warn!("MQTT: connection error: {e} — retrying in 2s");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        });

        Self { client, topic: topic.to_string() }
    }

    /// Publish all readings from one epoch.
    pub async fn send_epoch(&self, readings: &[AmplitudeReading]) {
        for reading in readings {
            let payload = match serde_json::to_vec(reading) {
                Ok(b) => b,
                Err(e) => {
                    warn!("MQTT: serialize failed: {e}");
                    continue;
                }
            };
            match self
                .client
                .publish(&self.topic, QoS::AtLeastOnce, false, payload)
                .await
            {
                Ok(()) => debug!(
                    "MQTT → {} epoch={} mic={} bits={}",
                    self.topic, reading.epoch_s, reading.mic_id, reading.amplitude_bits
                ),
                Err(e) => warn!("MQTT: publish failed: {e}"),
            }
        }
    }
}
