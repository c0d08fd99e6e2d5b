use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use log::{info, trace, warn};
use midir::{MidiInput, MidiInputConnection, MidiInputPort};

use super::MidiMapping;
use crate::messaging::SynthMessage;

const CLIENT_NAME: &str = "chipsynth MIDI input";

/// Handles MIDI input from a connected device
pub struct MidiInputHandler {
    connection: Option<MidiInputConnection<()>>,
    port_name: Option<String>,
    message_sender: Sender<SynthMessage>,
}

impl MidiInputHandler {
    pub fn new(message_sender: Sender<SynthMessage>) -> Self {
        Self {
            connection: None,
            port_name: None,
            message_sender,
        }
    }

    /// Names of all available input ports
    pub fn list_ports() -> Result<Vec<String>> {
        let midi_in = MidiInput::new(CLIENT_NAME)
            .map_err(|err| anyhow!("Failed to create MIDI input: {}", err))?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect())
    }

    /// Connect to `port_name`, or to the first port when none is given.
    /// Returns the connected port name, or `None` when there are no ports.
    pub fn connect(&mut self, port_name: Option<&str>, mapping: MidiMapping) -> Result<Option<String>> {
        self.disconnect();

        let midi_in = MidiInput::new(CLIENT_NAME)
            .map_err(|err| anyhow!("Failed to create MIDI input: {}", err))?;
        let ports = midi_in.ports();
        let port: Option<MidiInputPort> = match port_name {
            Some(name) => {
                let found = ports
                    .into_iter()
                    .find(|port| midi_in.port_name(port).map(|n| n == name).unwrap_or(false));
                Some(found.ok_or_else(|| anyhow!("MIDI port '{}' not found", name))?)
            }
            None => ports.into_iter().next(),
        };
        let Some(port) = port else {
            warn!("No MIDI input ports available");
            return Ok(None);
        };
        let name = midi_in
            .port_name(&port)
            .unwrap_or_else(|_| "<unnamed>".to_string());

        let sender = self.message_sender.clone();
        let mut mapping = mapping;
        let connection = midi_in
            .connect(
                &port,
                "chipsynth-read-input",
                move |_stamp, message, _| {
                    if let Some(msg) = mapping.translate(message) {
                        trace!("MIDI {:02X?} -> {:?}", message, msg);
                        // The engine may already be gone during shutdown
                        sender.send(msg).ok();
                    }
                },
                (),
            )
            .map_err(|err| anyhow!("Failed to connect to MIDI port '{}': {}", name, err))?;

        info!("Connected to MIDI input '{}'", name);
        self.connection = Some(connection);
        self.port_name = Some(name.clone());
        Ok(Some(name))
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            self.port_name = None;
        }
    }
}

impl Drop for MidiInputHandler {
    fn drop(&mut self) {
        self.disconnect();
    }
}
