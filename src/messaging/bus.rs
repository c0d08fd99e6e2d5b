use crossbeam_channel::{unbounded, Receiver, SendError, Sender, TryRecvError};

use super::SynthMessage;
use crate::core::engine::VoiceEngine;

/// Upper bound on messages applied in one tick; the rest wait for the next tick
pub const MAX_MESSAGES_PER_TICK: usize = 256;

/// MessageBus carries key and control events from any number of input
/// threads to the voice engine, in arrival order
pub struct MessageBus {
    sender: Sender<SynthMessage>,
    receiver: Receiver<SynthMessage>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        MessageBus { sender, receiver }
    }

    /// Get a sender that can be cloned and handed to input collaborators
    pub fn sender(&self) -> Sender<SynthMessage> {
        self.sender.clone()
    }

    pub fn send(&self, msg: SynthMessage) -> Result<(), SendError<SynthMessage>> {
        self.sender.send(msg)
    }

    pub fn try_receive(&self) -> Result<SynthMessage, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Apply pending messages to the engine, at most `max_messages` of them.
    /// Returns how many were applied.
    pub fn process_messages(&self, engine: &mut VoiceEngine, max_messages: usize) -> usize {
        let mut count = 0;
        while count < max_messages {
            let Ok(msg) = self.receiver.try_recv() else {
                break;
            };
            count += 1;
            Self::handle_message(engine, msg);
        }
        count
    }

    fn handle_message(engine: &mut VoiceEngine, msg: SynthMessage) {
        match msg {
            SynthMessage::KeyPressed(key) => engine.press(key),
            SynthMessage::KeyReleased(key) => engine.release(key),
            SynthMessage::SelectOctave(octave) => engine.select_octave(octave),
            SynthMessage::SelectInstrument(index) => engine.select_instrument(index),
        }
    }
}
