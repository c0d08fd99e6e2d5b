use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a physical key. The MIDI adapter uses the note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(pub u8);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {}", self.0)
    }
}

/// Message types sent from input collaborators to the voice engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthMessage {
    KeyPressed(KeyId),
    KeyReleased(KeyId),
    SelectOctave(u8),
    SelectInstrument(usize),
}
