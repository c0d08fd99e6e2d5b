use std::collections::HashSet;

use log::debug;

use crate::messaging::{KeyId, SynthMessage};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;

pub const MIN_OCTAVE: u8 = 1;
pub const MAX_OCTAVE: u8 = 9;

/// Forwards presses only for playable keys that are not already held, and
/// releases only for held keys
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    playable: HashSet<KeyId>,
    held: HashSet<KeyId>,
}

impl KeyFilter {
    pub fn new(playable: impl IntoIterator<Item = KeyId>) -> Self {
        Self {
            playable: playable.into_iter().collect(),
            held: HashSet::new(),
        }
    }

    pub fn press(&mut self, key: KeyId) -> Option<SynthMessage> {
        if !self.playable.contains(&key) {
            debug!("Ignoring press of unmapped {}", key);
            return None;
        }
        self.held.insert(key).then_some(SynthMessage::KeyPressed(key))
    }

    pub fn release(&mut self, key: KeyId) -> Option<SynthMessage> {
        self.held.remove(&key).then_some(SynthMessage::KeyReleased(key))
    }

    pub fn is_held(&self, key: KeyId) -> bool {
        self.held.contains(&key)
    }
}

/// Translates raw MIDI messages into synth events. Channels are ignored.
#[derive(Debug, Clone)]
pub struct MidiMapping {
    octave_controller: u8,
    filter: KeyFilter,
}

impl MidiMapping {
    pub fn new(octave_controller: u8, filter: KeyFilter) -> Self {
        Self {
            octave_controller,
            filter,
        }
    }

    pub fn translate(&mut self, message: &[u8]) -> Option<SynthMessage> {
        let (&status, data) = message.split_first()?;
        match (status & 0xF0, data) {
            (NOTE_ON, &[note, velocity, ..]) if velocity > 0 => self.filter.press(KeyId(note)),
            // Note on with zero velocity is a note off
            (NOTE_ON, &[note, _, ..]) | (NOTE_OFF, &[note, _, ..]) => self.filter.release(KeyId(note)),
            (PROGRAM_CHANGE, &[program, ..]) => Some(SynthMessage::SelectInstrument(program as usize)),
            (CONTROL_CHANGE, &[controller, value, ..]) if controller == self.octave_controller => {
                Some(SynthMessage::SelectOctave(value.clamp(MIN_OCTAVE, MAX_OCTAVE)))
            }
            _ => None,
        }
    }
}
