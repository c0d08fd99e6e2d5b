//! MIDI input: translates note, program and controller messages into synth
//! events on the message bus.

mod input;
mod mapping;

pub use self::input::MidiInputHandler;
pub use self::mapping::{KeyFilter, MidiMapping, MAX_OCTAVE, MIN_OCTAVE};

use crate::core::config::SynthConfig;

impl MidiMapping {
    /// Mapping for the configured controller and playable keys
    pub fn from_config(config: &SynthConfig) -> Self {
        MidiMapping::new(
            config.midi.octave_controller,
            KeyFilter::new(config.playable_keys()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{KeyId, SynthMessage};

    #[test]
    fn default_mapping_covers_percussion() {
        let mut mapping = MidiMapping::from_config(&SynthConfig::default());
        assert_eq!(mapping.translate(&[0x99, 36, 127]), Some(SynthMessage::KeyPressed(KeyId(36))));
        assert_eq!(mapping.translate(&[0x90, 72, 127]), Some(SynthMessage::KeyPressed(KeyId(72))));
        assert_eq!(mapping.translate(&[0x90, 73, 127]), None);
        assert_eq!(mapping.translate(&[0xB0, 20, 3]), Some(SynthMessage::SelectOctave(3)));
    }
}
