use std::collections::HashMap;
use std::sync::Arc;

use crate::core::envelope::Envelope;
use crate::core::waveform::{Waveform, WaveformId, WaveformLibrary};
use crate::messaging::KeyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Loop,
    /// Play the resampled table once, then finish
    OneShot,
}

impl PlaybackMode {
    pub fn from_play_once(play_once: bool) -> Self {
        if play_once {
            PlaybackMode::OneShot
        } else {
            PlaybackMode::Loop
        }
    }
}

/// A fixed-pitch waveform bound to one key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSlot {
    pub waveform: WaveformId,
    pub frequency: f64,
    pub mode: PlaybackMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Voicing {
    /// One waveform played at the pitch of whichever tone key is pressed
    Pitched { waveform: WaveformId, mode: PlaybackMode },
    /// A waveform per tone key index; `None` leaves that key silent
    Keyed { notes: Vec<Option<NoteSlot>> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub voicing: Voicing,
    pub envelope: Envelope,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercussionSlot {
    pub note: NoteSlot,
    pub envelope: Envelope,
}

/// Everything a new voice needs, resolved once when its key is pressed
#[derive(Debug, Clone)]
pub struct VoiceSource {
    pub waveform_id: WaveformId,
    pub waveform: Arc<Waveform>,
    pub frequency: f64,
    pub mode: PlaybackMode,
    pub envelope: Envelope,
}

/// The instruments and percussion table of a loaded configuration
#[derive(Debug, Default)]
pub struct InstrumentBank {
    library: WaveformLibrary,
    instruments: Vec<Instrument>,
    percussion: HashMap<KeyId, PercussionSlot>,
}

impl InstrumentBank {
    pub fn new(
        library: WaveformLibrary,
        instruments: Vec<Instrument>,
        percussion: HashMap<KeyId, PercussionSlot>,
    ) -> Self {
        Self {
            library,
            instruments,
            percussion,
        }
    }

    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_percussion(&self, key: KeyId) -> bool {
        self.percussion.contains_key(&key)
    }

    pub fn percussion_keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.percussion.keys().copied()
    }

    pub fn library(&self) -> &WaveformLibrary {
        &self.library
    }

    /// Resolve a percussion key
    pub fn percussion_source(&self, key: KeyId) -> Option<VoiceSource> {
        let slot = self.percussion.get(&key)?;
        self.source(slot.note, slot.envelope)
    }

    /// Resolve a tone key for `instrument`. `pitch` is the equal-tempered
    /// frequency of the key at the current octave; keyed slots ignore it.
    pub fn tone_source(&self, instrument: usize, key_index: usize, pitch: f64) -> Option<VoiceSource> {
        let instrument = self.instruments.get(instrument)?;
        let note = match &instrument.voicing {
            Voicing::Pitched { waveform, mode } => NoteSlot {
                waveform: *waveform,
                frequency: pitch,
                mode: *mode,
            },
            Voicing::Keyed { notes } => (*notes.get(key_index)?)?,
        };
        self.source(note, instrument.envelope)
    }

    fn source(&self, note: NoteSlot, envelope: Envelope) -> Option<VoiceSource> {
        let waveform = self.library.get(note.waveform)?;
        Some(VoiceSource {
            waveform_id: note.waveform,
            waveform: Arc::clone(waveform),
            frequency: note.frequency,
            mode: note.mode,
            envelope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::waveform::square_wave;

    fn bank() -> InstrumentBank {
        let mut library = WaveformLibrary::new();
        let square = library.insert(Waveform::new("square", square_wave(8192, 64, 0.5))).unwrap();
        let kick = library.insert(Waveform::new("kick", vec![100; 32])).unwrap();
        let kick_slot = NoteSlot {
            waveform: kick,
            frequency: 30.0,
            mode: PlaybackMode::OneShot,
        };
        let instruments = vec![
            Instrument {
                name: "square".into(),
                voicing: Voicing::Pitched {
                    waveform: square,
                    mode: PlaybackMode::Loop,
                },
                envelope: Envelope::default(),
            },
            Instrument {
                name: "kit".into(),
                voicing: Voicing::Keyed {
                    notes: vec![Some(kick_slot), None],
                },
                envelope: Envelope::constant(),
            },
        ];
        let mut percussion = HashMap::new();
        percussion.insert(
            KeyId(36),
            PercussionSlot {
                note: kick_slot,
                envelope: Envelope::constant(),
            },
        );
        InstrumentBank::new(library, instruments, percussion)
    }

    #[test]
    fn pitched_instrument_uses_key_pitch() {
        let source = bank().tone_source(0, 3, 220.0).unwrap();
        assert_eq!(source.frequency, 220.0);
        assert_eq!(source.mode, PlaybackMode::Loop);
        assert_eq!(source.waveform.name, "square");
    }

    #[test]
    fn keyed_instrument_uses_slot_frequency() {
        let bank = bank();
        let source = bank.tone_source(1, 0, 220.0).unwrap();
        assert_eq!(source.frequency, 30.0);
        assert_eq!(source.mode, PlaybackMode::OneShot);
        // Undefined and out of range slots are inert
        assert!(bank.tone_source(1, 1, 220.0).is_none());
        assert!(bank.tone_source(1, 7, 220.0).is_none());
    }

    #[test]
    fn unknown_instrument_resolves_nothing() {
        assert!(bank().tone_source(5, 0, 220.0).is_none());
    }

    #[test]
    fn percussion_lookup() {
        let bank = bank();
        assert!(bank.is_percussion(KeyId(36)));
        let source = bank.percussion_source(KeyId(36)).unwrap();
        assert_eq!(source.waveform.name, "kick");
        assert!(bank.percussion_source(KeyId(37)).is_none());
    }
}
