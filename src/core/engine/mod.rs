mod resample;

pub use self::resample::{min_frequency, resample, ResampleCache, MAX_CYCLE_LENGTH};

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::core::config::Tuning;
use crate::core::instrument::InstrumentBank;
use crate::core::mixer::Frame;
use crate::core::voice::Voice;
use crate::messaging::KeyId;
use crate::utils::helpers::format_frequency;

/// Owns every sounding voice and renders one frame per voice per tick
#[derive(Debug)]
pub struct VoiceEngine {
    sample_rate: u32,
    tick_length: usize,
    bank: InstrumentBank,
    tuning: Tuning,
    octave: u8,
    instrument: usize,
    voices: BTreeMap<KeyId, Voice>,
    cache: ResampleCache,
}

impl VoiceEngine {
    pub fn new(
        sample_rate: u32,
        tick_length: usize,
        bank: InstrumentBank,
        tuning: Tuning,
        octave: u8,
        instrument: usize,
    ) -> Self {
        Self {
            sample_rate,
            tick_length,
            bank,
            tuning,
            octave,
            instrument,
            voices: BTreeMap::new(),
            cache: ResampleCache::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn tick_length(&self) -> usize {
        self.tick_length
    }

    pub fn current_octave(&self) -> u8 {
        self.octave
    }

    pub fn current_instrument(&self) -> usize {
        self.instrument
    }

    pub fn bank(&self) -> &InstrumentBank {
        &self.bank
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn voice(&self, key: KeyId) -> Option<&Voice> {
        self.voices.get(&key)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Start a voice for `key`. Keys without a playable waveform stay silent.
    pub fn press(&mut self, key: KeyId) {
        let source = if self.bank.is_percussion(key) {
            self.bank.percussion_source(key)
        } else if let Some(index) = self.tuning.key_index(key) {
            let pitch = self.tuning.frequency(index, self.octave);
            self.bank.tone_source(self.instrument, index, pitch)
        } else {
            None
        };

        let Some(source) = source else {
            debug!("{} has nothing to play", key);
            return;
        };
        if !(source.frequency > 0.0 && source.frequency.is_finite()) {
            debug!("{} has no usable frequency ({})", key, source.frequency);
            return;
        }
        if ResampleCache::cycle_length(self.sample_rate, source.frequency) > MAX_CYCLE_LENGTH {
            debug!(
                "{} is below the lowest playable frequency ({})",
                key,
                format_frequency(source.frequency)
            );
            return;
        }

        debug!(
            "{} on: {} at {}",
            key,
            source.waveform.name,
            format_frequency(source.frequency)
        );
        // A repeated press restarts the key
        self.voices.insert(key, Voice::new(key, source));
    }

    /// Release `key`. One-shot percussion hits ignore releases and play
    /// through on their own.
    pub fn release(&mut self, key: KeyId) {
        let percussion = self.bank.is_percussion(key);
        if let Some(voice) = self.voices.get_mut(&key) {
            if percussion && voice.is_one_shot() {
                return;
            }
            voice.release();
        }
    }

    pub fn select_octave(&mut self, octave: u8) {
        debug!("Octave set to {}", octave);
        self.octave = octave;
    }

    pub fn select_instrument(&mut self, index: usize) {
        match self.bank.instrument(index) {
            Some(instrument) => {
                debug!("Instrument set to {} ({})", index, instrument.name);
                self.instrument = index;
            }
            None => warn!(
                "Ignoring instrument {}: only {} defined",
                index,
                self.bank.instrument_count()
            ),
        }
    }

    /// Render every active voice for one tick, in key order.
    /// Voices that finished are dropped afterwards.
    pub fn process_tick(&mut self) -> Vec<(KeyId, Frame)> {
        let mut frames = Vec::with_capacity(self.voices.len());
        for (key, voice) in self.voices.iter_mut() {
            if let Some(frame) = voice.render(&mut self.cache, self.sample_rate, self.tick_length) {
                frames.push((*key, frame));
            }
        }
        self.voices.retain(|key, voice| {
            if !voice.is_active() {
                debug!("{} finished", key);
            }
            voice.is_active()
        });
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SynthConfig;
    use crate::core::voice::VoiceStatus;

    fn engine() -> VoiceEngine {
        SynthConfig::default().build_engine().unwrap()
    }

    #[test]
    fn press_creates_one_voice_per_key() {
        let mut engine = engine();
        engine.press(KeyId(60));
        engine.press(KeyId(60));
        engine.press(KeyId(64));
        assert_eq!(engine.active_voices(), 2);
    }

    #[test]
    fn unmapped_key_is_inert() {
        let mut engine = engine();
        engine.press(KeyId(127));
        assert_eq!(engine.active_voices(), 0);
        assert!(engine.process_tick().is_empty());
    }

    #[test]
    fn middle_c_at_default_octave() {
        let mut engine = engine();
        engine.press(KeyId(60));
        let voice = engine.voice(KeyId(60)).unwrap();
        assert!((voice.frequency - 261.63).abs() < 1e-9);

        engine.select_octave(5);
        engine.press(KeyId(62));
        let voice = engine.voice(KeyId(62)).unwrap();
        assert!((voice.frequency - 2.0 * 261.63 * 2f64.powf(2.0 / 12.0)).abs() < 1e-9);
        // The earlier voice keeps its pitch
        assert!((engine.voice(KeyId(60)).unwrap().frequency - 261.63).abs() < 1e-9);
    }

    #[test]
    fn instrument_change_applies_to_next_press() {
        let mut engine = engine();
        engine.press(KeyId(60));
        engine.select_instrument(4);
        engine.press(KeyId(62));
        assert_eq!(engine.voice(KeyId(60)).unwrap().waveform_name(), "square50");
        assert_eq!(engine.voice(KeyId(62)).unwrap().waveform_name(), "sawtooth");
    }

    #[test]
    fn unknown_instrument_is_ignored() {
        let mut engine = engine();
        engine.select_instrument(99);
        assert_eq!(engine.current_instrument(), 2);
    }

    #[test]
    fn frames_have_tick_length() {
        let mut engine = engine();
        engine.press(KeyId(60));
        engine.press(KeyId(36));
        let frames = engine.process_tick();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, KeyId(36));
        assert!(frames.iter().all(|(_, frame)| frame.len() == 735));
    }

    #[test]
    fn released_voice_is_removed_after_release_ticks() {
        let mut engine = engine();
        engine.press(KeyId(60));
        engine.release(KeyId(60));
        assert_eq!(engine.voice(KeyId(60)).unwrap().status(), VoiceStatus::Released);

        // Default release is 5 ticks
        for _ in 0..5 {
            assert_eq!(engine.process_tick().len(), 1);
        }
        assert!(engine.process_tick().is_empty());
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn percussion_tap_plays_through() {
        let mut engine = engine();
        engine.press(KeyId(36));
        engine.release(KeyId(36));
        assert_eq!(engine.voice(KeyId(36)).unwrap().status(), VoiceStatus::Pressed);
        let frames = engine.process_tick();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1.peak(), 8192);
    }

    #[test]
    fn percussion_hit_lasts_its_cycle() {
        // 44100 / 4 Hz = 11025 samples, 15 ticks of 735
        let mut engine = engine();
        engine.press(KeyId(38));
        engine.process_tick();
        engine.release(KeyId(38));
        let mut ticks = 1;
        while !engine.process_tick().is_empty() {
            ticks += 1;
        }
        assert_eq!(ticks, 15);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn looping_percussion_still_releases() {
        let mut config = SynthConfig::default();
        config.percussion[0].play_once = false;
        let mut engine = config.build_engine().unwrap();
        engine.press(KeyId(36));
        engine.release(KeyId(36));
        assert_eq!(engine.voice(KeyId(36)).unwrap().status(), VoiceStatus::Released);
    }

    #[test]
    fn subsonic_frequency_is_inert() {
        let mut engine = engine();
        engine.select_octave(0);
        // Lowest tone key at octave 0 is about 12 Hz and still plays
        engine.press(KeyId(55));
        assert_eq!(engine.active_voices(), 1);

        let mut config = SynthConfig::default();
        config.tuning.reference_frequency = 1e-6;
        let mut engine = config.build_engine().unwrap();
        engine.press(KeyId(60));
        assert_eq!(engine.active_voices(), 0);
        assert!(engine.process_tick().is_empty());
    }

    #[test]
    fn release_of_unknown_key_is_ignored() {
        let mut engine = engine();
        engine.release(KeyId(60));
        assert_eq!(engine.active_voices(), 0);
    }
}
