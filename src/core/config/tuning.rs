use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::messaging::KeyId;

/// Where the equal-tempered scale is anchored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Frequency of the reference key at the reference octave
    pub reference_frequency: f64,
    /// Position of the reference key in `tone_keys`
    pub reference_key_index: usize,
    pub reference_octave: u8,
    pub default_octave: u8,
}

impl Default for TuningConfig {
    fn default() -> Self {
        // Middle C on the sixth tone key
        Self {
            reference_frequency: 261.63,
            reference_key_index: 5,
            reference_octave: 4,
            default_octave: 4,
        }
    }
}

/// Per-key frequency table, one semitone per tone key
#[derive(Debug, Clone)]
pub struct Tuning {
    indices: HashMap<KeyId, usize>,
    frequencies: Vec<f64>,
    reference_octave: u8,
}

impl Tuning {
    pub fn new(tone_keys: &[KeyId], config: &TuningConfig) -> Self {
        let indices = tone_keys
            .iter()
            .enumerate()
            .map(|(index, key)| (*key, index))
            .collect();
        let frequencies = (0..tone_keys.len())
            .map(|index| {
                let semitones = index as f64 - config.reference_key_index as f64;
                config.reference_frequency * 2f64.powf(semitones / 12.0)
            })
            .collect();
        Self {
            indices,
            frequencies,
            reference_octave: config.reference_octave,
        }
    }

    pub fn key_index(&self, key: KeyId) -> Option<usize> {
        self.indices.get(&key).copied()
    }

    pub fn key_count(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_tone_key(&self, key: KeyId) -> bool {
        self.indices.contains_key(&key)
    }

    /// Frequency of tone key `index` at `octave`; 0.0 for an unknown index
    pub fn frequency(&self, index: usize, octave: u8) -> f64 {
        let Some(base) = self.frequencies.get(index) else {
            return 0.0;
        };
        let shift = octave as i32 - self.reference_octave as i32;
        base * 2f64.powi(shift)
    }
}
