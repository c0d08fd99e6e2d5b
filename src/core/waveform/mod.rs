mod dpcm;
mod noise;

pub use self::dpcm::{decode_dpcm, load_dpcm, DPCM_LEVEL_MAX, DPCM_LEVEL_MIN};
pub use self::noise::{noise_wave, NoiseMode};

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Index of a waveform inside a [`WaveformLibrary`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaveformId(usize);

/// An immutable cycle of 16-bit samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub name: String,
    samples: Vec<i16>,
}

impl Waveform {
    pub fn new(name: impl Into<String>, samples: Vec<i16>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Synthetic waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Square { duty_cycle: f64 },
    Triangle,
    Sawtooth,
    Sine,
    Noise {
        #[serde(default)]
        mode: NoiseMode,
    },
}

impl Shape {
    /// Check the shape against the table it will be built into
    pub fn validate(&self, amplitude: i16, length: usize) -> Result<()> {
        if amplitude <= 0 {
            bail!("amplitude must be between 1 and 32767, got {}", amplitude);
        }
        let min_length = match self {
            Shape::Square { duty_cycle } => {
                if !(*duty_cycle > 0.0 && *duty_cycle < 1.0) {
                    bail!("duty cycle must be inside (0, 1), got {}", duty_cycle);
                }
                1
            }
            Shape::Triangle => 4,
            Shape::Sawtooth | Shape::Sine => 2,
            // The register decides the period
            Shape::Noise { .. } => 0,
        };
        if length < min_length {
            bail!("{:?} needs a table of at least {} samples, got {}", self, min_length, length);
        }
        Ok(())
    }

    /// Build the sample table for this shape
    pub fn build(&self, amplitude: i16, length: usize) -> Vec<i16> {
        match self {
            Shape::Square { duty_cycle } => square_wave(amplitude, length, *duty_cycle),
            Shape::Triangle => triangle_wave(amplitude, length),
            Shape::Sawtooth => sawtooth_wave(amplitude, length),
            Shape::Sine => sine_wave(amplitude, length),
            Shape::Noise { mode } => noise_wave(amplitude, *mode),
        }
    }
}

pub fn square_wave(amplitude: i16, length: usize, duty_cycle: f64) -> Vec<i16> {
    let high = length as f64 * duty_cycle;
    (0..length)
        .map(|i| if (i as f64) < high { amplitude } else { -amplitude })
        .collect()
}

pub fn triangle_wave(amplitude: i16, length: usize) -> Vec<i16> {
    let amplitude = amplitude as i64;
    let len = length as i64;
    let quarter = (len / 4).max(1);
    (0..len)
        .map(|i| {
            // Floor division keeps the falling edges symmetric
            let value = if 4 * i < len {
                (amplitude * i).div_euclid(quarter)
            } else if 4 * i < 3 * len {
                (amplitude * (len / 2 - i)).div_euclid(quarter)
            } else {
                (amplitude * (i - len)).div_euclid(quarter)
            };
            // Lengths that are not a multiple of 4 overshoot at the corners
            value.clamp(-amplitude, amplitude) as i16
        })
        .collect()
}

pub fn sawtooth_wave(amplitude: i16, length: usize) -> Vec<i16> {
    let amplitude = amplitude as i64;
    let half = (length as i64 / 2).max(1);
    (0..length as i64)
        .map(|i| (amplitude * (half - i)).div_euclid(half) as i16)
        .collect()
}

pub fn sine_wave(amplitude: i16, length: usize) -> Vec<i16> {
    let half = (length / 2).max(1) as f64;
    (0..length)
        .map(|i| (amplitude as f64 * (i as f64 * PI / half).sin()) as i16)
        .collect()
}

/// All waveform tables, built once and shared by every voice that plays them
#[derive(Debug, Default)]
pub struct WaveformLibrary {
    waveforms: Vec<Arc<Waveform>>,
    by_name: HashMap<String, WaveformId>,
}

impl WaveformLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, rejecting empty tables and duplicate names
    pub fn insert(&mut self, waveform: Waveform) -> Result<WaveformId> {
        if waveform.is_empty() {
            bail!("waveform '{}' has no samples", waveform.name);
        }
        if self.by_name.contains_key(&waveform.name) {
            bail!("waveform '{}' is defined twice", waveform.name);
        }
        let id = WaveformId(self.waveforms.len());
        self.by_name.insert(waveform.name.clone(), id);
        self.waveforms.push(Arc::new(waveform));
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<WaveformId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: WaveformId) -> Option<&Arc<Waveform>> {
        self.waveforms.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.waveforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }
}
