use std::collections::HashMap;
use std::sync::Arc;

use crate::core::waveform::{Waveform, WaveformId};

/// Longest resampled cycle a voice may play, about 24 s at 44.1 kHz
pub const MAX_CYCLE_LENGTH: usize = 1 << 20;

/// Lowest frequency whose cycle still fits in [`MAX_CYCLE_LENGTH`]
pub fn min_frequency(sample_rate: u32) -> f64 {
    sample_rate as f64 / MAX_CYCLE_LENGTH as f64
}

/// Resampled cycles, keyed by source table and cycle length.
///
/// Two frequencies with the same rounded cycle length select the same
/// indices, so they share an entry.
#[derive(Debug, Default)]
pub struct ResampleCache {
    cycles: HashMap<(WaveformId, usize), Arc<[i16]>>,
}

impl ResampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples per cycle at `frequency`, never less than one
    pub fn cycle_length(sample_rate: u32, frequency: f64) -> usize {
        let length = (sample_rate as f64 / frequency).round();
        if length >= 1.0 {
            length as usize
        } else {
            1
        }
    }

    /// `waveform` stretched or squeezed to `cycle_length` samples
    pub fn cycle(&mut self, id: WaveformId, waveform: &Waveform, cycle_length: usize) -> Arc<[i16]> {
        let entry = self
            .cycles
            .entry((id, cycle_length))
            .or_insert_with(|| resample(waveform.samples(), cycle_length).into());
        Arc::clone(entry)
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Nearest-lower index selection: output sample `i` takes source index
/// `floor(i * source_len / cycle_length)`.
pub fn resample(source: &[i16], cycle_length: usize) -> Vec<i16> {
    let source_len = source.len();
    if source_len == 0 {
        return vec![0; cycle_length];
    }
    (0..cycle_length)
        .map(|i| source[i * source_len / cycle_length])
        .collect()
}
