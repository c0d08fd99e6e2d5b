use std::sync::Arc;

use crate::core::engine::ResampleCache;
use crate::core::envelope::Envelope;
use crate::core::instrument::{PlaybackMode, VoiceSource};
use crate::core::mixer::Frame;
use crate::core::waveform::{Waveform, WaveformId};
use crate::messaging::KeyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoiceStatus {
    Pressed,
    Released,
    Finished,
}

/// Live playback state of one sounding key
#[derive(Debug, Clone)]
pub struct Voice {
    pub key: KeyId,
    pub frequency: f64,
    waveform_id: WaveformId,
    waveform: Arc<Waveform>,
    mode: PlaybackMode,
    envelope: Envelope,
    status: VoiceStatus,
    ticks: u32,
    ticks_since_release: u32,
    phase: f64,
}

impl Voice {
    pub fn new(key: KeyId, source: VoiceSource) -> Self {
        Self {
            key,
            frequency: source.frequency,
            waveform_id: source.waveform_id,
            waveform: source.waveform,
            mode: source.mode,
            envelope: source.envelope,
            status: VoiceStatus::Pressed,
            ticks: 0,
            ticks_since_release: 0,
            phase: 0.0,
        }
    }

    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status != VoiceStatus::Finished
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn is_one_shot(&self) -> bool {
        self.mode == PlaybackMode::OneShot
    }

    pub fn waveform_name(&self) -> &str {
        &self.waveform.name
    }

    pub fn release(&mut self) {
        if self.status == VoiceStatus::Pressed {
            self.status = VoiceStatus::Released;
            self.ticks_since_release = 0;
        }
    }

    /// Envelope volume for the coming tick
    pub fn volume(&self) -> f64 {
        self.envelope
            .volume(self.status, self.ticks, self.ticks_since_release)
    }

    /// Produce this voice's frame for one tick and advance its state.
    ///
    /// Returns `None` once the voice has nothing more to play.
    pub fn render(&mut self, cache: &mut ResampleCache, sample_rate: u32, tick_length: usize) -> Option<Frame> {
        if self.status == VoiceStatus::Finished {
            return None;
        }
        let volume = self.volume();
        if self.status == VoiceStatus::Released && volume <= 0.0 {
            self.status = VoiceStatus::Finished;
            return None;
        }

        let cycle_length = ResampleCache::cycle_length(sample_rate, self.frequency);
        let cycle = cache.cycle(self.waveform_id, &self.waveform, cycle_length);
        let offset = (self.phase * cycle_length as f64).round() as usize % cycle_length;

        let mut samples = Vec::with_capacity(tick_length);
        for index in offset..offset + tick_length {
            let sample = match self.mode {
                PlaybackMode::Loop => cycle[index % cycle_length],
                PlaybackMode::OneShot => cycle.get(index).copied().unwrap_or(0),
            };
            // `as` saturates at the i16 bounds
            samples.push((sample as f64 * volume) as i16);
        }

        // A one-shot is done once this tick reached the end of its cycle
        if self.mode == PlaybackMode::OneShot && offset + tick_length >= cycle_length {
            self.status = VoiceStatus::Finished;
        }

        self.phase = ((offset + tick_length) % cycle_length) as f64 / cycle_length as f64;
        self.ticks += 1;
        if self.status == VoiceStatus::Released {
            self.ticks_since_release += 1;
        }
        Some(Frame::from(samples))
    }
}
