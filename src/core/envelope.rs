use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::core::voice::VoiceStatus;

/// Linear ADSR envelope measured in ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Volume on the first tick of the attack; unused without an attack
    pub initial: f64,
    pub attack: u32,
    pub decay: u32,
    pub sustain: f64,
    pub release: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            initial: 1.0,
            attack: 0,
            decay: 24,
            sustain: 0.05,
            release: 5,
        }
    }
}

impl Envelope {
    /// Full volume for as long as the voice lives, silent once released
    pub const fn constant() -> Self {
        Self {
            initial: 1.0,
            attack: 0,
            decay: 0,
            sustain: 1.0,
            release: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.initial > 0.0 && self.initial <= 1.0) {
            bail!("initial volume must be inside (0, 1], got {}", self.initial);
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            bail!("sustain volume must be inside [0, 1], got {}", self.sustain);
        }
        Ok(())
    }

    /// Volume for a voice in `status` after `ticks` ticks, `ticks_since_release`
    /// of which were spent released.
    pub fn volume(&self, status: VoiceStatus, ticks: u32, ticks_since_release: u32) -> f64 {
        match status {
            VoiceStatus::Pressed => {
                if ticks < self.attack {
                    self.initial + (1.0 - self.initial) * ticks as f64 / self.attack as f64
                } else if ticks - self.attack < self.decay {
                    let into_decay = (ticks - self.attack) as f64;
                    1.0 - (1.0 - self.sustain) * into_decay / self.decay as f64
                } else {
                    self.sustain
                }
            }
            VoiceStatus::Released => {
                if ticks_since_release < self.release {
                    self.sustain - self.sustain * ticks_since_release as f64 / self.release as f64
                } else {
                    0.0
                }
            }
            VoiceStatus::Finished => 0.0,
        }
    }
}
