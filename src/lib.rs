//! Tick-driven polyphonic chiptune synthesizer: wavetable voices with ADSR
//! envelopes, mixed to 16-bit mono and played through cpal.

pub mod core;
pub mod messaging;
pub mod utils;
