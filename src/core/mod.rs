pub mod audio;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod envelope;
pub mod instrument;
pub mod midi;
pub mod mixer;
pub mod voice;
pub mod waveform;

pub use coordinator::Coordinator;
pub use engine::VoiceEngine;
