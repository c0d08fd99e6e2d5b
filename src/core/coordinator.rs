//! Drives the engine at the tick rate and hands frames to the output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Sender};
use log::{debug, info, trace};

use crate::core::audio::FrameSink;
use crate::core::clock::Clock;
use crate::core::config::SynthConfig;
use crate::core::engine::VoiceEngine;
use crate::core::mixer::{Frame, Mixer};
use crate::messaging::{MessageBus, SynthMessage, MAX_MESSAGES_PER_TICK};
use crate::utils::helpers::{format_time, sample_to_dbfs};

/// Frames buffered between generation and output
pub const FRAME_QUEUE_DEPTH: usize = 2;

pub struct Coordinator {
    engine: VoiceEngine,
    bus: MessageBus,
    mixer: Mixer,
    tick_rate: u32,
    ticks: u64,
}

impl Coordinator {
    pub fn new(engine: VoiceEngine, bus: MessageBus, tick_rate: u32) -> Self {
        let mixer = Mixer::new(engine.tick_length());
        Self {
            engine,
            bus,
            mixer,
            tick_rate,
            ticks: 0,
        }
    }

    pub fn from_config(config: &SynthConfig) -> Result<Self> {
        let engine = config.build_engine()?;
        Ok(Self::new(engine, MessageBus::new(), config.tick_rate))
    }

    /// Sender for input collaborators (MIDI, tests, embedding code)
    pub fn sender(&self) -> Sender<SynthMessage> {
        self.bus.sender()
    }

    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick: apply queued events, render every voice, mix.
    pub fn tick(&mut self) -> Frame {
        let applied = self.bus.process_messages(&mut self.engine, MAX_MESSAGES_PER_TICK);
        let frames = self.engine.process_tick();
        let frame = self.mixer.mix(frames.iter().map(|(_, frame)| frame));
        trace!(
            "tick {}: {} event(s), {} voice(s), rms {:.1}, peak {:.1} dBFS",
            self.ticks,
            applied,
            frames.len(),
            frame.rms(),
            sample_to_dbfs(frame.peak())
        );
        self.ticks += 1;
        frame
    }

    /// Generate frames on a background thread and render them through `sink`
    /// on the calling thread until `running` is cleared or the sink fails.
    pub fn run<S: FrameSink>(self, sink: &mut S, running: Arc<AtomicBool>) -> Result<()> {
        let (frame_tx, frame_rx) = bounded::<Frame>(FRAME_QUEUE_DEPTH);
        let generator_running = Arc::clone(&running);
        let mut coordinator = self;

        info!(
            "Starting generation at {} ticks/s, {} samples per tick",
            coordinator.tick_rate,
            coordinator.engine.tick_length()
        );
        let generator = thread::Builder::new()
            .name("synth-generate".to_string())
            .spawn(move || {
                let mut clock = Clock::new(coordinator.tick_rate);
                debug!("Tick period {}", format_time(clock.period()));
                let mut overruns = 0u64;
                while generator_running.load(Ordering::SeqCst) {
                    let frame = coordinator.tick();
                    // Blocks while the output is two frames behind
                    if frame_tx.send(frame).is_err() {
                        break;
                    }
                    if clock.wait() {
                        overruns += 1;
                        debug!("tick {} overran its slot", coordinator.ticks);
                    }
                }
                debug!(
                    "Generation stopped after {} ticks ({} overruns)",
                    coordinator.ticks, overruns
                );
            })
            .context("Failed to spawn generation thread")?;

        let mut outcome = Ok(());
        while let Ok(frame) = frame_rx.recv() {
            if let Err(err) = sink.render(frame) {
                running.store(false, Ordering::SeqCst);
                outcome = Err(err.context("Output sink failed"));
                break;
            }
            if !running.load(Ordering::SeqCst) {
                break;
            }
        }
        // Unblocks a generator waiting on a full queue
        drop(frame_rx);

        generator
            .join()
            .map_err(|_| anyhow!("Generation thread panicked"))?;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::CollectingSink;
    use crate::messaging::KeyId;

    struct FailingSink {
        accepted: usize,
    }

    impl FrameSink for FailingSink {
        fn render(&mut self, _frame: Frame) -> Result<()> {
            if self.accepted == 3 {
                return Err(anyhow!("device gone"));
            }
            self.accepted += 1;
            Ok(())
        }
    }

    fn coordinator() -> Coordinator {
        let mut config = SynthConfig::default();
        config.tick_rate = 1000;
        config.sample_rate = 8000;
        Coordinator::from_config(&config).unwrap()
    }

    #[test]
    fn idle_tick_is_silent() {
        let mut coordinator = coordinator();
        let frame = coordinator.tick();
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.peak(), 0);
        assert_eq!(coordinator.ticks(), 1);
    }

    #[test]
    fn events_apply_before_render() {
        let mut coordinator = coordinator();
        coordinator.sender().send(SynthMessage::KeyPressed(KeyId(60))).unwrap();
        let frame = coordinator.tick();
        assert!(frame.peak() > 0);
        assert_eq!(coordinator.engine().active_voices(), 1);
    }

    #[test]
    fn run_stops_when_flag_clears() {
        let coordinator = coordinator();
        let running = Arc::new(AtomicBool::new(true));
        let mut sink = CollectingSink::stop_after(5, Arc::clone(&running));
        coordinator.run(&mut sink, running).unwrap();
        assert_eq!(sink.frames.len(), 5);
        assert!(sink.frames.iter().all(|f| f.len() == 8));
    }

    #[test]
    fn sink_error_stops_generation() {
        let coordinator = coordinator();
        let running = Arc::new(AtomicBool::new(true));
        let mut sink = FailingSink { accepted: 0 };
        let err = coordinator.run(&mut sink, Arc::clone(&running)).unwrap_err();
        assert!(format!("{:#}", err).contains("device gone"));
        assert_eq!(sink.accepted, 3);
        assert!(!running.load(Ordering::SeqCst));
    }
}
