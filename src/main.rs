use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;

use chipsynth::core::audio::CpalSink;
use chipsynth::core::config::SynthConfig;
use chipsynth::core::midi::{MidiInputHandler, MidiMapping};
use chipsynth::core::Coordinator;

/// Tick-driven chiptune synthesizer
#[derive(Parser)]
#[command(name = "chipsynth")]
#[command(about = "Play wavetable instruments from a MIDI keyboard")]
struct Cli {
    /// Configuration file (defaults to chipsynth/config.json in the user config directory)
    config: Option<PathBuf>,

    /// Write the built-in configuration to the config path and exit
    #[arg(long)]
    init: bool,

    /// List audio output devices and MIDI input ports and exit
    #[arg(long)]
    list_devices: bool,

    /// Output device name, overriding the configuration
    #[arg(long)]
    device: Option<String>,

    /// MIDI input port name, overriding the configuration
    #[arg(long)]
    midi_port: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    println!("[MAIN] Starting chipsynth");

    if cli.list_devices {
        return list_devices();
    }

    if cli.init {
        let path = match cli.config {
            Some(path) => path,
            None => SynthConfig::default_path()?,
        };
        SynthConfig::default().save_to_file(&path)?;
        println!("[MAIN] Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => SynthConfig::load_from_file(path)?,
        None => SynthConfig::load_or_default()?,
    };
    if let Some(device) = cli.device {
        config.output_device = Some(device);
    }
    if let Some(port) = cli.midi_port {
        config.midi.port = Some(port);
    }

    let coordinator = Coordinator::from_config(&config).context("Failed to build the synthesizer")?;
    let mut sink = CpalSink::open(config.sample_rate, config.output_device.as_deref())
        .context("Failed to open audio output")?;

    let mut midi = MidiInputHandler::new(coordinator.sender());
    match midi.connect(config.midi.port.as_deref(), MidiMapping::from_config(&config)) {
        Ok(Some(port)) => println!("[MAIN] Listening on MIDI port {}", port),
        Ok(None) => println!("[MAIN] No MIDI input, running silent"),
        Err(err) => warn!("MIDI input unavailable: {:#}", err),
    }

    println!("[MAIN] Running, press Ctrl+C to quit");
    let running = Arc::new(AtomicBool::new(true));
    coordinator.run(&mut sink, running)
}

fn list_devices() -> Result<()> {
    println!("Audio outputs:");
    for name in CpalSink::list_devices()? {
        println!("  {}", name);
    }
    println!("MIDI inputs:");
    match MidiInputHandler::list_ports() {
        Ok(ports) if ports.is_empty() => println!("  (none)"),
        Ok(ports) => ports.iter().for_each(|name| println!("  {}", name)),
        Err(err) => warn!("Could not list MIDI ports: {:#}", err),
    }
    Ok(())
}
