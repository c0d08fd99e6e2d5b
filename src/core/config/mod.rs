mod tuning;

pub use self::tuning::{Tuning, TuningConfig};

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::engine::{min_frequency, VoiceEngine};
use crate::core::envelope::Envelope;
use crate::core::instrument::{Instrument, InstrumentBank, NoteSlot, PercussionSlot, PlaybackMode, Voicing};
use crate::core::waveform::{load_dpcm, NoiseMode, Shape, Waveform, WaveformId, WaveformLibrary};
use crate::messaging::KeyId;

const DEFAULT_AMPLITUDE: i16 = 8192;
const DEFAULT_TABLE_LENGTH: usize = 64;

fn default_amplitude() -> i16 {
    DEFAULT_AMPLITUDE
}

fn default_table_length() -> usize {
    DEFAULT_TABLE_LENGTH
}

/// How a named waveform table is produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WaveformSource {
    Builtin {
        shape: Shape,
        #[serde(default = "default_amplitude")]
        amplitude: i16,
        #[serde(default = "default_table_length")]
        length: usize,
    },
    /// Delta sample file, relative to the configuration file
    Dpcm { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteConfig {
    pub waveform: String,
    pub frequency: f64,
    #[serde(default)]
    pub play_once: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "voicing", rename_all = "lowercase")]
pub enum VoicingConfig {
    Pitched {
        waveform: String,
        #[serde(default)]
        play_once: bool,
    },
    /// One entry per tone key; `null` leaves the key silent
    Keyed { notes: Vec<Option<NoteConfig>> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub name: String,
    #[serde(flatten)]
    pub voicing: VoicingConfig,
    #[serde(default)]
    pub envelope: Envelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercussionConfig {
    pub key: KeyId,
    pub waveform: String,
    pub frequency: f64,
    #[serde(default)]
    pub play_once: bool,
    /// Full volume until released when absent
    #[serde(default)]
    pub envelope: Option<Envelope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// Input port name; the first available port when absent
    pub port: Option<String>,
    /// Controller number whose value selects the octave
    pub octave_controller: u8,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            port: None,
            octave_controller: 20,
        }
    }
}

/// Static synthesizer configuration, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub sample_rate: u32,
    pub tick_rate: u32,
    pub tuning: TuningConfig,
    /// Tone keys, lowest first, one semitone apart
    pub tone_keys: Vec<KeyId>,
    pub waveforms: BTreeMap<String, WaveformSource>,
    pub instruments: Vec<InstrumentConfig>,
    pub default_instrument: usize,
    pub percussion: Vec<PercussionConfig>,
    pub output_device: Option<String>,
    pub midi: MidiSettings,
    /// Directory that relative sample paths resolve against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        let builtin = |shape| WaveformSource::Builtin {
            shape,
            amplitude: DEFAULT_AMPLITUDE,
            length: DEFAULT_TABLE_LENGTH,
        };
        let mut waveforms = BTreeMap::new();
        waveforms.insert("square12".to_string(), builtin(Shape::Square { duty_cycle: 0.125 }));
        waveforms.insert("square25".to_string(), builtin(Shape::Square { duty_cycle: 0.25 }));
        waveforms.insert("square50".to_string(), builtin(Shape::Square { duty_cycle: 0.5 }));
        waveforms.insert("triangle".to_string(), builtin(Shape::Triangle));
        waveforms.insert("sawtooth".to_string(), builtin(Shape::Sawtooth));
        waveforms.insert("sine".to_string(), builtin(Shape::Sine));
        waveforms.insert("noise".to_string(), builtin(Shape::Noise { mode: NoiseMode::Long }));
        waveforms.insert("noise_short".to_string(), builtin(Shape::Noise { mode: NoiseMode::Short }));

        let pitched = |name: &str, waveform: &str| InstrumentConfig {
            name: name.to_string(),
            voicing: VoicingConfig::Pitched {
                waveform: waveform.to_string(),
                play_once: false,
            },
            envelope: Envelope::default(),
        };
        let instruments = vec![
            pitched("Pulse 12.5%", "square12"),
            pitched("Pulse 25%", "square25"),
            pitched("Pulse 50%", "square50"),
            pitched("Triangle", "triangle"),
            pitched("Sawtooth", "sawtooth"),
            pitched("Sine", "sine"),
            pitched("Noise", "noise"),
        ];

        let hit = |key: u8, waveform: &str, frequency: f64, decay: u32| PercussionConfig {
            key: KeyId(key),
            waveform: waveform.to_string(),
            frequency,
            play_once: true,
            envelope: Some(Envelope {
                initial: 1.0,
                attack: 0,
                decay,
                sustain: 0.0,
                release: 0,
            }),
        };
        let percussion = vec![
            hit(36, "noise_short", 8.0, 8),
            hit(38, "noise", 4.0, 12),
            hit(42, "noise", 8.0, 4),
            hit(46, "noise", 2.0, 24),
        ];

        Self {
            sample_rate: 44100,
            tick_rate: 60,
            tuning: TuningConfig::default(),
            tone_keys: (55..=72).map(KeyId).collect(),
            waveforms,
            instruments,
            default_instrument: 2,
            percussion,
            output_device: None,
            midi: MidiSettings::default(),
            base_dir: None,
        }
    }
}

impl SynthConfig {
    /// Samples per tick
    pub fn tick_length(&self) -> usize {
        (self.sample_rate as f64 / self.tick_rate as f64).round() as usize
    }

    /// `<config dir>/chipsynth/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        path.push("chipsynth");
        path.push("config.json");
        Ok(path)
    }

    /// Load the file at the default location, or the built-in setup if there is none
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            info!("No configuration at {}, using built-in instruments", path.display());
            Ok(Self::default())
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open configuration: {}", path.display()))?;
        let mut config: Self = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create configuration directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;
        let mut file = File::create(path).context("Failed to create configuration file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write configuration")?;
        Ok(())
    }

    /// Check everything that does not need the waveform tables
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.tick_rate == 0 {
            bail!("sample_rate and tick_rate must be positive");
        }
        if self.tick_length() == 0 {
            bail!(
                "tick_rate {} is too fast for sample_rate {}",
                self.tick_rate,
                self.sample_rate
            );
        }
        if self.instruments.is_empty() {
            bail!("at least one instrument is required");
        }
        if self.default_instrument >= self.instruments.len() {
            bail!(
                "default_instrument {} does not exist ({} instruments)",
                self.default_instrument,
                self.instruments.len()
            );
        }
        if !self.tuning.reference_frequency.is_finite() || self.tuning.reference_frequency <= 0.0 {
            bail!("reference_frequency must be positive");
        }
        let lowest = min_frequency(self.sample_rate);
        // Zero and negative frequencies stay legal and leave the key silent
        let check_frequency = |what: &str, frequency: f64| -> Result<()> {
            if frequency > 0.0 && frequency < lowest {
                bail!(
                    "{} frequency {} Hz is below the lowest playable {:.4} Hz",
                    what,
                    frequency,
                    lowest
                );
            }
            Ok(())
        };
        for instrument in &self.instruments {
            instrument
                .envelope
                .validate()
                .with_context(|| format!("Invalid envelope for instrument '{}'", instrument.name))?;
            if let VoicingConfig::Keyed { notes } = &instrument.voicing {
                for note in notes.iter().flatten() {
                    check_frequency(&format!("instrument '{}'", instrument.name), note.frequency)?;
                }
            }
        }
        for hit in &self.percussion {
            check_frequency(&format!("percussion {}", hit.key), hit.frequency)?;
            if let Some(envelope) = &hit.envelope {
                envelope
                    .validate()
                    .with_context(|| format!("Invalid envelope for percussion {}", hit.key))?;
            }
            if self.tone_keys.contains(&hit.key) {
                warn!("{} is both a tone key and a percussion key; percussion wins", hit.key);
            }
        }
        Ok(())
    }

    /// Build every waveform table
    pub fn build_library(&self) -> Result<WaveformLibrary> {
        let mut library = WaveformLibrary::new();
        for (name, source) in &self.waveforms {
            let samples = match source {
                WaveformSource::Builtin {
                    shape,
                    amplitude,
                    length,
                } => {
                    shape
                        .validate(*amplitude, *length)
                        .with_context(|| format!("Invalid waveform '{}'", name))?;
                    shape.build(*amplitude, *length)
                }
                WaveformSource::Dpcm { path } => {
                    let path = match &self.base_dir {
                        Some(dir) if path.is_relative() => dir.join(path),
                        _ => path.clone(),
                    };
                    load_dpcm(&path).with_context(|| format!("Invalid waveform '{}'", name))?
                }
            };
            library.insert(Waveform::new(name.clone(), samples))?;
        }
        Ok(library)
    }

    /// Resolve instrument and percussion definitions against the waveform tables
    pub fn build_bank(&self) -> Result<InstrumentBank> {
        let library = self.build_library()?;
        let lookup = |name: &str, owner: &str| -> Result<WaveformId> {
            library
                .id(name)
                .ok_or_else(|| anyhow!("{} refers to unknown waveform '{}'", owner, name))
        };

        let mut instruments = Vec::with_capacity(self.instruments.len());
        for config in &self.instruments {
            let owner = format!("Instrument '{}'", config.name);
            let voicing = match &config.voicing {
                VoicingConfig::Pitched {
                    waveform,
                    play_once,
                } => Voicing::Pitched {
                    waveform: lookup(waveform, &owner)?,
                    mode: PlaybackMode::from_play_once(*play_once),
                },
                VoicingConfig::Keyed { notes } => {
                    let mut slots = Vec::with_capacity(notes.len());
                    for note in notes {
                        let slot = match note {
                            Some(note) => Some(NoteSlot {
                                waveform: lookup(&note.waveform, &owner)?,
                                frequency: note.frequency,
                                mode: PlaybackMode::from_play_once(note.play_once),
                            }),
                            None => None,
                        };
                        slots.push(slot);
                    }
                    Voicing::Keyed { notes: slots }
                }
            };
            instruments.push(Instrument {
                name: config.name.clone(),
                voicing,
                envelope: config.envelope,
            });
        }

        let mut percussion = HashMap::with_capacity(self.percussion.len());
        for hit in &self.percussion {
            let slot = PercussionSlot {
                note: NoteSlot {
                    waveform: lookup(&hit.waveform, &format!("Percussion {}", hit.key))?,
                    frequency: hit.frequency,
                    mode: PlaybackMode::from_play_once(hit.play_once),
                },
                envelope: hit.envelope.unwrap_or(Envelope::constant()),
            };
            if percussion.insert(hit.key, slot).is_some() {
                bail!("Percussion {} is defined twice", hit.key);
            }
        }

        Ok(InstrumentBank::new(library, instruments, percussion))
    }

    /// Every key that can start a voice: tone keys then percussion keys
    pub fn playable_keys(&self) -> Vec<KeyId> {
        self.tone_keys
            .iter()
            .copied()
            .chain(self.percussion.iter().map(|hit| hit.key))
            .collect()
    }

    pub fn build_tuning(&self) -> Tuning {
        Tuning::new(&self.tone_keys, &self.tuning)
    }

    /// Validate and assemble a ready-to-run voice engine
    pub fn build_engine(&self) -> Result<VoiceEngine> {
        self.validate()?;
        let bank = self.build_bank()?;
        Ok(VoiceEngine::new(
            self.sample_rate,
            self.tick_length(),
            bank,
            self.build_tuning(),
            self.tuning.default_octave,
            self.default_instrument,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_length() {
        assert_eq!(SynthConfig::default().tick_length(), 735);
    }

    #[test]
    fn default_config_builds() {
        let config = SynthConfig::default();
        let engine = config.build_engine().unwrap();
        assert_eq!(engine.bank().instrument_count(), 7);
        assert_eq!(engine.bank().library().len(), 8);
        assert_eq!(engine.tuning().key_count(), 18);
        assert_eq!(engine.current_instrument(), 2);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = SynthConfig::default();
        config.save_to_file(&path).unwrap();

        let loaded = SynthConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.base_dir.as_deref(), path.parent());
        assert_eq!(loaded.instruments, config.instruments);
        assert_eq!(loaded.waveforms, config.waveforms);
        assert_eq!(loaded.percussion, config.percussion);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SynthConfig = serde_json::from_str(r#"{ "tick_rate": 50 }"#).unwrap();
        assert_eq!(config.tick_rate, 50);
        assert_eq!(config.tick_length(), 882);
        assert_eq!(config.instruments.len(), 7);
    }

    #[test]
    fn parses_keyed_instrument() {
        let json = r#"{
            "waveforms": {
                "pulse": { "type": "builtin", "shape": { "kind": "square", "duty_cycle": 0.5 } },
                "blip": { "type": "builtin", "shape": { "kind": "noise", "mode": "short" }, "amplitude": 4000 }
            },
            "instruments": [
                { "name": "lead", "voicing": "pitched", "waveform": "pulse" },
                { "name": "kit", "voicing": "keyed", "notes": [
                    { "waveform": "blip", "frequency": 10.0, "play_once": true },
                    null
                ] }
            ],
            "default_instrument": 0,
            "percussion": []
        }"#;
        let config: SynthConfig = serde_json::from_str(json).unwrap();
        let bank = config.build_bank().unwrap();
        assert_eq!(bank.instrument_count(), 2);
        let kit = bank.instrument(1).unwrap();
        match &kit.voicing {
            Voicing::Keyed { notes } => {
                assert_eq!(notes.len(), 2);
                assert_eq!(notes[0].unwrap().mode, PlaybackMode::OneShot);
                assert!(notes[1].is_none());
            }
            other => panic!("unexpected voicing {:?}", other),
        }
        let blip = bank.library().get(bank.library().id("blip").unwrap()).unwrap();
        assert_eq!(blip.len(), 93);
    }

    #[test]
    fn unknown_waveform_is_fatal() {
        let mut config = SynthConfig::default();
        config.instruments[0].voicing = VoicingConfig::Pitched {
            waveform: "missing".to_string(),
            play_once: false,
        };
        let err = config.build_engine().unwrap_err();
        assert!(err.to_string().contains("unknown waveform 'missing'"));
    }

    #[test]
    fn unknown_shape_is_fatal() {
        let json = r#"{ "waveforms": { "x": { "type": "builtin", "shape": { "kind": "organ" } } } }"#;
        assert!(serde_json::from_str::<SynthConfig>(json).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = SynthConfig::default();
        config.default_instrument = 7;
        assert!(config.build_engine().is_err());

        let mut config = SynthConfig::default();
        config.instruments[1].envelope.sustain = 2.0;
        assert!(config.build_engine().is_err());

        let mut config = SynthConfig::default();
        config.waveforms.insert(
            "bad".to_string(),
            WaveformSource::Builtin {
                shape: Shape::Square { duty_cycle: 0.0 },
                amplitude: 100,
                length: 8,
            },
        );
        assert!(config.build_engine().is_err());
    }

    #[test]
    fn subsonic_percussion_is_rejected() {
        let mut config = SynthConfig::default();
        config.percussion[1].frequency = 1e-6;
        let err = config.build_engine().unwrap_err();
        assert!(err.to_string().contains("below the lowest playable"));

        // Silent keys are still allowed
        let mut config = SynthConfig::default();
        config.percussion[1].frequency = 0.0;
        assert!(config.build_engine().is_ok());
    }

    #[test]
    fn dpcm_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kick.dmc"), [0xFF, 0x00, 0x0F]).unwrap();
        let mut config = SynthConfig::default();
        config.waveforms.insert(
            "kick".to_string(),
            WaveformSource::Dpcm {
                path: PathBuf::from("kick.dmc"),
            },
        );
        let path = dir.path().join("config.json");
        config.save_to_file(&path).unwrap();

        let loaded = SynthConfig::load_from_file(&path).unwrap();
        let library = loaded.build_library().unwrap();
        let kick = library.get(library.id("kick").unwrap()).unwrap();
        assert_eq!(kick.len(), 24);
    }

    #[test]
    fn missing_sample_file_is_fatal() {
        let mut config = SynthConfig::default();
        config.waveforms.insert(
            "kick".to_string(),
            WaveformSource::Dpcm {
                path: PathBuf::from("/no/such/kick.dmc"),
            },
        );
        assert!(config.build_engine().is_err());
    }

    #[test]
    fn duplicate_percussion_is_fatal() {
        let mut config = SynthConfig::default();
        let first = config.percussion[0].clone();
        config.percussion.push(first);
        assert!(config.build_bank().is_err());
    }
}
