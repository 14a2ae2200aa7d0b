//! Layered TOML configuration.
//!
//! The embedded `config.toml` supplies every key.  A user file, either
//! passed with `--config` or found at `<config dir>/finger_piano/config.toml`,
//! overrides individual keys.  An explicitly passed file must load; the
//! implicit one is skipped with a warning if it is malformed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context};
use piano_notes::NoteSet;
use serde::Deserialize;

use crate::note_bank::MidiSettings;
use crate::press::PressDetector;
use crate::session::SessionConfig;
use crate::tracker::TrackerSettings;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    timing:  TimingConfig,
    #[serde(default)]
    press:   PressConfig,
    #[serde(default)]
    notes:   NotesConfig,
    #[serde(default)]
    midi:    MidiConfig,
    #[serde(default)]
    tracker: TrackerConfig,
}

#[derive(Deserialize, Default)]
struct TimingConfig {
    press_cooldown_ms:   Option<u64>,
    gesture_cooldown_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct PressConfig {
    min_drop_px:      Option<f32>,
    max_drift_px:     Option<f32>,
    reference_width:  Option<u32>,
    reference_height: Option<u32>,
    scale_with_frame: Option<bool>,
}

#[derive(Deserialize, Default)]
struct NotesConfig {
    original:  Option<Vec<String>>,
    alternate: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    program:   Option<u8>,
    channel:   Option<u8>,
    velocity:  Option<u8>,
    hold_ms:   Option<u64>,
    port_hint: Option<String>,
}

#[derive(Deserialize, Default)]
struct TrackerConfig {
    command:   Option<Vec<String>>,
    width:     Option<u32>,
    height:    Option<u32>,
    max_hands: Option<u32>,
    min_detection_confidence: Option<f32>,
    min_tracking_confidence:  Option<f32>,
}

fn layer<T>(base: &mut Option<T>, user: Option<T>) {
    if user.is_some() {
        *base = user;
    }
}

impl ConfigFile {
    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Overwrite every key that `user` sets.
    fn merge(&mut self, user: ConfigFile) {
        let (t, u) = (&mut self.timing, user.timing);
        layer(&mut t.press_cooldown_ms,   u.press_cooldown_ms);
        layer(&mut t.gesture_cooldown_ms, u.gesture_cooldown_ms);

        let (p, u) = (&mut self.press, user.press);
        layer(&mut p.min_drop_px,      u.min_drop_px);
        layer(&mut p.max_drift_px,     u.max_drift_px);
        layer(&mut p.reference_width,  u.reference_width);
        layer(&mut p.reference_height, u.reference_height);
        layer(&mut p.scale_with_frame, u.scale_with_frame);

        let (n, u) = (&mut self.notes, user.notes);
        layer(&mut n.original,  u.original);
        layer(&mut n.alternate, u.alternate);

        let (m, u) = (&mut self.midi, user.midi);
        layer(&mut m.program,   u.program);
        layer(&mut m.channel,   u.channel);
        layer(&mut m.velocity,  u.velocity);
        layer(&mut m.hold_ms,   u.hold_ms);
        layer(&mut m.port_hint, u.port_hint);

        let (k, u) = (&mut self.tracker, user.tracker);
        layer(&mut k.command,   u.command);
        layer(&mut k.width,     u.width);
        layer(&mut k.height,    u.height);
        layer(&mut k.max_hands, u.max_hands);
        layer(&mut k.min_detection_confidence, u.min_detection_confidence);
        layer(&mut k.min_tracking_confidence,  u.min_tracking_confidence);
    }
}

/// Validated configuration for the whole application.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub midi:    MidiSettings,
    pub tracker: TrackerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            session: SessionConfig::default(),
            midi:    MidiSettings::default(),
            tracker: TrackerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Embedded defaults overlaid with the user file.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut file = ConfigFile::parse(DEFAULT_CONFIG)
            .context("embedded config.toml is invalid")?;

        match explicit {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("could not read config {}", path.display()))?;
                let user = ConfigFile::parse(&text)
                    .with_context(|| format!("malformed config {}", path.display()))?;
                log::info!(target: "config", "using {}", path.display());
                file.merge(user);
            }
            None => {
                if let Some(path) = user_config_path().filter(|p| p.exists()) {
                    match fs::read_to_string(&path) {
                        Ok(text) => match ConfigFile::parse(&text) {
                            Ok(user) => {
                                log::info!(target: "config", "using {}", path.display());
                                file.merge(user);
                            }
                            Err(e) => log::warn!(
                                target: "config",
                                "ignoring malformed config {}: {}", path.display(), e,
                            ),
                        },
                        Err(e) => log::warn!(
                            target: "config",
                            "could not read config {}: {}", path.display(), e,
                        ),
                    }
                }
            }
        }

        Self::from_file(file)
    }

    /// Embedded defaults overlaid with `user` TOML text.
    pub fn from_toml_str(user: &str) -> anyhow::Result<Self> {
        let mut file = ConfigFile::parse(DEFAULT_CONFIG)
            .context("embedded config.toml is invalid")?;
        file.merge(ConfigFile::parse(user).context("malformed config")?);
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> anyhow::Result<Self> {
        let d = AppConfig::default();

        // ── session ──────────────────────────────────────────────────────
        let ConfigFile { timing, press, notes, midi, tracker } = file;

        let original = match notes.original {
            Some(names) => NoteSet::from_names(names.as_slice()).context("notes.original")?,
            None        => d.session.original,
        };
        let alternate = match notes.alternate {
            Some(names) => NoteSet::from_names(names.as_slice()).context("notes.alternate")?,
            None        => d.session.alternate,
        };

        let detector = PressDetector {
            min_drop:  press.min_drop_px.unwrap_or(d.session.detector.min_drop),
            max_drift: press.max_drift_px.unwrap_or(d.session.detector.max_drift),
        };
        ensure!(detector.min_drop >= 0.0, "press.min_drop_px must not be negative");
        ensure!(detector.max_drift > 0.0, "press.max_drift_px must be positive");

        let reference_size = if press.scale_with_frame.unwrap_or(true) {
            let (rw, rh) = d.session.reference_size.unwrap_or((640, 480));
            let size = (press.reference_width.unwrap_or(rw), press.reference_height.unwrap_or(rh));
            ensure!(size.0 > 0 && size.1 > 0, "press reference size must be non-zero");
            Some(size)
        } else {
            None
        };

        let session = SessionConfig {
            press_cooldown: timing.press_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(d.session.press_cooldown),
            gesture_cooldown: timing.gesture_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(d.session.gesture_cooldown),
            detector,
            reference_size,
            original,
            alternate,
        };

        // ── midi ─────────────────────────────────────────────────────────
        let midi = MidiSettings {
            program:   midi.program.unwrap_or(d.midi.program),
            channel:   midi.channel.unwrap_or(d.midi.channel),
            velocity:  midi.velocity.unwrap_or(d.midi.velocity),
            hold:      midi.hold_ms.map(Duration::from_millis).unwrap_or(d.midi.hold),
            port_hint: midi.port_hint.unwrap_or(d.midi.port_hint),
        };
        ensure!(midi.program  <= 127, "midi.program must be 0–127");
        ensure!(midi.channel  <= 15,  "midi.channel must be 0–15");
        ensure!(midi.velocity <= 127, "midi.velocity must be 0–127");

        // ── tracker ──────────────────────────────────────────────────────
        let tracker = TrackerSettings {
            command:   tracker.command.unwrap_or(d.tracker.command),
            width:     tracker.width.unwrap_or(d.tracker.width),
            height:    tracker.height.unwrap_or(d.tracker.height),
            max_hands: tracker.max_hands.unwrap_or(d.tracker.max_hands),
            min_detection_confidence: tracker.min_detection_confidence
                .unwrap_or(d.tracker.min_detection_confidence),
            min_tracking_confidence: tracker.min_tracking_confidence
                .unwrap_or(d.tracker.min_tracking_confidence),
        };
        ensure!(tracker.width > 0 && tracker.height > 0, "tracker size must be non-zero");
        ensure!(
            (0.0..=1.0).contains(&tracker.min_detection_confidence)
                && (0.0..=1.0).contains(&tracker.min_tracking_confidence),
            "tracker confidences must be within 0.0–1.0",
        );

        Ok(AppConfig { session, midi, tracker })
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("finger_piano").join("config.toml"))
}
