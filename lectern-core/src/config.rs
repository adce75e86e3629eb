use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    midi: MidiConfig,
    #[serde(default)]
    layout: LayoutConfig,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    input_hint: Option<String>,
    output_hint: Option<String>,
    cc_step_select: Option<u8>,
    cc_step_count: Option<u8>,
    cc_slide_index: Option<u8>,
    channel: Option<u8>,
    velocity: Option<u8>,
    note_duration_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct LayoutConfig {
    resize_padding: Option<f64>,
    fit_margin: Option<f64>,
    baseline_pad: Option<f64>,
}

pub struct Config {
    midi: MidiConfig,
    layout: LayoutConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_midi(&mut base.midi, user.midi);
                            merge_layout(&mut base.layout, user.layout);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            midi: base.midi,
            layout: base.layout,
        }
    }

    pub fn input_hint(&self) -> &str {
        self.midi.input_hint.as_deref().unwrap_or("")
    }

    pub fn output_hint(&self) -> &str {
        self.midi.output_hint.as_deref().unwrap_or("")
    }

    /// Inbound CC selecting a step (0 clears, 1..N selects).
    pub fn cc_step_select(&self) -> u8 {
        self.midi.cc_step_select.unwrap_or(22) & 0x7F
    }

    /// Outbound CC announcing the total step count.
    pub fn cc_step_count(&self) -> u8 {
        self.midi.cc_step_count.unwrap_or(23) & 0x7F
    }

    /// Outbound CC announcing the current slide index.
    pub fn cc_slide_index(&self) -> u8 {
        self.midi.cc_slide_index.unwrap_or(24) & 0x7F
    }

    pub fn channel(&self) -> u8 {
        self.midi.channel.unwrap_or(0) & 0x0F
    }

    pub fn velocity(&self) -> u8 {
        self.midi.velocity.unwrap_or(80) & 0x7F
    }

    /// How long a step's notes sound before the scheduled note-offs.
    pub fn note_duration(&self) -> Duration {
        Duration::from_millis(self.midi.note_duration_ms.unwrap_or(350).clamp(20, 10_000))
    }

    /// Extra pixels the deck adds when resizing a slide to a reported
    /// viewer height.
    pub fn resize_padding(&self) -> f64 {
        self.layout.resize_padding.unwrap_or(24.0)
    }

    /// Horizontal margin used by fit-to-width zoom.
    pub fn fit_margin(&self) -> f64 {
        self.layout.fit_margin.unwrap_or(16.0)
    }

    /// Gap between the lowest notated element and the annotation baseline.
    pub fn baseline_pad(&self) -> f64 {
        self.layout.baseline_pad.unwrap_or(18.0)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lectern").join("config.toml"))
}

fn merge_midi(base: &mut MidiConfig, user: MidiConfig) {
    if user.input_hint.is_some() {
        base.input_hint = user.input_hint;
    }
    if user.output_hint.is_some() {
        base.output_hint = user.output_hint;
    }
    if user.cc_step_select.is_some() {
        base.cc_step_select = user.cc_step_select;
    }
    if user.cc_step_count.is_some() {
        base.cc_step_count = user.cc_step_count;
    }
    if user.cc_slide_index.is_some() {
        base.cc_slide_index = user.cc_slide_index;
    }
    if user.channel.is_some() {
        base.channel = user.channel;
    }
    if user.velocity.is_some() {
        base.velocity = user.velocity;
    }
    if user.note_duration_ms.is_some() {
        base.note_duration_ms = user.note_duration_ms;
    }
}

fn merge_layout(base: &mut LayoutConfig, user: LayoutConfig) {
    if user.resize_padding.is_some() {
        base.resize_padding = user.resize_padding;
    }
    if user.fit_margin.is_some() {
        base.fit_margin = user.fit_margin;
    }
    if user.baseline_pad.is_some() {
        base.baseline_pad = user.baseline_pad;
    }
}
