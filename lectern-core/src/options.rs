//! Per-viewer configuration, parsed from the embed URL's query string.
//!
//! The embedding host hands each viewer its own query string, so two
//! viewers in one deck can show different scores with different MIDI
//! routing. Unrecognized keys are ignored; a missing `score` is the one
//! fatal case.

use std::path::PathBuf;

use crate::overlay::Zoom;

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Source location of the score document (required).
    pub score: PathBuf,
    /// Optional display title.
    pub title: Option<String>,
    /// Enables debug affordances and verbose diagnostics.
    pub debug: bool,
    /// Fit-to-width (default) or a manual scale factor.
    pub zoom: Zoom,
    /// Explicit analysis document path; defaults to the score path with
    /// its extension replaced.
    pub analysis: Option<PathBuf>,
    /// MIDI port name hints (override the config file).
    pub midi_in: Option<String>,
    pub midi_out: Option<String>,
    /// CC number overrides.
    pub cc_step: Option<u8>,
    pub cc_count: Option<u8>,
    pub cc_slide: Option<u8>,
    /// Note output overrides.
    pub channel: Option<u8>,
    pub velocity: Option<u8>,
    pub note_ms: Option<u64>,
}

impl ViewerOptions {
    /// Parse a query string of the form `score=...&zoom=fit&debug=1`.
    /// Keys are case-sensitive; later duplicates win.
    pub fn from_query(query: &str) -> Result<Self, String> {
        let mut score = None;
        let mut options = Self {
            score: PathBuf::new(),
            title: None,
            debug: false,
            zoom: Zoom::Fit,
            analysis: None,
            midi_in: None,
            midi_out: None,
            cc_step: None,
            cc_count: None,
            cc_slide: None,
            channel: None,
            velocity: None,
            note_ms: None,
        };

        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, raw) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            let value = decode_component(raw);

            match key {
                "score" => score = Some(PathBuf::from(value)),
                "title" => options.title = Some(value),
                "debug" => options.debug = parse_bool(&value),
                "zoom" => options.zoom = parse_zoom(&value),
                "analysis" => options.analysis = Some(PathBuf::from(value)),
                "midi-in" => options.midi_in = Some(value),
                "midi-out" => options.midi_out = Some(value),
                "cc-step" => options.cc_step = parse_cc(key, &value),
                "cc-count" => options.cc_count = parse_cc(key, &value),
                "cc-slide" => options.cc_slide = parse_cc(key, &value),
                "channel" => options.channel = value.parse().ok().map(|c: u8| c & 0x0F),
                "velocity" => options.velocity = parse_cc(key, &value),
                "note-ms" => options.note_ms = value.parse().ok(),
                _ => {
                    log::debug!(target: "config", "ignoring unknown query parameter '{}'", key)
                }
            }
        }

        match score {
            Some(path) if !path.as_os_str().is_empty() => {
                options.score = path;
                Ok(options)
            }
            _ => Err("missing required 'score' parameter".to_string()),
        }
    }

    /// Analysis document location: explicit, or the score path with its
    /// extension replaced.
    pub fn analysis_path(&self) -> PathBuf {
        match &self.analysis {
            Some(path) => path.clone(),
            None => self.score.with_extension("analysis.json"),
        }
    }
}

/// Booleans accept bare presence, `1`, and `true`.
fn parse_bool(value: &str) -> bool {
    matches!(value, "" | "1" | "true")
}

fn parse_zoom(value: &str) -> Zoom {
    if value == "fit" || value.is_empty() {
        return Zoom::Fit;
    }
    match value.parse::<f64>() {
        Ok(scale) if scale > 0.0 => Zoom::Scale(scale),
        _ => {
            log::warn!(target: "config", "invalid zoom '{}', using fit", value);
            Zoom::Fit
        }
    }
}

fn parse_cc(key: &str, value: &str) -> Option<u8> {
    match value.parse::<u8>() {
        Ok(n) if n <= 127 => Some(n),
        _ => {
            log::warn!(target: "config", "invalid 7-bit value for '{}': '{}'", key, value);
            None
        }
    }
}

/// Minimal percent-decoding for query components (`+` is a space).
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_query() {
        let options = ViewerOptions::from_query("score=chorale.json").unwrap();
        assert_eq!(options.score, PathBuf::from("chorale.json"));
        assert!(!options.debug);
        assert_eq!(options.zoom, Zoom::Fit);
        assert_eq!(options.analysis_path(), PathBuf::from("chorale.analysis.json"));
    }

    #[test]
    fn test_missing_score_is_fatal() {
        assert!(ViewerOptions::from_query("title=Chorale").is_err());
        assert!(ViewerOptions::from_query("score=").is_err());
        assert!(ViewerOptions::from_query("").is_err());
    }

    #[test]
    fn test_full_query() {
        let options = ViewerOptions::from_query(
            "score=bach%2Fchorale.json&title=Bach+Chorale&debug=1&zoom=1.5\
             &analysis=notes.json&midi-in=launchkey&midi-out=iac&cc-step=30\
             &cc-count=31&cc-slide=32&channel=2&velocity=100&note-ms=500",
        )
        .unwrap();
        assert_eq!(options.score, PathBuf::from("bach/chorale.json"));
        assert_eq!(options.title.as_deref(), Some("Bach Chorale"));
        assert!(options.debug);
        assert_eq!(options.zoom, Zoom::Scale(1.5));
        assert_eq!(options.analysis_path(), PathBuf::from("notes.json"));
        assert_eq!(options.midi_in.as_deref(), Some("launchkey"));
        assert_eq!(options.cc_step, Some(30));
        assert_eq!(options.cc_count, Some(31));
        assert_eq!(options.cc_slide, Some(32));
        assert_eq!(options.channel, Some(2));
        assert_eq!(options.velocity, Some(100));
        assert_eq!(options.note_ms, Some(500));
    }

    #[test]
    fn test_bool_forms() {
        assert!(ViewerOptions::from_query("score=s&debug").unwrap().debug);
        assert!(ViewerOptions::from_query("score=s&debug=true").unwrap().debug);
        assert!(!ViewerOptions::from_query("score=s&debug=0").unwrap().debug);
        assert!(!ViewerOptions::from_query("score=s").unwrap().debug);
    }

    #[test]
    fn test_invalid_values_degrade() {
        let options =
            ViewerOptions::from_query("score=s&zoom=-2&cc-step=999&unknown=x").unwrap();
        assert_eq!(options.zoom, Zoom::Fit);
        assert_eq!(options.cc_step, None);
    }

    #[test]
    fn test_leading_question_mark_tolerated() {
        assert!(ViewerOptions::from_query("?score=s").is_ok());
    }
}
