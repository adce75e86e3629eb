//! Port resolution: matching configured name hints against available
//! MIDI endpoints.
//!
//! Hardware and virtual ports spell the same device in many ways
//! ("Launchkey Mini MK3", "launchkey-mini-mk3:out", "LAUNCHKEY_MINI …"),
//! so names and hints are normalized before matching.

use midir::{MidiInput, MidiInputPort, MidiOutput, MidiOutputPort};
use regex::Regex;

/// Lowercase a port name and strip every run of non-alphanumerics, so
/// punctuation and spacing variants compare equal.
pub fn normalize_port_name(name: &str) -> String {
    let sep = Regex::new("[^a-z0-9]+").expect("static pattern");
    sep.replace_all(&name.to_lowercase(), "").into_owned()
}

/// Whether a port name matches a configured hint. Empty hints match
/// nothing — an unset hint means "do not bind".
pub fn matches_hint(name: &str, hint: &str) -> bool {
    let hint = normalize_port_name(hint);
    if hint.is_empty() {
        return false;
    }
    normalize_port_name(name).contains(&hint)
}

/// First input port whose name matches the hint.
pub fn find_input_port(midi_in: &MidiInput, hint: &str) -> Option<MidiInputPort> {
    midi_in.ports().into_iter().find(|port| {
        midi_in
            .port_name(port)
            .map(|name| matches_hint(&name, hint))
            .unwrap_or(false)
    })
}

/// First output port whose name matches the hint.
pub fn find_output_port(midi_out: &MidiOutput, hint: &str) -> Option<MidiOutputPort> {
    midi_out.ports().into_iter().find(|port| {
        midi_out
            .port_name(port)
            .map(|name| matches_hint(&name, hint))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_port_name("Launchkey Mini MK3"), "launchkeyminimk3");
        assert_eq!(normalize_port_name("launchkey-mini_mk3:out"), "launchkeyminimk3out");
        assert_eq!(normalize_port_name("IAC Driver (Bus 1)"), "iacdriverbus1");
    }

    #[test]
    fn test_hint_matches_punctuation_variants() {
        assert!(matches_hint("Launchkey Mini MK3 MIDI 1", "launchkey-mini"));
        assert!(matches_hint("IAC Driver Bus 1", "IAC.Driver"));
        assert!(matches_hint("loopMIDI Port", "loopmidi"));
        assert!(!matches_hint("Launchkey Mini MK3", "push"));
    }

    #[test]
    fn test_empty_hint_matches_nothing() {
        assert!(!matches_hint("Launchkey Mini MK3", ""));
        assert!(!matches_hint("anything", "---"));
    }
}
