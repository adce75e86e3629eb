//! Pitch resolution: mapping a step's elements to numeric pitch codes.
//!
//! Runs once per score load — it depends only on static score content,
//! never on layout.

use lectern_types::{pitch_code, ElementId, Step};

use crate::score::PitchLookup;

/// Resolve the pitch codes for a set of element ids.
///
/// Elements the toolkit cannot resolve (missing or invalid attributes) are
/// skipped; an empty result is legitimate. The result is deduplicated and
/// ascending-sorted.
pub fn resolve_pitches(elements: &[ElementId], lookup: &impl PitchLookup) -> Vec<u8> {
    let mut pitches: Vec<u8> = elements
        .iter()
        .filter_map(|id| {
            let attrs = lookup.note_attributes(id)?;
            match pitch_code(attrs.pname, attrs.octave) {
                Some(code) => Some(code),
                None => {
                    log::debug!(
                        target: "pitch",
                        "unresolvable pitch for {}: pname={} octave={}",
                        id,
                        attrs.pname,
                        attrs.octave
                    );
                    None
                }
            }
        })
        .collect();
    pitches.sort_unstable();
    pitches.dedup();
    pitches
}

/// Fill in the pitch sets for every partitioned step.
pub fn resolve_steps(steps: &mut [Step], lookup: &impl PitchLookup) {
    for step in steps.iter_mut() {
        step.pitches = resolve_pitches(&step.elements, lookup);
    }
}
