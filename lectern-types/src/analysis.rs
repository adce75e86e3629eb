//! Harmonic analysis annotations, loaded from an external document.

use serde::{Deserialize, Serialize};

/// Annotation for one step: a primary label (e.g. a Roman numeral) and a
/// secondary label (e.g. a functional description).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: String,
}

/// An analysis document: entries aligned 1:1 by position with partitioned
/// steps. Short or absent lists are valid and leave later steps
/// unannotated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDoc {
    #[serde(default)]
    pub steps: Vec<AnalysisEntry>,
}

/// Accepts either the object form `{ "steps": [...] }` or a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnalysisShape {
    Doc(AnalysisDoc),
    Bare(Vec<AnalysisEntry>),
}

impl AnalysisDoc {
    /// Parse an analysis document, normalizing a bare list to the object
    /// form. Returns `None` on malformed input — a missing or broken
    /// analysis document only suppresses annotations.
    pub fn from_json(text: &str) -> Option<Self> {
        match serde_json::from_str::<AnalysisShape>(text) {
            Ok(AnalysisShape::Doc(doc)) => Some(doc),
            Ok(AnalysisShape::Bare(steps)) => Some(Self { steps }),
            Err(_) => None,
        }
    }

    /// Entry for a 1-based step index. A missing entry is valid and
    /// suppresses the overlay for that step.
    pub fn entry_for(&self, step_index: usize) -> Option<&AnalysisEntry> {
        if step_index == 0 {
            return None;
        }
        self.steps.get(step_index - 1)
    }
}
