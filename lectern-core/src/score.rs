//! The rendered score, as produced by the external rendering toolkit.
//!
//! The toolkit is a black box: it is fed a source notation document and
//! yields a vector image plus per-element lookups. Lectern consumes that
//! output as a single JSON document — an element tree, a note-attribute
//! table, and a bounds table in toolkit units. The score is owned for the
//! viewer's session lifetime and replaced wholesale on reload, never
//! mutated incrementally.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use lectern_types::{ElementId, Rect, Size};

/// Classification of a rendered element, as tagged by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Chord,
    Note,
    Notehead,
    /// Anything else (beams, stems, flags, decorative glyphs). Traversed
    /// but never collected into a step.
    Other,
}

impl<'de> Deserialize<'de> for ElementKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "chord" => ElementKind::Chord,
            "note" => ElementKind::Note,
            "notehead" => ElementKind::Notehead,
            _ => ElementKind::Other,
        })
    }
}

/// One node of the rendered element tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreNode {
    pub id: ElementId,
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<ScoreNode>,
}

impl ScoreNode {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(id),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ScoreNode>) -> Self {
        self.children = children;
        self
    }

    /// Whether any descendant (including self) is a notehead.
    pub fn has_notehead(&self) -> bool {
        self.kind == ElementKind::Notehead || self.children.iter().any(ScoreNode::has_notehead)
    }
}

/// Notated pitch attributes the toolkit reports for a note element.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NoteAttributes {
    /// Pitch-class letter (C..B).
    pub pname: char,
    /// Octave number; octave 4 contains middle C.
    pub octave: i32,
}

/// Query seam for notated-pitch attributes, implemented by the rendered
/// score and by test fakes.
pub trait PitchLookup {
    fn note_attributes(&self, id: &ElementId) -> Option<NoteAttributes>;
}

/// The toolkit's rendered output for one score document.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedScore {
    /// Page size in toolkit units.
    pub page: Size,
    /// The rendered element tree, in document order.
    pub root: ScoreNode,
    /// Per-element notated-pitch attributes.
    #[serde(default)]
    pub notes: HashMap<ElementId, NoteAttributes>,
    /// Per-element bounding boxes in toolkit units.
    #[serde(default)]
    pub bounds: HashMap<ElementId, Rect>,
}

impl RenderedScore {
    /// Parse a toolkit output document.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("malformed score document: {}", e))
    }

    /// Load a toolkit output document from disk. Failure here is terminal
    /// for the viewer instance — there is no retry.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read score {}: {}", path.display(), e))?;
        Self::from_json(&text)
    }

    /// Bounding box of an element in toolkit units.
    pub fn element_bounds(&self, id: &ElementId) -> Option<Rect> {
        self.bounds.get(id).copied()
    }
}

impl PitchLookup for RenderedScore {
    fn note_attributes(&self, id: &ElementId) -> Option<NoteAttributes> {
        self.notes.get(id).copied()
    }
}
