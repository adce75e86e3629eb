//! # lectern-types
//!
//! Shared type definitions for the Lectern score walkthrough ecosystem.
//! This crate contains data structures used across lectern-core,
//! lectern-bridge, and the viewer binary.

mod analysis;
mod geom;
mod music;
mod session;
mod step;

pub use analysis::{AnalysisDoc, AnalysisEntry};
pub use geom::{Point, Rect, Size};
pub use music::{pitch_class, pitch_code};
pub use session::SessionState;
pub use step::{step_at, Step};

/// Identifier of an element in the rendered score tree.
///
/// Element ids are opaque strings assigned by the rendering toolkit; Lectern
/// only ever compares them and passes them back to toolkit lookups.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
