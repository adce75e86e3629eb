//! Message types for deck ⇄ viewer synchronization.
//!
//! Every message is a JSON object tagged by `type`. Both enums are closed:
//! payload shape is validated on decode and anything unknown or malformed
//! is dropped before it can reach a state machine — a misbehaving host or
//! sibling viewer must never take down another viewer's session.

use serde::{Deserialize, Serialize};

/// Unique identifier for an embedded viewer frame, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl FrameId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Messages sent from the deck host to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    /// This viewer is now the active one for the given slide.
    #[serde(rename = "harmony-activate")]
    Activate {
        #[serde(rename = "slideIndex")]
        slide_index: i32,
    },
    /// This viewer is no longer active.
    #[serde(rename = "harmony-deactivate")]
    Deactivate,
    /// Re-send the step-count notification (recovery after a drop).
    #[serde(rename = "harmony-request-step-count")]
    RequestStepCount,
    /// Alternate-protocol visibility notification.
    #[serde(rename = "reveal-slide-visible")]
    SlideVisible {
        #[serde(rename = "slideIndex", default, skip_serializing_if = "Option::is_none")]
        slide_index: Option<i32>,
    },
}

/// Messages sent from a viewer to the deck host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewerMessage {
    /// Registers the frame and the slide it is embedded in. (The browser
    /// original derived this from DOM containment; over a socket it must
    /// be stated.)
    #[serde(rename = "viewer-hello")]
    Hello {
        #[serde(rename = "slideIndex")]
        slide_index: i32,
    },
    /// Measured content height; the host resizes the containing slide.
    /// `harmony-resize` is the older wire name for the same payload.
    #[serde(rename = "viewer-height", alias = "harmony-resize")]
    Height { height: f64 },
}
