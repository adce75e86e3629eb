//! Host-side coordination: which frame is active, and slide resizing.
//!
//! `DeckBridge` is the pure core — no sockets, no toolkit. It computes the
//! message fan-out for every navigation event and relays height reports
//! into deck layout calls. The protocol invariant lives here: after every
//! fan-out, exactly the frames on the visible slide are told to activate
//! and every other frame is told to deactivate, so at most one viewer per
//! slide position ever emits MIDI.

use std::collections::BTreeMap;

use crate::protocol::{FrameId, HostMessage, ViewerMessage};

/// Deck layout operations the bridge drives. Implemented by the embedding
/// presentation host; test doubles record the calls.
pub trait DeckLayout {
    /// Resize the slide element containing a frame.
    fn set_frame_height(&mut self, frame: FrameId, height: f64);
    /// Recompute deck layout after a resize.
    fn refresh(&mut self);
}

/// Host-side activation coordinator.
pub struct DeckBridge {
    /// Registered frames and the slide each is embedded in. Ordered so
    /// fan-outs are deterministic.
    frames: BTreeMap<u64, i32>,
    current_slide: i32,
    resize_padding: f64,
}

impl DeckBridge {
    pub fn new(resize_padding: f64) -> Self {
        Self {
            frames: BTreeMap::new(),
            current_slide: 0,
            resize_padding,
        }
    }

    pub fn current_slide(&self) -> i32 {
        self.current_slide
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Register a frame (from its hello) and return the activation state
    /// it should immediately assume — a late joiner must not wait for the
    /// next navigation event to learn whether it is active.
    pub fn register_frame(&mut self, frame: FrameId, slide_index: i32) -> HostMessage {
        self.frames.insert(frame.0, slide_index);
        self.message_for(slide_index)
    }

    pub fn unregister_frame(&mut self, frame: FrameId) {
        self.frames.remove(&frame.0);
    }

    /// Record a navigation event and compute the full fan-out. This runs
    /// on every event — initial ready, slide change, fragment shown or
    /// hidden — because fragment visibility can change the current slide
    /// without a slide change, and repeats must be safe (every receiver
    /// transition is idempotent).
    pub fn navigate(&mut self, slide: i32) -> Vec<(FrameId, HostMessage)> {
        self.current_slide = slide;
        self.fan_out()
    }

    /// Re-assert the current activation state on all frames.
    pub fn fan_out(&self) -> Vec<(FrameId, HostMessage)> {
        self.frames
            .iter()
            .map(|(&id, &slide)| (FrameId(id), self.message_for(slide)))
            .collect()
    }

    /// Handle a message from a registered frame. Returns a direct reply
    /// for the sender when one is due.
    pub fn on_viewer_message(
        &mut self,
        frame: FrameId,
        msg: ViewerMessage,
        layout: &mut impl DeckLayout,
    ) -> Option<HostMessage> {
        match msg {
            ViewerMessage::Hello { slide_index } => Some(self.register_frame(frame, slide_index)),
            ViewerMessage::Height { height } => {
                if !height.is_finite() || height < 0.0 {
                    log::debug!(target: "bridge", "ignoring bogus height report: {}", height);
                    return None;
                }
                layout.set_frame_height(frame, height + self.resize_padding);
                layout.refresh();
                None
            }
        }
    }

    fn message_for(&self, frame_slide: i32) -> HostMessage {
        if frame_slide == self.current_slide {
            HostMessage::Activate {
                slide_index: self.current_slide,
            }
        } else {
            HostMessage::Deactivate
        }
    }
}
