//! Per-viewer session state (local, never shared across contexts).

/// The mutable state owned by one viewer instance.
///
/// One value per viewer, passed to and mutated only by the transport state
/// machine — the explicit replacement for ambient per-viewer globals.
/// Dropped with the viewer; nothing persists across reloads.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Number of partitioned steps (0 until the score is processed).
    pub step_count: usize,
    /// Currently selected step, 1-based; 0 means no step highlighted.
    pub current_step: usize,
    /// Whether this viewer is the one authorized to emit MIDI.
    pub is_active: bool,
    /// Slide index reported by the host on activation.
    pub slide_index: i32,
    /// Shared vertical coordinate for annotation overlays, in viewer-local
    /// pixels. `None` until first computed, and again after any resize.
    pub baseline_y: Option<f64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}
