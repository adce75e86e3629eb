//! The activation/transport state machine.
//!
//! Commands are dispatched against an owned [`SessionState`] and return a
//! list of [`Effect`]s; the runtime applies them to the MIDI output, the
//! highlight sink, and the host endpoint. The machine itself never touches
//! I/O, so every transition is synchronous, deterministic, and safe to
//! re-deliver.
//!
//! Gating invariant: no viewer other than the active one ever sounds a
//! note. The deck delivers controller messages to every embedded viewer,
//! so the gate here is mandatory, not incidental.

use lectern_types::{step_at, SessionState, Step};

/// Commands the state machine reacts to, whether they originate from the
/// host endpoint, the MIDI input, or local debug controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Host made this viewer the active one for the given slide.
    Activate { slide_index: i32 },
    /// Host demoted this viewer.
    Deactivate,
    /// Select a step (0 clears). Out-of-range values are clamped.
    SelectStep(i64),
    /// Re-emit the last known step count.
    ResendStepCount,
    /// Alternate-protocol visibility notification: activate, re-announce,
    /// re-assert the highlight, and report height.
    SlideVisible { slide_index: Option<i32> },
    /// The viewport was resized; layout-derived state is stale.
    Resize,
}

/// Side effects requested by a transition, applied by the runtime in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit a Control Change on the configured channel. The value is
    /// already clamped to 0..=127.
    SendCc { controller: u8, value: u8 },
    /// Sound the pitches of the selected step (note-ons now, note-offs
    /// after the configured duration). An empty set silences only.
    PlayStep { pitches: Vec<u8> },
    /// Emit all-notes-off and cancel any pending note-offs.
    AllNotesOff,
    /// Re-render highlight marks and overlay for the given step index
    /// (0 clears both).
    Highlight { step: usize },
    /// Measure the rendered height and report it to the host.
    ReportHeight,
}

/// Controller numbers for outbound notifications.
#[derive(Debug, Clone, Copy)]
pub struct OutputCcs {
    pub step_count: u8,
    pub slide_index: u8,
}

/// The per-viewer transport state machine.
pub struct Transport {
    state: SessionState,
    ccs: OutputCcs,
    /// Standalone viewers (no host present) are permanently active; there
    /// is no deactivation path for them.
    standalone: bool,
    steps: Vec<Step>,
}

impl Transport {
    pub fn new(standalone: bool, ccs: OutputCcs) -> Self {
        let mut state = SessionState::new();
        state.is_active = standalone;
        Self {
            state,
            ccs,
            standalone,
            steps: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Record the lazily computed overlay baseline so the session state
    /// mirrors what is on screen. Cleared again by [`TransportCommand::Resize`].
    pub fn note_baseline(&mut self, y: f64) {
        self.state.baseline_y = Some(y);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Install the partitioned steps after a score load and announce the
    /// count (when allowed to emit).
    pub fn set_steps(&mut self, steps: Vec<Step>) -> Vec<Effect> {
        self.state.step_count = steps.len();
        self.steps = steps;
        if self.state.current_step > self.state.step_count {
            self.state.current_step = self.state.step_count;
        }
        let mut effects = Vec::new();
        if self.state.is_active {
            effects.push(self.step_count_cc());
        }
        effects
    }

    pub fn handle(&mut self, cmd: TransportCommand) -> Vec<Effect> {
        match cmd {
            TransportCommand::Activate { slide_index } => self.activate(Some(slide_index)),
            TransportCommand::SlideVisible { slide_index } => self.activate(slide_index),
            TransportCommand::Deactivate => self.deactivate(),
            TransportCommand::SelectStep(n) => self.select_step(n),
            TransportCommand::ResendStepCount => self.resend_step_count(),
            TransportCommand::Resize => self.resize(),
        }
    }

    /// Activation is idempotent: re-activating an already-active viewer
    /// just re-asserts the announcements and the current step's output.
    fn activate(&mut self, slide_index: Option<i32>) -> Vec<Effect> {
        self.state.is_active = true;
        if let Some(slide) = slide_index {
            self.state.slide_index = slide;
        }

        let mut effects = vec![
            self.step_count_cc(),
            Effect::SendCc {
                controller: self.ccs.slide_index,
                value: clamp_7bit(self.state.slide_index as i64),
            },
            Effect::Highlight {
                step: self.state.current_step,
            },
        ];
        effects.push(self.note_output_for_current());
        effects.push(Effect::ReportHeight);
        effects
    }

    /// Re-entrant: deactivating an already-inactive viewer is a no-op with
    /// no duplicate side effects. Standalone viewers ignore deactivation.
    fn deactivate(&mut self) -> Vec<Effect> {
        if self.standalone {
            log::debug!(target: "transport", "ignoring deactivate in standalone mode");
            return Vec::new();
        }
        if !self.state.is_active {
            return Vec::new();
        }
        self.state.is_active = false;
        vec![Effect::AllNotesOff]
    }

    fn select_step(&mut self, n: i64) -> Vec<Effect> {
        let clamped = n.clamp(0, self.state.step_count as i64) as usize;
        self.state.current_step = clamped;

        // Highlight always updates, even while inactive, so a viewer keeps
        // local visibility; only MIDI emission is gated on activation.
        vec![
            Effect::Highlight { step: clamped },
            self.note_output_for_current(),
        ]
    }

    /// Lets the host recover from a dropped step-count notification
    /// without forcing a highlight reset. No state change.
    fn resend_step_count(&mut self) -> Vec<Effect> {
        if !self.state.is_active {
            return Vec::new();
        }
        vec![self.step_count_cc()]
    }

    /// Safe at any time, including before steps are computed. The runtime
    /// invalidates the overlay baseline before applying these effects.
    fn resize(&mut self) -> Vec<Effect> {
        self.state.baseline_y = None;
        vec![
            Effect::Highlight {
                step: self.state.current_step,
            },
            Effect::ReportHeight,
        ]
    }

    fn step_count_cc(&self) -> Effect {
        Effect::SendCc {
            controller: self.ccs.step_count,
            value: clamp_7bit(self.state.step_count as i64),
        }
    }

    /// Notes for the current step when this viewer may sound them;
    /// all-notes-off otherwise — including for a raw controller message
    /// received while inactive.
    fn note_output_for_current(&self) -> Effect {
        let step = self.state.current_step;
        if self.state.is_active && step > 0 {
            let pitches = step_at(&self.steps, step)
                .map(|s| s.pitches.clone())
                .unwrap_or_default();
            Effect::PlayStep { pitches }
        } else {
            Effect::AllNotesOff
        }
    }
}

/// Clamp an outbound numeric value into the 7-bit MIDI data range.
pub fn clamp_7bit(value: i64) -> u8 {
    value.clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const CCS: OutputCcs = OutputCcs {
        step_count: 23,
        slide_index: 24,
    };

    fn three_chords() -> Vec<Step> {
        let mut s1 = Step::new(vec!["n1".into(), "n2".into(), "n3".into()]);
        s1.pitches = vec![60, 64, 67];
        let mut s2 = Step::new(vec!["n4".into(), "n5".into(), "n6".into()]);
        s2.pitches = vec![62, 65, 69];
        let mut s3 = Step::new(vec!["n7".into(), "n8".into(), "n9".into()]);
        s3.pitches = vec![60, 64, 67];
        vec![s1, s2, s3]
    }

    fn embedded_with_steps() -> Transport {
        let mut t = Transport::new(false, CCS);
        t.set_steps(three_chords());
        t
    }

    fn has_note_on(effects: &[Effect]) -> bool {
        effects
            .iter()
            .any(|e| matches!(e, Effect::PlayStep { pitches } if !pitches.is_empty()))
    }

    #[test]
    fn test_embedded_viewer_starts_inactive() {
        let t = Transport::new(false, CCS);
        assert!(!t.state().is_active);
        let s = Transport::new(true, CCS);
        assert!(s.state().is_active);
    }

    #[test]
    fn test_select_step_gated_while_inactive() {
        let mut t = embedded_with_steps();
        let effects = t.handle(TransportCommand::SelectStep(2));

        // Local highlight still updates; no note-on may be emitted.
        assert!(effects.contains(&Effect::Highlight { step: 2 }));
        assert!(!has_note_on(&effects));
        assert!(effects.contains(&Effect::AllNotesOff));
        assert_eq!(t.state().current_step, 2);
    }

    #[test]
    fn test_select_step_emits_notes_while_active() {
        let mut t = embedded_with_steps();
        t.handle(TransportCommand::Activate { slide_index: 0 });
        let effects = t.handle(TransportCommand::SelectStep(2));

        assert!(effects.contains(&Effect::Highlight { step: 2 }));
        assert!(effects.contains(&Effect::PlayStep {
            pitches: vec![62, 65, 69]
        }));
    }

    #[test]
    fn test_select_step_clamps() {
        let mut t = embedded_with_steps();
        t.handle(TransportCommand::SelectStep(-5));
        assert_eq!(t.state().current_step, 0);
        t.handle(TransportCommand::SelectStep(99));
        assert_eq!(t.state().current_step, 3);
    }

    #[test]
    fn test_step_zero_silences() {
        let mut t = embedded_with_steps();
        t.handle(TransportCommand::Activate { slide_index: 0 });
        let effects = t.handle(TransportCommand::SelectStep(0));
        assert!(effects.contains(&Effect::Highlight { step: 0 }));
        assert!(effects.contains(&Effect::AllNotesOff));
        assert!(!has_note_on(&effects));
    }

    #[test]
    fn test_activate_announces_and_resumes() {
        let mut t = embedded_with_steps();
        t.handle(TransportCommand::SelectStep(2));
        let effects = t.handle(TransportCommand::Activate { slide_index: 1 });

        assert!(effects.contains(&Effect::SendCc {
            controller: 23,
            value: 3
        }));
        assert!(effects.contains(&Effect::SendCc {
            controller: 24,
            value: 1
        }));
        // The previously selected step's output resumes on activation.
        assert!(effects.contains(&Effect::PlayStep {
            pitches: vec![62, 65, 69]
        }));
        assert!(effects.contains(&Effect::ReportHeight));
    }

    #[test]
    fn test_reactivation_is_idempotent() {
        let mut t = embedded_with_steps();
        let first = t.handle(TransportCommand::Activate { slide_index: 1 });
        let second = t.handle(TransportCommand::Activate { slide_index: 1 });
        assert_eq!(first, second);
        assert!(t.state().is_active);
    }

    #[test]
    fn test_deactivate_idempotent_single_all_notes_off() {
        let mut t = embedded_with_steps();
        t.handle(TransportCommand::Activate { slide_index: 0 });

        let first = t.handle(TransportCommand::Deactivate);
        assert_eq!(first, vec![Effect::AllNotesOff]);

        let second = t.handle(TransportCommand::Deactivate);
        assert!(second.is_empty());
        assert!(!t.state().is_active);
    }

    #[test]
    fn test_standalone_never_deactivates() {
        let mut t = Transport::new(true, CCS);
        t.set_steps(three_chords());
        let effects = t.handle(TransportCommand::Deactivate);
        assert!(effects.is_empty());
        assert!(t.state().is_active);
    }

    #[test]
    fn test_resend_step_count_gated_and_stateless() {
        let mut t = embedded_with_steps();
        assert!(t.handle(TransportCommand::ResendStepCount).is_empty());

        t.handle(TransportCommand::Activate { slide_index: 0 });
        t.handle(TransportCommand::SelectStep(1));
        let before = t.state().current_step;
        let effects = t.handle(TransportCommand::ResendStepCount);
        assert_eq!(
            effects,
            vec![Effect::SendCc {
                controller: 23,
                value: 3
            }]
        );
        assert_eq!(t.state().current_step, before);
    }

    #[test]
    fn test_resize_safe_before_steps() {
        let mut t = Transport::new(false, CCS);
        let effects = t.handle(TransportCommand::Resize);
        assert!(effects.contains(&Effect::Highlight { step: 0 }));
        assert!(effects.contains(&Effect::ReportHeight));
    }

    #[test]
    fn test_slide_visible_keeps_slide_when_absent() {
        let mut t = embedded_with_steps();
        t.handle(TransportCommand::Activate { slide_index: 3 });
        t.handle(TransportCommand::SlideVisible { slide_index: None });
        assert_eq!(t.state().slide_index, 3);
        assert!(t.state().is_active);
    }

    #[test]
    fn test_step_count_clamped_to_7bit() {
        let mut t = Transport::new(true, CCS);
        let steps = (0..200)
            .map(|i| {
                let mut s = Step::new(vec![lectern_types::ElementId::new(format!("n{}", i))]);
                s.pitches = vec![60];
                s
            })
            .collect();
        let effects = t.set_steps(steps);
        assert!(effects.contains(&Effect::SendCc {
            controller: 23,
            value: 127
        }));
    }
}
