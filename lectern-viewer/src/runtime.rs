//! The viewer event loop: host messages in, MIDI in/out, highlight and
//! overlay updates.

use std::time::Instant;

use lectern_bridge::protocol::HostMessage;
use lectern_bridge::viewer::ViewerEndpoint;
use lectern_core::config::Config;
use lectern_core::midi::{MidiEvent, MidiEventKind, MidiInputManager, MidiOutputManager};
use lectern_core::options::ViewerOptions;
use lectern_core::overlay::{
    highlight_for, HighlightSink, OverlayLayout, ScoreLayout, ViewTransform, Zoom,
};
use lectern_core::transport::{Effect, OutputCcs, Transport, TransportCommand};
use lectern_types::{AnalysisDoc, ElementId, Point, Size};

use crate::session::ViewerSession;

/// Map a wire message onto a transport command.
pub fn host_to_command(msg: HostMessage) -> TransportCommand {
    match msg {
        HostMessage::Activate { slide_index } => TransportCommand::Activate { slide_index },
        HostMessage::Deactivate => TransportCommand::Deactivate,
        HostMessage::RequestStepCount => TransportCommand::ResendStepCount,
        HostMessage::SlideVisible { slide_index } => TransportCommand::SlideVisible { slide_index },
    }
}

/// Highlight sink that narrates to the log — the debug affordance when no
/// display layer is attached.
#[derive(Default)]
pub struct LogSink;

impl HighlightSink for LogSink {
    fn clear_marks(&mut self) {
        log::debug!(target: "highlight", "clear");
    }

    fn mark(&mut self, elements: &[ElementId]) {
        log::debug!(target: "highlight", "mark {:?}", elements);
    }

    fn show_overlay(&mut self, pos: lectern_core::overlay::OverlayPos, primary: &str, secondary: &str) {
        log::debug!(
            target: "highlight",
            "overlay '{}'/'{}' at x={:.1} y={:.1}",
            primary,
            secondary,
            pos.center_x,
            pos.baseline_y
        );
    }

    fn hide_overlay(&mut self) {
        log::debug!(target: "highlight", "overlay hidden");
    }
}

/// One viewer's running state: the transport state machine plus the I/O
/// it drives.
pub struct ViewerRuntime<S: HighlightSink> {
    transport: Transport,
    overlay: OverlayLayout,
    session: ViewerSession,
    sink: S,
    midi_in: MidiInputManager,
    midi_out: MidiOutputManager,
    endpoint: Option<ViewerEndpoint>,
    zoom: Zoom,
    viewport: Size,
    container_origin: Point,
    cc_step_select: u8,
    fit_margin: f64,
}

impl<S: HighlightSink> ViewerRuntime<S> {
    /// Wire up a runtime. MIDI ports are resolved once, here; absence of
    /// a match leaves the corresponding direction unbound and the viewer
    /// fully functional visually.
    pub fn new(
        session: ViewerSession,
        options: &ViewerOptions,
        config: &Config,
        endpoint: Option<ViewerEndpoint>,
        viewport: Size,
        sink: S,
    ) -> Self {
        let mut midi_in = MidiInputManager::new();
        let input_hint = options.midi_in.as_deref().unwrap_or(config.input_hint());
        if let Err(e) = midi_in.connect_by_hint(input_hint) {
            log::warn!(target: "midi", "MIDI input unavailable: {}", e);
        }

        let mut midi_out = MidiOutputManager::new(
            options.channel.unwrap_or(config.channel()),
            options.velocity.unwrap_or(config.velocity()),
            options
                .note_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or(config.note_duration()),
        );
        let output_hint = options.midi_out.as_deref().unwrap_or(config.output_hint());
        if let Err(e) = midi_out.connect_by_hint(output_hint) {
            log::warn!(target: "midi", "MIDI output unavailable: {}", e);
        }

        let standalone = endpoint.is_none();
        let mut transport = Transport::new(
            standalone,
            OutputCcs {
                step_count: options.cc_count.unwrap_or(config.cc_step_count()),
                slide_index: options.cc_slide.unwrap_or(config.cc_slide_index()),
            },
        );
        let effects = transport.set_steps(session.steps.clone());

        let mut runtime = Self {
            transport,
            overlay: OverlayLayout::new(config.baseline_pad()),
            session,
            sink,
            midi_in,
            midi_out,
            endpoint,
            zoom: options.zoom,
            viewport,
            container_origin: Point::default(),
            cc_step_select: options.cc_step.unwrap_or(config.cc_step_select()),
            fit_margin: config.fit_margin(),
        };
        runtime.apply_effects(effects);
        runtime
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.endpoint.as_ref().map(ViewerEndpoint::is_closed).unwrap_or(false)
    }

    /// One event-loop iteration: drain the host endpoint, drain the MIDI
    /// input, release due note-offs.
    pub fn tick(&mut self, now: Instant) {
        let host_messages = match self.endpoint.as_mut() {
            Some(endpoint) => endpoint.poll_messages(),
            None => Vec::new(),
        };
        for msg in host_messages {
            self.handle_host_message(msg);
        }

        let midi_events = self.midi_in.poll_events();
        for event in midi_events {
            self.handle_midi_event(&event);
        }

        self.midi_out.tick(now);
    }

    pub fn handle_host_message(&mut self, msg: HostMessage) {
        let effects = self.transport.handle(host_to_command(msg));
        self.apply_effects(effects);
    }

    /// Controller input: the configured CC selects a step (0 clears).
    /// Everything else on the wire is ignored.
    pub fn handle_midi_event(&mut self, event: &MidiEvent) {
        if let MidiEventKind::ControlChange {
            controller, value, ..
        } = event.kind
        {
            if controller == self.cc_step_select {
                let effects = self
                    .transport
                    .handle(TransportCommand::SelectStep(value as i64));
                self.apply_effects(effects);
            }
        }
    }

    /// Local (debug) step selection, usable with or without MIDI.
    pub fn select_step(&mut self, n: i64) {
        let effects = self.transport.handle(TransportCommand::SelectStep(n));
        self.apply_effects(effects);
    }

    /// Viewport change: layout-derived state is stale from here on.
    pub fn handle_resize(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.overlay.invalidate();
        let effects = self.transport.handle(TransportCommand::Resize);
        self.apply_effects(effects);
    }

    fn transform(&self) -> ViewTransform {
        ViewTransform::for_zoom(
            self.zoom,
            self.session.score.page,
            self.viewport.width,
            self.fit_margin,
        )
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SendCc { controller, value } => {
                    self.midi_out.send_cc(controller, value);
                }
                Effect::PlayStep { pitches } => {
                    self.midi_out.play_step(&pitches, Instant::now());
                }
                Effect::AllNotesOff => {
                    self.midi_out.all_notes_off();
                }
                Effect::Highlight { step } => {
                    self.apply_highlight(step);
                }
                Effect::ReportHeight => {
                    self.report_height();
                }
            }
        }
    }

    fn apply_highlight(&mut self, step: usize) {
        self.sink.clear_marks();

        let elements: Vec<ElementId> =
            highlight_for(&self.session.steps, step).to_vec();
        if !elements.is_empty() {
            self.sink.mark(&elements);
        }

        let transform = self.transform();
        let probe = ScoreLayout::new(&self.session.score, transform, self.container_origin);
        let pos = self
            .overlay
            .position_for(&self.session.steps, step, &probe);

        match (pos, entry_for(&self.session.analysis, step)) {
            (Some(pos), Some((primary, secondary))) => {
                self.sink.show_overlay(pos, &primary, &secondary);
            }
            _ => self.sink.hide_overlay(),
        }
        if let Some(pos) = pos {
            self.transport.note_baseline(pos.baseline_y);
        }
    }

    fn report_height(&mut self) {
        let height = self.transform().content_height(self.session.score.page);
        match self.endpoint.as_mut() {
            Some(endpoint) => {
                if let Err(e) = endpoint.send_height(height) {
                    log::warn!("height report failed: {}", e);
                }
            }
            None => log::debug!("standalone: content height {:.1}", height),
        }
    }
}

/// Labels for a step, when its analysis entry exists. A missing entry
/// suppresses the overlay for that step.
fn entry_for(analysis: &Option<AnalysisDoc>, step: usize) -> Option<(String, String)> {
    let doc = analysis.as_ref()?;
    let entry = doc.entry_for(step)?;
    Some((entry.primary.clone(), entry.secondary.clone()))
}
