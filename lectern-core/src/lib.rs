//! # lectern-core
//!
//! Engine library for the Lectern harmonic walkthrough viewer. Provides the
//! rendered-score model, step partitioning, pitch resolution, overlay
//! layout, the transport state machine, and MIDI port handling —
//! independent of any display layer or host transport.
//!
//! ## Module Overview
//!
//! - [`score`] — `RenderedScore`: the rendering toolkit's output (element
//!   tree, note attributes, bounds), loaded wholesale from JSON
//! - [`partition`] — deterministic document-order grouping of the score
//!   into harmonic steps
//! - [`pitch`] — per-step pitch-code resolution via the toolkit lookup
//! - [`overlay`] — highlight sets, annotation baseline caching, and the
//!   view transform from toolkit units to viewer-local pixels
//! - [`transport`] — `Transport`: the activation/step state machine,
//!   dispatching commands into side-effect lists
//! - [`midi`] — port resolution by name hint, input event parsing, and
//!   CC/note output with bounded note duration
//! - [`config`] — TOML configuration (embedded defaults + user override)
//! - [`options`] — per-viewer query-string configuration

pub mod config;
pub mod midi;
pub mod options;
pub mod overlay;
pub mod partition;
pub mod pitch;
pub mod score;
pub mod transport;
