//! # lectern-bridge
//!
//! The cross-context synchronization protocol between a slide-deck host
//! and its embedded score viewers. Contexts share no memory — only JSON
//! message payloads cross the boundary, and each side owns its state
//! exclusively.
//!
//! - [`protocol`] — closed tagged-variant message types for both
//!   directions
//! - [`codec`] — JSON encoding, defensive decoding, and length-prefixed
//!   stream framing
//! - [`deck`] — host-side coordination: exclusive activation across
//!   frames and height-to-resize relay
//! - [`server`] — host-side socket wiring for [`deck`]
//! - [`viewer`] — viewer-side endpoint connecting to the host

pub mod codec;
pub mod deck;
pub mod protocol;
pub mod server;
pub mod viewer;
