//! Session event bus.
//!
//! Every observable change to a honeypot session is published as a
//! `SessionEvent` so that renderers can redraw without touching the session.

pub mod bus;

pub use bus::EventBus;
