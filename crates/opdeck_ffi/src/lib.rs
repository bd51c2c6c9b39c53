//! Presentation-facing bindings for the OpDeck host.

pub mod api;
