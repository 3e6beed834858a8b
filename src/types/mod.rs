//! Core types for Tether.

pub mod message;

pub use message::*;
