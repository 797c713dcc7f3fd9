//! `buoysock`: the event socket a swarm actor talks through.
//!
//! One TCP connection, newline-delimited JSON frames (`buoyproto`), and a
//! single io task per socket. Callers issue correlated calls and suspend on
//! a per-call oneshot; the io task routes each reply to exactly one caller
//! by seq. Lifecycle (connect/disconnect) is surfaced as events, never as
//! call errors.

pub mod line;
pub mod socket;

pub use line::JsonReader;
pub use socket::{Socket, SocketError, SocketEvent};
