//! Shared building blocks for the Tandem server and client.
//!
//! - `logger`: tracing subscriber setup used by both binaries
//! - `time`: clock abstraction and store-side timestamp issuing
//! - `protocol`: JSON frames exchanged over the store WebSocket

pub mod logger;
pub mod protocol;
pub mod time;
