//! Tandem shared session document store.
//!
//! Hosts one shared session document per pairing key plus the append-only
//! segment log, and pushes every change to the WebSocket subscribers of that
//! key.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
