//! Tandem client: a focus timer shared by exactly two participants.
//!
//! Each participant runs a local one-second countdown and mirrors a shared
//! session document held by the store. Writes are last-writer-wins; a client
//! never lets the echo of its own write overwrite what it already shows.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
