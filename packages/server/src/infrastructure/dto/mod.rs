//! Data Transfer Objects (DTOs) for the store.
//!
//! The WebSocket frames live in `tandem_shared::protocol`; this module adds:
//! - `conversion`: protocol DTO <-> domain entity conversion
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
