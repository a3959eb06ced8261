//! Repository 実装
//!
//! - `inmemory`: HashMap / Vec をストレージとして使う実装

pub mod inmemory;

pub use inmemory::{InMemorySegmentRecordRepository, InMemorySessionDocumentRepository};
