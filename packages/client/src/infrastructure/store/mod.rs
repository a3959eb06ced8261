//! RemoteStore 実装
//!
//! - `memory`: プロセス内で完結する実装（テスト・単一プロセスのデモ用）
//! - `websocket`: tandem-server と WebSocket で通信する実装

mod conversion;
pub mod memory;
pub mod websocket;

pub use memory::{InMemoryRemoteStore, StoreOperation};
pub use websocket::WebSocketRemoteStore;
