//! 変更通知の実装
//!
//! - `websocket`: WebSocket 接続の sender を使った実装

pub mod websocket;

pub use websocket::WebSocketChangeNotifier;
