//! UI 層: axum ルーター、WebSocket / HTTP ハンドラー、グレースフルシャットダウン

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
