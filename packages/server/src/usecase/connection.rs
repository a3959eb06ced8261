//! UseCase: WebSocket 接続の開始と終了
//!
//! 接続ごとの送信チャンネルを ChangeNotifier に登録・登録解除します。
//! 切断してもドキュメントやログは削除されません。

use std::sync::Arc;

use crate::domain::{ChangeNotifier, ConnectionId, PusherChannel};

/// 接続開始のユースケース
pub struct OpenConnectionUseCase {
    notifier: Arc<dyn ChangeNotifier>,
}

impl OpenConnectionUseCase {
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { notifier }
    }

    pub async fn execute(&self, connection: ConnectionId, sender: PusherChannel) {
        self.notifier.register_connection(connection, sender).await;
    }
}

/// 接続終了のユースケース
pub struct CloseConnectionUseCase {
    notifier: Arc<dyn ChangeNotifier>,
}

impl CloseConnectionUseCase {
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { notifier }
    }

    /// 接続とその接続の全ての購読を解除
    pub async fn execute(&self, connection: ConnectionId) {
        self.notifier.unregister_connection(connection).await;
    }
}
