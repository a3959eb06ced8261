//! WebSocket connection handler.
//!
//! 1 つの接続につき 2 つのタスクを動かします。
//!
//! - 受信タスク: `ClientFrame` をパースしてユースケースに振り分け、返信を outbox に積む
//! - 送信タスク: outbox（返信と変更通知が同じ順序で並ぶ）を WebSocket に書き出す

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tandem_shared::protocol::{ClientFrame, ErrorCode, ReplyDto, ServerFrame};
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, DocumentFields, DocumentKey, DocumentPatch, NewSegmentRecord, PusherChannel,
        SubscriptionId,
    },
    ui::state::AppState,
    usecase::WriteDocumentError,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that drains the outbox into the WebSocket sink.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = state.next_connection_id();
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .open_connection_usecase
        .execute(connection, tx.clone())
        .await;
    tracing::info!("Connection {} opened", connection.value());

    let (sender, mut receiver) = socket.split();
    let state_clone = state.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on connection {}: {}", connection.value(), e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(&state_clone, connection, &tx, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::info!("Connection {} requested close", connection.value());
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.close_connection_usecase.execute(connection).await;
    tracing::info!("Connection {} closed", connection.value());
}

async fn handle_text(state: &AppState, connection: ConnectionId, outbox: &PusherChannel, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Malformed frame on connection {}: {}", connection.value(), e);
            // requestId が読み取れる場合だけ失敗を返信する
            if let Some(request_id) = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|value| value.get("requestId").and_then(serde_json::Value::as_u64))
            {
                push(
                    outbox,
                    ServerFrame::failed(request_id, ErrorCode::Invalid, e.to_string()),
                );
            }
            return;
        }
    };

    match frame {
        ClientFrame::CreateDocument {
            request_id,
            key,
            document,
        } => {
            let parsed = DocumentKey::new(key)
                .and_then(|key| Ok((key, DocumentFields::try_from(document)?)));
            let result = match parsed {
                Ok((key, fields)) => ReplyDto::Created {
                    created: state.create_document_usecase.execute(key, fields).await,
                },
                Err(e) => invalid(e),
            };
            reply(outbox, request_id, result);
        }
        ClientFrame::PatchDocument {
            request_id,
            key,
            patch,
        } => {
            let parsed =
                DocumentKey::new(key).and_then(|key| Ok((key, DocumentPatch::try_from(patch)?)));
            let result = match parsed {
                Ok((key, patch)) => match state.patch_document_usecase.execute(key, patch).await {
                    Ok(_) => ReplyDto::Ack,
                    Err(e @ WriteDocumentError::NotFound(_)) => ReplyDto::Failed {
                        code: ErrorCode::NotFound,
                        message: e.to_string(),
                    },
                },
                Err(e) => invalid(e),
            };
            reply(outbox, request_id, result);
        }
        ClientFrame::GetDocument { request_id, key } => {
            let result = match DocumentKey::new(key) {
                Ok(key) => ReplyDto::Document {
                    document: state
                        .get_document_usecase
                        .execute(&key)
                        .await
                        .map(Into::into),
                },
                Err(e) => invalid(e),
            };
            reply(outbox, request_id, result);
        }
        ClientFrame::AppendRecord { request_id, record } => {
            let result = match NewSegmentRecord::try_from(record) {
                Ok(record) => ReplyDto::RecordAppended {
                    id: state
                        .append_record_usecase
                        .execute(record)
                        .await
                        .id
                        .into_string(),
                },
                Err(e) => invalid(e),
            };
            reply(outbox, request_id, result);
        }
        ClientFrame::SubscribeDocument { request_id, key } => match DocumentKey::new(key) {
            Ok(key) => {
                let subscription = SubscriptionId::new(request_id);
                // 返信を先に積み、その後スナップショットを配信する
                reply(
                    outbox,
                    request_id,
                    ReplyDto::Subscribed {
                        subscription_id: request_id,
                    },
                );
                if let Err(e) = state
                    .subscribe_document_usecase
                    .execute(connection, subscription, key)
                    .await
                {
                    tracing::warn!("Failed to subscribe document: {}", e);
                }
            }
            Err(e) => reply(outbox, request_id, invalid(e)),
        },
        ClientFrame::SubscribeRecords { request_id, key } => match DocumentKey::new(key) {
            Ok(key) => {
                let subscription = SubscriptionId::new(request_id);
                reply(
                    outbox,
                    request_id,
                    ReplyDto::Subscribed {
                        subscription_id: request_id,
                    },
                );
                if let Err(e) = state
                    .subscribe_records_usecase
                    .execute(connection, subscription, key)
                    .await
                {
                    tracing::warn!("Failed to subscribe records: {}", e);
                }
            }
            Err(e) => reply(outbox, request_id, invalid(e)),
        },
        ClientFrame::Unsubscribe { subscription_id } => {
            state
                .unsubscribe_usecase
                .execute(connection, SubscriptionId::new(subscription_id))
                .await;
        }
    }
}

fn invalid(error: impl std::fmt::Display) -> ReplyDto {
    ReplyDto::Failed {
        code: ErrorCode::Invalid,
        message: error.to_string(),
    }
}

fn reply(outbox: &PusherChannel, request_id: u64, result: ReplyDto) {
    push(outbox, ServerFrame::Reply { request_id, result });
}

fn push(outbox: &PusherChannel, frame: ServerFrame) {
    match serde_json::to_string(&frame) {
        Ok(json) => {
            if outbox.send(json).is_err() {
                tracing::debug!("Outbox closed, dropping frame");
            }
        }
        Err(e) => tracing::error!("Failed to serialize frame: {}", e),
    }
}
