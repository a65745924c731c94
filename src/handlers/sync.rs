// src/handlers/sync.rs

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    Json,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;

use crate::{
    common::error::AppError,
    config::AppState,
    models::contacts::ContactsDocument,
    models::dashboard::DashboardData,
    models::presence::{ActorContext, ChangeRecord, ConnectionState},
    sync::presence::server_session,
    sync::{Alert, PresenceTracker, SyncDocument, SyncedStore},
};

// Mensagens empurradas para o cliente. Snapshots seguem a ordem de entrega do
// meio; presença só sai para quem não é o autor.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerMessage {
    Snapshot { doc: &'static str, data: Value },
    Presence { record: ChangeRecord },
    Alert { #[serde(flatten)] alert: Alert },
    Connection { state: ConnectionState },
}

// Frames aceitos do cliente: o update otimista da aba.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientMessage {
    Update { fields: Map<String, Value> },
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub doc: String,
    // Browsers não mandam Authorization em WebSocket; o token vem na query
    pub token: String,
    pub session: Option<String>,
}

// GET /api/sync/ws?doc=dashboard|contacts&token=...&session=...
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let user = app_state.auth_service.validate_token(&params.token)?;
    let session = params
        .session
        .unwrap_or_else(|| server_session().id.clone());

    match params.doc.as_str() {
        "dashboard" => {
            let store = app_state.dashboard_store.clone();
            Ok(ws.on_upgrade(move |socket| {
                drive_socket::<DashboardData>(socket, store, app_state, user.label, session)
            }))
        }
        "contacts" => {
            let store = app_state.contacts_store.clone();
            Ok(ws.on_upgrade(move |socket| {
                drive_socket::<ContactsDocument>(socket, store, app_state, user.label, session)
            }))
        }
        other => Err(AppError::PayloadInvalid(format!(
            "documento desconhecido: '{other}'"
        ))),
    }
}

// GET /api/sync/status
pub async fn sync_status(State(app_state): State<AppState>) -> Json<Value> {
    Json(json!({
        "state": app_state.monitor.state(),
        "degraded": {
            "dashboard": app_state.dashboard_store.is_degraded(),
            "contacts": app_state.contacts_store.is_degraded(),
        }
    }))
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).unwrap_or_default();
    sender.send(Message::Text(text.into())).await
}

// Uma conexão = um assinante do documento. Snapshot cheio na entrada, depois
// cada atualização na ordem em que o store as entrega; updates recebidos do
// cliente entram pelo mesmo `update` otimista do resto do sistema.
async fn drive_socket<T: SyncDocument>(
    socket: WebSocket,
    store: Arc<SyncedStore<T>>,
    state: AppState,
    label: String,
    session: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let snapshot = store.snapshot().await;
    let Ok(data) = serde_json::to_value(&snapshot) else { return };
    if send_message(&mut sender, &ServerMessage::Snapshot { doc: T::PATH, data })
        .await
        .is_err()
    {
        return;
    }
    let _ = send_message(
        &mut sender,
        &ServerMessage::Connection { state: state.monitor.state() },
    )
    .await;

    let mut updates = store.subscribe();
    let mut alerts = state.alerts.subscribe();
    let mut conn = state.monitor.subscribe();
    let actor = ActorContext {
        session_id: session.clone(),
        label,
    };

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => {
                    let Ok(data) = serde_json::to_value(&update.snapshot) else { continue };
                    if send_message(&mut sender, &ServerMessage::Snapshot { doc: T::PATH, data })
                        .await
                        .is_err()
                    {
                        break;
                    }
                    if PresenceTracker::should_notify(&session, &update.change) {
                        if send_message(&mut sender, &ServerMessage::Presence { record: update.change })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // conexão lenta perdeu intermediários; o snapshot atual basta
                    let snapshot = store.snapshot().await;
                    let Ok(data) = serde_json::to_value(&snapshot) else { continue };
                    if send_message(&mut sender, &ServerMessage::Snapshot { doc: T::PATH, data })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            alert = alerts.recv() => match alert {
                Ok(alert) => {
                    if send_message(&mut sender, &ServerMessage::Alert { alert }).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = conn.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *conn.borrow_and_update();
                if send_message(&mut sender, &ServerMessage::Connection { state: current })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(ClientMessage::Update { fields }) => {
                            if let Err(e) = store.update(fields, &actor).await {
                                tracing::warn!("Update via WebSocket rejeitado: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Frame inesperado no WebSocket: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    }
}
