// src/models/presence.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// "Quem mudou o quê, quando" — efêmero, last-value-wins, serve só para
// notificar os outros clientes. Nunca vira histórico persistido.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub actor_id: String,
    pub actor_label: String,
    pub timestamp: DateTime<Utc>,
    pub changed_field_names: Vec<String>,
}

impl ChangeRecord {
    pub fn new(actor_id: impl Into<String>, actor_label: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_label: actor_label.into(),
            timestamp: Utc::now(),
            changed_field_names: fields,
        }
    }
}

// Quem está fazendo a mudança: a sessão da aba do cliente (header
// x-session-id) e o rótulo vindo do token. Sem header, vale a sessão do
// próprio processo.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub session_id: String,
    pub label: String,
}

// Estado observado da conexão com o meio remoto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Checking,
    Online,
    Offline,
}
