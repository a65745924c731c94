// src/sync/alerts.rs

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

// Notificações não-bloqueantes para o usuário: falha de gravação e
// transições de conectividade. Nunca derrubam a visão local.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Alert {
    WriteFailed { doc: String, message: String },
    ConnectivityLost,
    ConnectivityRestored,
}

#[derive(Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<Alert>,
}

impl AlertBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn publish(&self, alert: Alert) {
        let _ = self.tx.send(alert);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}
