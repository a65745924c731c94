// src/sync/presence.rs

use std::sync::OnceLock;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::presence::ChangeRecord;

// Identidade desta réplica. Criada uma vez no início do processo, somente
// leitura depois, nunca persistida.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub label: String,
}

static SERVER_SESSION: OnceLock<SessionInfo> = OnceLock::new();

pub fn server_session() -> &'static SessionInfo {
    SERVER_SESSION.get_or_init(|| SessionInfo {
        id: Uuid::new_v4().to_string(),
        label: "Servidor".to_string(),
    })
}

// Propaga os ChangeRecords que acompanham cada atualização. A decisão de
// notificar é do assinante: só avisa quando o autor é outra sessão.
#[derive(Clone)]
pub struct PresenceTracker {
    own_id: String,
    tx: broadcast::Sender<ChangeRecord>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            own_id: server_session().id.clone(),
            tx,
        }
    }

    pub fn own_id(&self) -> &str {
        &self.own_id
    }

    pub fn publish(&self, record: ChangeRecord) {
        // Sem assinantes não é erro
        let _ = self.tx.send(record);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.tx.subscribe()
    }

    // Evita a auto-notificação: quem fez a mudança não recebe o aviso.
    pub fn should_notify(viewer_session: &str, record: &ChangeRecord) -> bool {
        record.actor_id != viewer_session
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessao_do_processo_e_estavel() {
        let a = server_session().id.clone();
        let b = server_session().id.clone();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn nao_notifica_o_proprio_autor() {
        let record = ChangeRecord::new("sessao-1", "Ana", vec!["contacts".to_string()]);
        assert!(!PresenceTracker::should_notify("sessao-1", &record));
        assert!(PresenceTracker::should_notify("sessao-2", &record));
    }

    #[tokio::test]
    async fn publica_para_assinantes() {
        let tracker = PresenceTracker::new();
        let mut rx = tracker.subscribe();
        tracker.publish(ChangeRecord::new("s", "Ana", vec!["indicators".to_string()]));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.actor_label, "Ana");
        assert_eq!(got.changed_field_names, vec!["indicators".to_string()]);
    }
}
