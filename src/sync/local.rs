// src/sync/local.rs

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};

use crate::common::error::AppError;
use crate::sync::backend::{BackendEvent, DocumentBackend, WriteMeta};

// A variante simples: armazenamento local do dispositivo. Cada documento vive
// serializado em um arquivo JSON sob uma chave fixa (o path), com contrato de
// leitura/escrita síncronas — o equivalente do localStorage do frontend. O
// fan-out entre os stores do mesmo processo usa um canal broadcast, fazendo o
// papel do BroadcastChannel entre abas.
pub struct LocalStorageBackend {
    dir: PathBuf,
    // Serializa o read-modify-write do merge parcial entre tasks
    io_lock: std::sync::Mutex<()>,
    events: broadcast::Sender<BackendEvent>,
    connected: watch::Sender<bool>,
}

impl LocalStorageBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let (events, _) = broadcast::channel(256);
        // Armazenamento local nunca fica "offline"
        let (connected, _) = watch::channel(true);
        Ok(Self {
            dir,
            io_lock: std::sync::Mutex::new(()),
            events,
            connected,
        })
    }

    fn file_for(&self, path: &str) -> PathBuf {
        // Os paths são constantes do domínio ("dashboard", "contacts");
        // o replace segura qualquer separador que apareça no futuro
        self.dir.join(format!("{}.json", path.replace('/', "_")))
    }

    fn read_current(&self, path: &str) -> Result<Option<Value>, AppError> {
        let file = self.file_for(path);
        let raw = match fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Arquivo corrompido não pode derrubar o processo: vale o default
                tracing::warn!("Documento local '{}' ilegível ({}), ignorando", path, e);
                Ok(None)
            }
        }
    }

    fn persist(&self, path: &str, body: &Value) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(body)
            .map_err(|e| AppError::PayloadInvalid(e.to_string()))?;
        fs::write(self.file_for(path), raw)?;
        Ok(())
    }

    fn fan_out(&self, path: &str, body: Value, meta: &WriteMeta) {
        let _ = self.events.send(BackendEvent {
            path: path.to_string(),
            body,
            origin: meta.origin.clone(),
            change: meta.change.clone(),
        });
    }
}

#[async_trait]
impl DocumentBackend for LocalStorageBackend {
    async fn read(&self, path: &str) -> Result<Option<Value>, AppError> {
        let _guard = self.io_lock.lock().unwrap();
        self.read_current(path)
    }

    async fn write(&self, path: &str, body: &Value, meta: &WriteMeta) -> Result<(), AppError> {
        let _guard = self.io_lock.lock().unwrap();
        self.persist(path, body)?;
        self.fan_out(path, body.clone(), meta);
        Ok(())
    }

    async fn write_partial(
        &self,
        path: &str,
        fields: &Map<String, Value>,
        meta: &WriteMeta,
    ) -> Result<(), AppError> {
        let _guard = self.io_lock.lock().unwrap();
        let mut body = match self.read_current(path)? {
            Some(Value::Object(obj)) => obj,
            _ => Map::new(),
        };
        for (key, value) in fields {
            body.insert(key.clone(), value.clone());
        }
        let body = Value::Object(body);
        self.persist(path, &body)?;
        self.fan_out(path, body, meta);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }

    fn subscribe_connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::presence::ChangeRecord;

    fn meta() -> WriteMeta {
        WriteMeta {
            origin: "replica-teste".to_string(),
            change: ChangeRecord::new("sessao", "Teste", vec!["a".to_string()]),
        }
    }

    #[tokio::test]
    async fn leitura_de_documento_inexistente_e_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalStorageBackend::new(dir.path()).unwrap();
        assert!(backend.read("dashboard").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn escrita_parcial_preserva_os_outros_campos() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalStorageBackend::new(dir.path()).unwrap();

        let body = serde_json::json!({"a": 1, "b": 2});
        backend.write("doc", &body, &meta()).await.unwrap();

        let mut fields = Map::new();
        fields.insert("b".to_string(), serde_json::json!(9));
        backend.write_partial("doc", &fields, &meta()).await.unwrap();

        let read = backend.read("doc").await.unwrap().unwrap();
        assert_eq!(read, serde_json::json!({"a": 1, "b": 9}));
    }

    #[tokio::test]
    async fn escrita_gera_fan_out_com_origem() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalStorageBackend::new(dir.path()).unwrap();
        let mut rx = backend.subscribe();

        backend
            .write("doc", &serde_json::json!({"a": 1}), &meta())
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.path, "doc");
        assert_eq!(event.origin, "replica-teste");
        assert_eq!(event.body, serde_json::json!({"a": 1}));
    }
}
