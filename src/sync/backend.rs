// src/sync/backend.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};

use crate::{common::error::AppError, models::presence::ChangeRecord};

// Um snapshot novo reportado pelo meio de persistência, com a etiqueta de
// origem (réplica que escreveu) para suprimir o eco da própria escrita.
#[derive(Debug, Clone)]
pub struct BackendEvent {
    pub path: String,
    pub body: Value,
    pub origin: String,
    pub change: ChangeRecord,
}

// Metadados que acompanham toda escrita: a réplica de origem e o registro
// de presença que os outros clientes vão exibir.
#[derive(Debug, Clone)]
pub struct WriteMeta {
    pub origin: String,
    pub change: ChangeRecord,
}

// O contrato mínimo que o núcleo exige do colaborador de persistência
// (banco realtime hospedado ou armazenamento local do dispositivo).
// As duas implementações são escolhidas por configuração, sem SDK de
// fornecedor amarrado ao núcleo.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    // Snapshot atual, ou None se o documento nunca foi gravado
    async fn read(&self, path: &str) -> Result<Option<Value>, AppError>;

    // Substitui o documento inteiro
    async fn write(&self, path: &str, body: &Value, meta: &WriteMeta) -> Result<(), AppError>;

    // Merge raso: cada campo de topo presente substitui o correspondente
    // por atacado (last-write-wins na granularidade do campo)
    async fn write_partial(
        &self,
        path: &str,
        fields: &Map<String, Value>,
        meta: &WriteMeta,
    ) -> Result<(), AppError>;

    // Fan-out de snapshots novos, na ordem de entrega do meio
    fn subscribe(&self) -> broadcast::Receiver<BackendEvent>;

    // true = conectado; o ConnectionMonitor traduz para checking/online/offline
    fn subscribe_connection(&self) -> watch::Receiver<bool>;
}
