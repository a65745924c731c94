// src/sync/remote.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::PgPool;
use tokio::sync::{broadcast, watch};

use crate::common::error::AppError;
use crate::models::presence::ChangeRecord;
use crate::sync::backend::{BackendEvent, DocumentBackend, WriteMeta};

// Canal do NOTIFY compartilhado por todos os documentos
const NOTIFY_CHANNEL: &str = "document_updates";

// A variante rica: o "banco realtime hospedado". Documentos em jsonb, escrita
// parcial como merge (corpo || campos) e fan-out entre processos via
// LISTEN/NOTIFY. O payload do NOTIFY carrega só path + origem + presença; o
// corpo é relido da tabela (o payload tem limite de 8kB no Postgres).
pub struct PostgresBackend {
    pool: PgPool,
    events: broadcast::Sender<BackendEvent>,
    connected: watch::Sender<bool>,
}

// O que viaja dentro do NOTIFY
#[derive(Debug, Deserialize)]
struct NotifyPayload {
    path: String,
    origin: String,
    change: ChangeRecord,
}

impl PostgresBackend {
    pub async fn connect(database_url: &str) -> Result<Arc<Self>, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao rodar as migrações: {e}"))?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let (events, _) = broadcast::channel(256);
        let (connected, _) = watch::channel(false);
        let backend = Arc::new(Self { pool, events, connected });
        backend.clone().spawn_listener();
        backend.clone().spawn_keepalive();
        Ok(backend)
    }

    // Escuta o canal de NOTIFY e traduz cada aviso em BackendEvent. Queda de
    // conexão derruba para offline e tenta religar a cada 5s.
    fn spawn_listener(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                let mut listener = match PgListener::connect_with(&self.pool).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        tracing::warn!("Listener sem conexão: {}", e);
                        let _ = self.connected.send(false);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        continue;
                    }
                };
                if let Err(e) = listener.listen(NOTIFY_CHANNEL).await {
                    tracing::warn!("LISTEN falhou: {}", e);
                    let _ = self.connected.send(false);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
                let _ = self.connected.send(true);

                loop {
                    match listener.recv().await {
                        Ok(notification) => {
                            self.handle_notification(notification.payload()).await;
                        }
                        Err(e) => {
                            tracing::warn!("Conexão do listener caiu: {}", e);
                            let _ = self.connected.send(false);
                            break;
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
    }

    async fn handle_notification(&self, payload: &str) {
        let parsed: NotifyPayload = match serde_json::from_str(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("NOTIFY com payload inesperado ({}), ignorando", e);
                return;
            }
        };
        match self.read(&parsed.path).await {
            Ok(Some(body)) => {
                let _ = self.events.send(BackendEvent {
                    path: parsed.path,
                    body,
                    origin: parsed.origin,
                    change: parsed.change,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Releitura de '{}' após NOTIFY falhou: {}", parsed.path, e);
            }
        }
    }

    // Tick fixo de 30s que só reafirma "online" ao meio; nunca re-busca o
    // estado inteiro (isso é papel do re-sync na reconexão).
    fn spawn_keepalive(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match sqlx::query("SELECT 1").execute(&self.pool).await {
                    Ok(_) => {
                        if *self.connected.borrow() {
                            let _ = self.connected.send(true);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Keepalive falhou: {}", e);
                        let _ = self.connected.send(false);
                    }
                }
            }
        });
    }

    fn is_connectivity(e: &sqlx::Error) -> bool {
        matches!(
            e,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
        )
    }

    fn note_failure(&self, e: &sqlx::Error) {
        // Erros de conectividade derrubam o estado; erros de dados não
        if Self::is_connectivity(e) {
            let _ = self.connected.send(false);
        }
    }

    // Leitura sem conexão degrada (o chamador segue com o valor local)
    fn classify_read(&self, e: sqlx::Error) -> AppError {
        self.note_failure(&e);
        if Self::is_connectivity(&e) {
            AppError::PersistenceUnavailable
        } else {
            AppError::DatabaseError(e)
        }
    }

    // Escrita sem conexão vira o alerta transitório de gravação
    fn classify_write(&self, e: sqlx::Error) -> AppError {
        self.note_failure(&e);
        if Self::is_connectivity(&e) {
            AppError::PersistenceWriteFailed(e.to_string())
        } else {
            AppError::DatabaseError(e)
        }
    }

    async fn notify(&self, path: &str, meta: &WriteMeta) -> Result<(), AppError> {
        let payload = json!({
            "path": path,
            "origin": meta.origin,
            "change": meta.change,
        })
        .to_string();
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify_write(e))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for PostgresBackend {
    async fn read(&self, path: &str) -> Result<Option<Value>, AppError> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT body FROM documents WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify_read(e))?;
        Ok(row.map(|(body,)| body))
    }

    async fn write(&self, path: &str, body: &Value, meta: &WriteMeta) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO documents (path, body, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (path) DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(path)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| self.classify_write(e))?;

        self.notify(path, meta).await
    }

    async fn write_partial(
        &self,
        path: &str,
        fields: &Map<String, Value>,
        meta: &WriteMeta,
    ) -> Result<(), AppError> {
        let patch = Value::Object(fields.clone());
        let updated = sqlx::query(
            "UPDATE documents SET body = body || $2, updated_at = now() WHERE path = $1",
        )
        .bind(path)
        .bind(&patch)
        .execute(&self.pool)
        .await
        .map_err(|e| self.classify_write(e))?;

        if updated.rows_affected() == 0 {
            // Documento ainda não existe: o patch vira o corpo inicial
            sqlx::query(
                r#"
                INSERT INTO documents (path, body, updated_at)
                VALUES ($1, $2, now())
                ON CONFLICT (path) DO UPDATE SET body = documents.body || EXCLUDED.body, updated_at = now()
                "#,
            )
            .bind(path)
            .bind(&patch)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify_write(e))?;
        }

        self.notify(path, meta).await
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }

    fn subscribe_connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}
