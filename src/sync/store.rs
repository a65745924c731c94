// src/sync/store.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};

use crate::common::error::AppError;
use crate::models::presence::{ActorContext, ChangeRecord};
use crate::sync::alerts::{Alert, AlertBus};
use crate::sync::backend::{BackendEvent, DocumentBackend, WriteMeta};
use crate::sync::presence::PresenceTracker;

// Um documento replicável: serializa como objeto JSON de campos de topo e
// sabe recomputar seus derivados. `derive` precisa ser idempotente.
pub trait SyncDocument:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    const PATH: &'static str;

    fn derive(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    Local,
    Remote,
}

// Entregue aos assinantes a cada snapshot novo, local ou vindo do meio.
#[derive(Clone)]
pub struct SnapshotUpdate<T> {
    pub snapshot: T,
    pub change: ChangeRecord,
    pub origin: UpdateOrigin,
}

// Dono exclusivo do snapshot em memória de um documento. Toda mutação passa
// por `update`; o resto do sistema só recebe cópias de leitura.
pub struct SyncedStore<T: SyncDocument> {
    backend: Arc<dyn DocumentBackend>,
    current: RwLock<T>,
    degraded: AtomicBool,
    updates: broadcast::Sender<SnapshotUpdate<T>>,
    presence: PresenceTracker,
    alerts: AlertBus,
}

impl<T: SyncDocument> SyncedStore<T> {
    // Lê o snapshot do meio na subida. Ausente -> grava o default e o adota.
    // Meio inalcançável -> default em memória e store marcado degradado, sem
    // derrubar o processo; escritas seguintes ainda são tentadas.
    pub async fn initialize(
        backend: Arc<dyn DocumentBackend>,
        presence: PresenceTracker,
        alerts: AlertBus,
    ) -> Arc<Self> {
        let mut initial = T::default();
        initial.derive();
        let mut degraded = false;

        match backend.read(T::PATH).await {
            Ok(Some(body)) => match serde_json::from_value::<T>(body) {
                Ok(mut doc) => {
                    doc.derive();
                    initial = doc;
                }
                Err(e) => {
                    tracing::warn!(
                        "Snapshot remoto de '{}' em formato inesperado ({}), usando o padrão",
                        T::PATH,
                        e
                    );
                }
            },
            Ok(None) => {
                // Primeiro boot: o valor padrão vira o snapshot compartilhado
                let meta = system_meta(top_level_fields(&initial));
                if let Ok(body) = serde_json::to_value(&initial) {
                    if let Err(e) = backend.write(T::PATH, &body, &meta).await {
                        tracing::warn!("Falha ao gravar o padrão de '{}': {}", T::PATH, e);
                        degraded = true;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Meio de persistência indisponível para '{}' ({}), seguindo com o padrão",
                    T::PATH,
                    e
                );
                degraded = true;
            }
        }

        let (updates, _) = broadcast::channel(256);
        let store = Arc::new(Self {
            backend,
            current: RwLock::new(initial),
            degraded: AtomicBool::new(degraded),
            updates,
            presence,
            alerts,
        });
        Self::spawn_pump(&store);
        store
    }

    // Bomba de eventos do meio: entrega na ordem do meio, um por vez. O eco
    // da própria réplica é suprimido pela etiqueta de origem — o estado
    // otimista local já contém aquela escrita.
    fn spawn_pump(store: &Arc<Self>) {
        let weak = Arc::downgrade(store);
        let mut rx = store.backend.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Fan-out atrasado, snapshots pulados");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(store) = weak.upgrade() else { break };
                if event.path != T::PATH {
                    continue;
                }
                if event.origin == store.presence.own_id() {
                    continue;
                }
                store.apply_remote(event).await;
            }
        });
    }

    async fn apply_remote(&self, event: BackendEvent) {
        let mut doc = match serde_json::from_value::<T>(event.body) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Snapshot remoto de '{}' descartado: {}", T::PATH, e);
                return;
            }
        };
        doc.derive();
        {
            *self.current.write().await = doc.clone();
        }
        self.degraded.store(false, Ordering::Relaxed);
        let _ = self.updates.send(SnapshotUpdate {
            snapshot: doc,
            change: event.change.clone(),
            origin: UpdateOrigin::Remote,
        });
        self.presence.publish(event.change);
    }

    pub async fn snapshot(&self) -> T {
        self.current.read().await.clone()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    // Remoção = soltar o receiver; idempotente e segura após o teardown.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotUpdate<T>> {
        self.updates.subscribe()
    }

    // Merge raso otimista: os campos do parcial substituem os campos de topo
    // por atacado, os derivados são recomputados, o estado local muda já, e a
    // escrita (só dos campos alterados) segue assíncrona. Falha de escrita
    // não desfaz o estado local — vira alerta.
    pub async fn update(
        &self,
        partial: Map<String, Value>,
        actor: &ActorContext,
    ) -> Result<T, AppError> {
        if partial.is_empty() {
            return Ok(self.snapshot().await);
        }

        let merged = {
            let mut guard = self.current.write().await;
            let mut value = serde_json::to_value(&*guard)
                .map_err(|e| AppError::PayloadInvalid(e.to_string()))?;
            let Some(obj) = value.as_object_mut() else {
                return Err(AppError::PayloadInvalid(
                    "o documento não serializa como objeto".to_string(),
                ));
            };
            for key in partial.keys() {
                if !obj.contains_key(key) {
                    return Err(AppError::UnknownField(key.clone()));
                }
            }
            for (key, val) in &partial {
                obj.insert(key.clone(), val.clone());
            }
            let mut doc: T = serde_json::from_value(value)
                .map_err(|e| AppError::PayloadInvalid(e.to_string()))?;
            doc.derive();
            *guard = doc.clone();
            doc
        };

        let changed: Vec<String> = partial.keys().cloned().collect();
        let change = ChangeRecord::new(&actor.session_id, &actor.label, changed);
        let _ = self.updates.send(SnapshotUpdate {
            snapshot: merged.clone(),
            change: change.clone(),
            origin: UpdateOrigin::Local,
        });
        self.presence.publish(change.clone());

        // Campos de topo alterados, já com os derivados recomputados
        let merged_value =
            serde_json::to_value(&merged).map_err(|e| AppError::PayloadInvalid(e.to_string()))?;
        let mut fields = Map::new();
        for key in partial.keys() {
            let value = merged_value.get(key).cloned().unwrap_or(Value::Null);
            fields.insert(key.clone(), value);
        }

        let backend = Arc::clone(&self.backend);
        let alerts = self.alerts.clone();
        let meta = WriteMeta {
            origin: self.presence.own_id().to_string(),
            change,
        };
        tokio::spawn(async move {
            if let Err(e) = backend.write_partial(T::PATH, &fields, &meta).await {
                tracing::error!("Falha ao gravar '{}': {}", T::PATH, e);
                alerts.publish(Alert::WriteFailed {
                    doc: T::PATH.to_string(),
                    message: e.to_string(),
                });
            }
        });

        Ok(merged)
    }

    // Religa o snapshot ao meio depois de uma reconexão: relê o estado
    // remoto para recuperar o que foi perdido offline. Se o meio perdeu o
    // documento, o snapshot local volta a ser gravado.
    pub async fn resync(&self) {
        match self.backend.read(T::PATH).await {
            Ok(Some(body)) => {
                let origin = self.presence.own_id().to_string();
                let change = system_change(vec![T::PATH.to_string()]);
                self.apply_remote(BackendEvent {
                    path: T::PATH.to_string(),
                    body,
                    origin: format!("resync:{origin}"),
                    change,
                })
                .await;
            }
            Ok(None) => {
                let current = self.snapshot().await;
                let meta = system_meta(top_level_fields(&current));
                if let Ok(body) = serde_json::to_value(&current) {
                    if let Err(e) = self.backend.write(T::PATH, &body, &meta).await {
                        tracing::warn!("Re-sync de '{}' não conseguiu gravar: {}", T::PATH, e);
                        return;
                    }
                }
                self.degraded.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!("Re-sync de '{}' falhou: {}", T::PATH, e);
                self.degraded.store(true, Ordering::Relaxed);
            }
        }
    }
}

fn top_level_fields<T: Serialize>(doc: &T) -> Vec<String> {
    serde_json::to_value(doc)
        .ok()
        .and_then(|v| v.as_object().map(|obj| obj.keys().cloned().collect()))
        .unwrap_or_default()
}

fn system_change(fields: Vec<String>) -> ChangeRecord {
    let session = crate::sync::presence::server_session();
    ChangeRecord::new(session.id.clone(), session.label.clone(), fields)
}

fn system_meta(fields: Vec<String>) -> WriteMeta {
    let session = crate::sync::presence::server_session();
    WriteMeta {
        origin: session.id.clone(),
        change: system_change(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    use crate::sync::local::LocalStorageBackend;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestDoc {
        a: i64,
        b: i64,
    }

    impl SyncDocument for TestDoc {
        const PATH: &'static str = "teste";
    }

    fn actor(session: &str) -> ActorContext {
        ActorContext {
            session_id: session.to_string(),
            label: "Teste".to_string(),
        }
    }

    fn partial(json: serde_json::Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    async fn store_on(
        dir: &std::path::Path,
    ) -> (Arc<SyncedStore<TestDoc>>, Arc<LocalStorageBackend>) {
        let backend = Arc::new(LocalStorageBackend::new(dir).unwrap());
        let store = SyncedStore::<TestDoc>::initialize(
            backend.clone() as Arc<dyn DocumentBackend>,
            PresenceTracker::new(),
            AlertBus::new(),
        )
        .await;
        (store, backend)
    }

    #[tokio::test]
    async fn snapshot_ausente_adota_e_grava_o_default() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend) = store_on(dir.path()).await;

        assert_eq!(store.snapshot().await, TestDoc::default());
        // o default foi gravado de volta no meio
        let written = backend.read("teste").await.unwrap().unwrap();
        assert_eq!(written, serde_json::json!({"a": 0, "b": 0}));
    }

    #[tokio::test]
    async fn updates_sequenciais_em_campos_disjuntos_compoem() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend) = store_on(dir.path()).await;

        store.update(partial(serde_json::json!({"a": 1})), &actor("s1")).await.unwrap();
        store.update(partial(serde_json::json!({"b": 2})), &actor("s1")).await.unwrap();

        assert_eq!(store.snapshot().await, TestDoc { a: 1, b: 2 });
    }

    #[tokio::test]
    async fn merge_raso_isola_os_campos() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend) = store_on(dir.path()).await;

        store.update(partial(serde_json::json!({"a": 7})), &actor("s1")).await.unwrap();
        let doc = store.snapshot().await;
        // tocar só `a` nunca muda `b`
        assert_eq!(doc.b, TestDoc::default().b);
        assert_eq!(doc.a, 7);
    }

    #[tokio::test]
    async fn campo_desconhecido_e_rejeitado_sem_mutar() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend) = store_on(dir.path()).await;

        let before = store.snapshot().await;
        let err = store
            .update(partial(serde_json::json!({"zzz": 1})), &actor("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownField(_)));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn update_local_notifica_assinantes_na_ordem() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend) = store_on(dir.path()).await;
        let mut rx = store.subscribe();

        store.update(partial(serde_json::json!({"a": 1})), &actor("s1")).await.unwrap();
        store.update(partial(serde_json::json!({"b": 2})), &actor("s1")).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.origin, UpdateOrigin::Local);
        assert_eq!(first.snapshot, TestDoc { a: 1, b: 0 });
        assert_eq!(first.change.changed_field_names, vec!["a".to_string()]);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.snapshot, TestDoc { a: 1, b: 2 });
    }

    #[tokio::test]
    async fn duas_replicas_no_mesmo_meio_se_enxergam() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalStorageBackend::new(dir.path()).unwrap());

        // réplicas com identidades distintas (PresenceTracker separado por id
        // de processo; aqui forjamos a segunda com outro tracker)
        let store_a = SyncedStore::<TestDoc>::initialize(
            backend.clone() as Arc<dyn DocumentBackend>,
            PresenceTracker::new(),
            AlertBus::new(),
        )
        .await;
        let store_b = SyncedStore::<TestDoc>::initialize(
            backend.clone() as Arc<dyn DocumentBackend>,
            PresenceTracker::new(),
            AlertBus::new(),
        )
        .await;

        let mut rx_b = store_b.subscribe();

        // A escreve com uma origem de réplica diferente da de B — como os dois
        // trackers compartilham a sessão do processo, simulamos a outra
        // réplica escrevendo direto no meio
        let mut fields = Map::new();
        fields.insert("a".to_string(), serde_json::json!(42));
        let meta = WriteMeta {
            origin: "replica-remota".to_string(),
            change: ChangeRecord::new("aba-1", "Ana", vec!["a".to_string()]),
        };
        backend.write_partial("teste", &fields, &meta).await.unwrap();

        let update = rx_b.recv().await.unwrap();
        assert_eq!(update.origin, UpdateOrigin::Remote);
        assert_eq!(update.snapshot.a, 42);
        assert_eq!(update.change.actor_label, "Ana");
        assert_eq!(store_b.snapshot().await.a, 42);
        drop(store_a);
    }

    #[tokio::test]
    async fn eco_da_propria_escrita_nao_gera_segundo_update() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _backend) = store_on(dir.path()).await;
        let mut rx = store.subscribe();

        store.update(partial(serde_json::json!({"a": 5})), &actor("s1")).await.unwrap();

        // primeiro (e único) update: o otimista local
        let got = rx.recv().await.unwrap();
        assert_eq!(got.origin, UpdateOrigin::Local);

        // dá tempo do eco do backend circular; nada mais deve chegar
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn resync_readota_o_estado_do_meio() {
        let dir = tempfile::tempdir().unwrap();
        let (store, backend) = store_on(dir.path()).await;

        // outra réplica mudou o documento enquanto estávamos "offline"
        let meta = WriteMeta {
            origin: "replica-remota".to_string(),
            change: ChangeRecord::new("aba-2", "Bia", vec!["a".to_string()]),
        };
        backend
            .write("teste", &serde_json::json!({"a": 99, "b": 3}), &meta)
            .await
            .unwrap();

        store.resync().await;
        assert_eq!(store.snapshot().await, TestDoc { a: 99, b: 3 });
    }
}
