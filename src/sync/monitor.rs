// src/sync/monitor.rs

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::models::presence::ConnectionState;
use crate::sync::alerts::{Alert, AlertBus};
use crate::sync::backend::DocumentBackend;

// Quem sabe se religar ao meio depois de uma reconexão.
#[async_trait]
pub trait Resync: Send + Sync {
    async fn resync(&self);
}

#[async_trait]
impl<T: crate::sync::store::SyncDocument> Resync for crate::sync::store::SyncedStore<T> {
    async fn resync(&self) {
        crate::sync::store::SyncedStore::resync(self).await;
    }
}

// Máquina de estados {checking, online, offline} dirigida pela assinatura de
// conectividade do meio. A transição offline -> online dispara o re-sync de
// cada store registrado, para recuperar o que foi perdido fora do ar.
#[derive(Clone)]
pub struct ConnectionMonitor {
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionMonitor {
    pub fn spawn(
        backend: Arc<dyn DocumentBackend>,
        stores: Vec<Arc<dyn Resync>>,
        alerts: AlertBus,
    ) -> Self {
        let (tx, rx) = watch::channel(ConnectionState::Checking);

        tokio::spawn(async move {
            let mut conn = backend.subscribe_connection();
            let mut previous = ConnectionState::Checking;

            // O meio pode já estar conectado na subida (armazenamento local)
            if *conn.borrow_and_update() {
                previous = ConnectionState::Online;
                let _ = tx.send(previous);
            }

            loop {
                if conn.changed().await.is_err() {
                    break;
                }
                let next = if *conn.borrow_and_update() {
                    ConnectionState::Online
                } else {
                    ConnectionState::Offline
                };
                if next == previous {
                    continue;
                }

                match (previous, next) {
                    (ConnectionState::Offline, ConnectionState::Online) => {
                        tracing::info!("Conexão restabelecida, re-sincronizando documentos");
                        alerts.publish(Alert::ConnectivityRestored);
                        for store in &stores {
                            store.resync().await;
                        }
                    }
                    (_, ConnectionState::Offline) => {
                        tracing::warn!("Conexão com o meio de persistência perdida");
                        alerts.publish(Alert::ConnectivityLost);
                    }
                    _ => {}
                }

                previous = next;
                let _ = tx.send(next);
            }
        });

        Self { state: rx }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::{Map, Value};
    use tokio::sync::broadcast;

    use crate::common::error::AppError;
    use crate::sync::backend::{BackendEvent, WriteMeta};

    // Meio de mentira: só a assinatura de conectividade importa aqui.
    struct FakeBackend {
        events: broadcast::Sender<BackendEvent>,
        connected: watch::Sender<bool>,
    }

    impl FakeBackend {
        fn new() -> Self {
            let (events, _) = broadcast::channel(8);
            let (connected, _) = watch::channel(false);
            Self { events, connected }
        }
    }

    #[async_trait]
    impl DocumentBackend for FakeBackend {
        async fn read(&self, _path: &str) -> Result<Option<Value>, AppError> {
            Ok(None)
        }
        async fn write(&self, _: &str, _: &Value, _: &WriteMeta) -> Result<(), AppError> {
            Ok(())
        }
        async fn write_partial(
            &self,
            _: &str,
            _: &Map<String, Value>,
            _: &WriteMeta,
        ) -> Result<(), AppError> {
            Ok(())
        }
        fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
            self.events.subscribe()
        }
        fn subscribe_connection(&self) -> watch::Receiver<bool> {
            self.connected.subscribe()
        }
    }

    struct CountingResync(AtomicUsize);

    #[async_trait]
    impl Resync for CountingResync {
        async fn resync(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_for(monitor: &ConnectionMonitor, expected: ConnectionState) {
        let mut rx = monitor.subscribe();
        for _ in 0..50 {
            if *rx.borrow() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("estado esperado {:?} não chegou", expected);
    }

    #[tokio::test]
    async fn comeca_em_checking_e_vai_para_online() {
        let backend = Arc::new(FakeBackend::new());
        let monitor =
            ConnectionMonitor::spawn(backend.clone(), vec![], AlertBus::new());

        assert_eq!(monitor.state(), ConnectionState::Checking);
        backend.connected.send(true).unwrap();
        wait_for(&monitor, ConnectionState::Online).await;
    }

    #[tokio::test]
    async fn reconexao_dispara_resync_e_alertas() {
        let backend = Arc::new(FakeBackend::new());
        let counter = Arc::new(CountingResync(AtomicUsize::new(0)));
        let alerts = AlertBus::new();
        let mut alert_rx = alerts.subscribe();

        let monitor = ConnectionMonitor::spawn(
            backend.clone(),
            vec![counter.clone() as Arc<dyn Resync>],
            alerts,
        );

        backend.connected.send(true).unwrap();
        wait_for(&monitor, ConnectionState::Online).await;
        // ficar online vindo de checking não re-sincroniza
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        backend.connected.send(false).unwrap();
        wait_for(&monitor, ConnectionState::Offline).await;
        assert!(matches!(alert_rx.recv().await.unwrap(), Alert::ConnectivityLost));

        backend.connected.send(true).unwrap();
        wait_for(&monitor, ConnectionState::Online).await;
        assert!(matches!(
            alert_rx.recv().await.unwrap(),
            Alert::ConnectivityRestored
        ));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
