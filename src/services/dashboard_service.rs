// src/services/dashboard_service.rs

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    models::{dashboard::DashboardData, presence::ActorContext},
    sync::SyncedStore,
};

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<SyncedStore<DashboardData>>,
}

impl DashboardService {
    pub fn new(store: Arc<SyncedStore<DashboardData>>) -> Self {
        Self { store }
    }

    pub async fn current(&self) -> DashboardData {
        self.store.snapshot().await
    }

    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    // Atualização parcial por campos de topo; o store recomputa os derivados
    // e replica. Campos desconhecidos são rejeitados antes do merge.
    pub async fn update(
        &self,
        partial: Map<String, Value>,
        actor: &ActorContext,
    ) -> Result<DashboardData, AppError> {
        self.store.update(partial, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::dashboard::IndicatorStatus;
    use crate::sync::{local::LocalStorageBackend, AlertBus, DocumentBackend, PresenceTracker};

    async fn service(dir: &std::path::Path) -> DashboardService {
        let backend = Arc::new(LocalStorageBackend::new(dir).unwrap());
        let store = SyncedStore::<DashboardData>::initialize(
            backend as Arc<dyn DocumentBackend>,
            PresenceTracker::new(),
            AlertBus::new(),
        )
        .await;
        DashboardService::new(store)
    }

    fn actor() -> ActorContext {
        ActorContext {
            session_id: "aba-1".to_string(),
            label: "Danilo".to_string(),
        }
    }

    #[tokio::test]
    async fn sobe_com_o_seed_e_derivados_prontos() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let data = service.current().await;
        assert_eq!(data.reference_month, "Abril 2025");
        // 85/100 -> warning, já derivado na subida
        assert_eq!(data.indicators[0].status, Some(IndicatorStatus::Warning));
    }

    #[tokio::test]
    async fn update_parcial_recomputa_os_indicadores() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let mut indicators = service.current().await.indicators;
        indicators[0].value = 120.0;
        let mut partial = Map::new();
        partial.insert(
            "indicators".to_string(),
            serde_json::to_value(&indicators).unwrap(),
        );

        let updated = service.update(partial, &actor()).await.unwrap();
        assert_eq!(updated.indicators[0].status, Some(IndicatorStatus::Success));
        // campo não tocado permanece
        assert_eq!(updated.strategic_notes, service.current().await.strategic_notes);
    }

    #[tokio::test]
    async fn update_de_notas_nao_toca_o_resto() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;
        let before = service.current().await;

        let mut partial = Map::new();
        partial.insert(
            "strategicNotes".to_string(),
            Value::String("Focar no Instagram".to_string()),
        );
        let updated = service.update(partial, &actor()).await.unwrap();

        assert_eq!(updated.strategic_notes, "Focar no Instagram");
        assert_eq!(
            serde_json::to_value(&updated.indicators).unwrap(),
            serde_json::to_value(&before.indicators).unwrap()
        );
    }
}
