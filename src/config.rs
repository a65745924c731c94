// src/config.rs

use std::{env, sync::Arc};

use crate::{
    import::workflow::ImportRegistry,
    models::{contacts::ContactsDocument, dashboard::DashboardData},
    services::{auth, AuthService, ContactService, DashboardService},
    sync::{
        local::LocalStorageBackend, monitor::Resync, remote::PostgresBackend, AlertBus,
        ConnectionMonitor, DocumentBackend, PresenceTracker, SyncedStore,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub contact_service: ContactService,
    pub dashboard_service: DashboardService,
    pub dashboard_store: Arc<SyncedStore<DashboardData>>,
    pub contacts_store: Arc<SyncedStore<ContactsDocument>>,
    pub alerts: AlertBus,
    pub monitor: ConnectionMonitor,
    pub imports: Arc<ImportRegistry>,
}

impl AppState {
    // Carrega as configurações e monta o gráfico de dependências:
    // backend de documentos -> stores -> monitor -> serviços.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let users = auth::parse_users(&env::var("APP_USERS").unwrap_or_default());
        if users.is_empty() {
            tracing::warn!("APP_USERS vazio — nenhum login vai funcionar");
        }

        // SYNC_BACKEND escolhe o meio de persistência dos documentos:
        //   local    -> arquivos JSON + broadcast no processo (padrão)
        //   postgres -> jsonb + LISTEN/NOTIFY entre processos
        let backend_kind = env::var("SYNC_BACKEND").unwrap_or_else(|_| "local".to_string());
        let backend: Arc<dyn DocumentBackend> = match backend_kind.as_str() {
            "postgres" => {
                let database_url =
                    env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
                PostgresBackend::connect(&database_url).await?
            }
            _ => {
                let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
                Arc::new(LocalStorageBackend::new(data_dir)?)
            }
        };
        tracing::info!("Documentos sincronizados via backend '{}'", backend_kind);

        let presence = PresenceTracker::new();
        let alerts = AlertBus::new();

        let dashboard_store = SyncedStore::<DashboardData>::initialize(
            backend.clone(),
            presence.clone(),
            alerts.clone(),
        )
        .await;
        let contacts_store = SyncedStore::<ContactsDocument>::initialize(
            backend.clone(),
            presence.clone(),
            alerts.clone(),
        )
        .await;

        // A reconexão re-sincroniza os dois documentos
        let monitor = ConnectionMonitor::spawn(
            backend.clone(),
            vec![
                dashboard_store.clone() as Arc<dyn Resync>,
                contacts_store.clone() as Arc<dyn Resync>,
            ],
            alerts.clone(),
        );

        let auth_service = AuthService::new(users, jwt_secret);
        let contact_service = ContactService::new(contacts_store.clone());
        let dashboard_service = DashboardService::new(dashboard_store.clone());

        Ok(Self {
            auth_service,
            contact_service,
            dashboard_service,
            dashboard_store,
            contacts_store,
            alerts,
            monitor,
            imports: Arc::new(ImportRegistry::new()),
        })
    }
}
