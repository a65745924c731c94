// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

// Declaração dos nossos módulos
mod common;
mod config;
mod docs;
mod handlers;
mod import;
mod middleware;
mod models;
mod services;
mod sync;

// Importações principais
use crate::config::AppState;
use crate::middleware::auth::auth_guard;
use crate::sync::presence::server_session;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // A sessão do processo nasce aqui e não muda mais
    tracing::info!("Sessão do processo: {}", server_session().id);

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login));

    // Rotas protegidas de usuário
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Documento do dashboard: snapshot, update parcial e export em Excel
    let dashboard_routes = Router::new()
        .route(
            "/",
            get(handlers::dashboard::get_dashboard).patch(handlers::dashboard::update_dashboard),
        )
        .route("/export", get(handlers::dashboard::export_dashboard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Contatos: ciclo de vida + fluxo de importação de planilhas
    let contacts_routes = Router::new()
        .route(
            "/",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route(
            "/{id}",
            put(handlers::contacts::update_contact).delete(handlers::contacts::delete_contact),
        )
        .route("/{id}/status", post(handlers::contacts::update_status))
        .route("/import", post(handlers::contacts::upload_import))
        .route(
            "/import/{id}",
            axum::routing::delete(handlers::contacts::cancel_import),
        )
        .route(
            "/import/{id}/mapping",
            put(handlers::contacts::map_import_column),
        )
        .route(
            "/import/{id}/confirm",
            post(handlers::contacts::confirm_import),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Sync em tempo real: o WebSocket autentica pelo token na query
    let sync_routes = Router::new()
        .route("/ws", get(handlers::sync::ws_handler))
        .route("/status", get(handlers::sync::sync_status));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/docs/openapi.json",
            get(|| async { Json(docs::ApiDoc::openapi()) }),
        )
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/contacts", contacts_routes)
        .nest("/api/sync", sync_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
