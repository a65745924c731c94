// src/handlers/dashboard.rs

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::Actor,
    models::dashboard::DashboardData,
    services::export_service,
};

// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Snapshot atual do dashboard", body = DashboardData)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state.dashboard_service.current().await;
    Ok((StatusCode::OK, Json(data)))
}

// PATCH /api/dashboard — atualização parcial por campos de topo. O corpo é um
// objeto com qualquer subconjunto dos campos do documento; arrays substituem
// a lista inteira (sem merge elemento a elemento).
#[utoipa::path(
    patch,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Documento após o merge, com derivados recomputados", body = DashboardData),
        (status = 400, description = "Campo desconhecido ou formato inválido")
    ),
    params(
        ("x-session-id" = Option<String>, Header, description = "Sessão da aba para a presença")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_dashboard(
    State(app_state): State<AppState>,
    Actor(actor): Actor,
    Json(partial): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state.dashboard_service.update(partial, &actor).await?;
    Ok((StatusCode::OK, Json(data)))
}

// GET /api/dashboard/export — workbook xlsx para download
#[utoipa::path(
    get,
    path = "/api/dashboard/export",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Workbook xlsx com as seis abas do dashboard")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_dashboard(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let data = app_state.dashboard_service.current().await;
    let bytes = export_service::export_dashboard(&data)?;
    let file_name = export_service::export_file_name(&data);

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}
