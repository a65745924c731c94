// src/handlers/contacts.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    import::workflow::{ImportSession, ImportState},
    import::mapper,
    middleware::auth::Actor,
    models::contacts::{Contact, ContactStatus},
    models::import::{ColumnMapping, ImportField},
    services::contact_service::ContactDraft,
};

// =============================================================================
//  ÁREA 1: CICLO DE VIDA DO CONTATO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Clínica")]
    pub category_name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Clínica Bem Estar")]
    pub title: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "São Paulo")]
    pub city: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "(11) 98765-4321")]
    pub phone: String,

    #[serde(default)]
    pub url: String,
    #[serde(default)]
    #[schema(example = "@clinicabemestar")]
    pub instagram: String,
    #[serde(default)]
    pub leads: String,

    pub notes: Option<String>,
}

impl From<ContactPayload> for ContactDraft {
    fn from(payload: ContactPayload) -> Self {
        ContactDraft {
            category_name: payload.category_name,
            title: payload.title,
            city: payload.city,
            phone: payload.phone,
            url: payload.url,
            instagram: payload.instagram,
            leads: payload.leads,
            notes: payload.notes,
        }
    }
}

// GET /api/contacts
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contatos",
    responses(
        (status = 200, description = "Lista de contatos", body = Vec<Contact>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let contacts = app_state.contact_service.list().await;
    Ok((StatusCode::OK, Json(contacts)))
}

// POST /api/contacts
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "Contatos",
    request_body = ContactPayload,
    responses(
        (status = 201, description = "Contato criado", body = Contact),
        (status = 409, description = "Já existe contato com esse título e telefone")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contact(
    State(app_state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let contact = app_state
        .contact_service
        .add(payload.into(), &actor)
        .await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

// PUT /api/contacts/{id}
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "Contatos",
    request_body = ContactPayload,
    responses(
        (status = 200, description = "Contato atualizado", body = Contact),
        (status = 404, description = "Contato não encontrado")
    ),
    params(("id" = String, Path, description = "ID do contato")),
    security(("api_jwt" = []))
)]
pub async fn update_contact(
    State(app_state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let contact = app_state
        .contact_service
        .edit(&id, payload.into(), &actor)
        .await?;

    Ok((StatusCode::OK, Json(contact)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    #[schema(example = "atendeu")]
    pub status: ContactStatus,
}

// POST /api/contacts/{id}/status — muda o status e carimba a data do contato
#[utoipa::path(
    post,
    path = "/api/contacts/{id}/status",
    tag = "Contatos",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Contact),
        (status = 404, description = "Contato não encontrado")
    ),
    params(("id" = String, Path, description = "ID do contato")),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let contact = app_state
        .contact_service
        .set_status(&id, payload.status, &actor)
        .await?;

    Ok((StatusCode::OK, Json(contact)))
}

// DELETE /api/contacts/{id}
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "Contatos",
    responses(
        (status = 204, description = "Contato removido"),
        (status = 404, description = "Contato não encontrado")
    ),
    params(("id" = String, Path, description = "ID do contato")),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.contact_service.delete(&id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: IMPORTAÇÃO VIA PLANILHA
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSessionResponse {
    pub session_id: Uuid,
    pub file_name: String,
    pub state: String,
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
    pub missing_fields: Vec<String>,
    // Três primeiras linhas, para o preview do diálogo
    #[schema(value_type = Vec<Object>)]
    pub preview: Vec<Value>,
}

impl ImportSessionResponse {
    fn from_session(session: &ImportSession) -> Self {
        Self {
            session_id: session.id,
            file_name: session.file_name.clone(),
            state: session.state.as_str().to_string(),
            headers: session.sheet.headers.clone(),
            mapping: session.mapping.clone(),
            missing_fields: mapper::validate(&session.mapping),
            preview: session
                .preview()
                .iter()
                .filter_map(|row| serde_json::to_value(row).ok())
                .collect(),
        }
    }
}

// POST /api/contacts/import — upload do arquivo; decodifica, sugere o
// mapeamento automático e devolve a sessão com o preview.
#[utoipa::path(
    post,
    path = "/api/contacts/import",
    tag = "Importação",
    responses(
        (status = 201, description = "Sessão de importação criada", body = ImportSessionResponse),
        (status = 400, description = "Arquivo ilegível ou sem planilha")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_import(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::DecodeError(e.to_string()))?
    {
        if field.name() == Some("file") || upload.is_none() {
            let file_name = field
                .file_name()
                .unwrap_or("planilha.xlsx")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::DecodeError(e.to_string()))?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::DecodeError("nenhum arquivo enviado".to_string()))?;

    let session = ImportSession::from_upload(file_name, &bytes)?;
    let response = ImportSessionResponse::from_session(&session);
    app_state.imports.insert(session);

    tracing::info!("📄 Planilha '{}' carregada para importação", response.file_name);
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapColumnPayload {
    #[schema(example = "phone")]
    pub field: ImportField,
    // null ou "none" limpam o campo, como no seletor do diálogo
    #[schema(example = "Fone")]
    pub header: Option<String>,
}

// PUT /api/contacts/import/{id}/mapping
#[utoipa::path(
    put,
    path = "/api/contacts/import/{id}/mapping",
    tag = "Importação",
    request_body = MapColumnPayload,
    responses(
        (status = 200, description = "Mapeamento atualizado", body = ImportSessionResponse),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da sessão de importação")),
    security(("api_jwt" = []))
)]
pub async fn map_import_column(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MapColumnPayload>,
) -> Result<impl IntoResponse, AppError> {
    let header = payload
        .header
        .filter(|h| !h.is_empty() && h != "none");

    let response = app_state.imports.with_session(id, |session| {
        session.set_mapping(payload.field, header)?;
        Ok(ImportSessionResponse::from_session(session))
    })?;

    Ok((StatusCode::OK, Json(response)))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResultResponse {
    pub imported: usize,
    // Duplicados descartados (dentro do lote + contra os já salvos)
    pub duplicates: usize,
    // Linhas sem título/telefone — motivo distinto, contado à parte
    pub invalid_rows: usize,
}

// POST /api/contacts/import/{id}/confirm — roda a reconciliação e grava.
// A sessão morre no sucesso; em falha fica em Failed para remapear e tentar
// de novo.
#[utoipa::path(
    post,
    path = "/api/contacts/import/{id}/confirm",
    tag = "Importação",
    responses(
        (status = 200, description = "Importação concluída", body = ImportResultResponse),
        (status = 400, description = "Mapeamento obrigatório incompleto"),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da sessão de importação"),
        ("x-session-id" = Option<String>, Header, description = "Sessão da aba para a presença")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_import(
    State(app_state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Retira a sessão do registro para não segurar o lock durante a gravação
    let mut session = app_state.imports.take(id)?;
    if let Err(e) = session.begin_import() {
        app_state.imports.insert(session);
        return Err(e);
    }

    match app_state
        .contact_service
        .import(&session.sheet.rows, &session.mapping, &actor)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                "✅ Importação de '{}': {} contatos, {} duplicados ignorados",
                session.file_name,
                outcome.accepted.len(),
                outcome.duplicate_count
            );
            // sessão concluída é descartada
            Ok((
                StatusCode::OK,
                Json(ImportResultResponse {
                    imported: outcome.accepted.len(),
                    duplicates: outcome.duplicate_count,
                    invalid_rows: outcome.missing_required,
                }),
            ))
        }
        Err(e) => {
            session.state = ImportState::Failed;
            app_state.imports.insert(session);
            Err(e)
        }
    }
}

// DELETE /api/contacts/import/{id} — cancela o diálogo; a sessão some.
#[utoipa::path(
    delete,
    path = "/api/contacts/import/{id}",
    tag = "Importação",
    responses(
        (status = 204, description = "Sessão cancelada"),
        (status = 404, description = "Sessão não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da sessão de importação")),
    security(("api_jwt" = []))
)]
pub async fn cancel_import(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.imports.cancel(id)?;
    Ok(StatusCode::NO_CONTENT)
}
