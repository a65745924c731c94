// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Contato não encontrado")]
    ContactNotFound,

    #[error("Já existe um contato com esse título e telefone")]
    ContactAlreadyExists,

    // --- Importação de planilhas ---
    #[error("Arquivo de planilha inválido: {0}")]
    DecodeError(String),

    #[error("Mapeamento de colunas incompleto")]
    MappingIncomplete(Vec<String>),

    #[error("Sessão de importação não encontrada")]
    ImportSessionNotFound,

    #[error("Operação inválida no estado '{0}' da importação")]
    ImportStateInvalid(&'static str),

    // --- Documentos sincronizados ---
    #[error("Campo desconhecido no documento: {0}")]
    UnknownField(String),

    #[error("Atualização parcial inválida: {0}")]
    PayloadInvalid(String),

    #[error("Meio de persistência indisponível")]
    PersistenceUnavailable,

    #[error("Falha ao gravar no meio de persistência: {0}")]
    PersistenceWriteFailed(String),

    // Variante para erros de banco de dados (backend Postgres)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Armazenamento local (arquivos JSON)
    #[error("Erro de armazenamento local")]
    StorageError(#[from] std::io::Error),

    // Geração do export em Excel
    #[error("Erro ao gerar a planilha de export")]
    ExportError(#[from] rust_xlsxwriter::XlsxError),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            // Campos obrigatórios sem coluna mapeada — a importação é abortada inteira.
            AppError::MappingIncomplete(missing) => {
                let body = Json(json!({
                    "error": "Por favor, mapeie os campos obrigatórios.",
                    "missingFields": missing,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string()),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente.".to_string()),
            AppError::ContactNotFound => (StatusCode::NOT_FOUND, "Contato não encontrado.".to_string()),
            AppError::ContactAlreadyExists => (
                StatusCode::CONFLICT,
                "Já existe um contato com esse título e telefone.".to_string(),
            ),
            AppError::ImportSessionNotFound => (StatusCode::NOT_FOUND, "Sessão de importação não encontrada.".to_string()),
            AppError::ImportStateInvalid(state) => (
                StatusCode::CONFLICT,
                format!("A importação não permite essa operação no estado '{state}'."),
            ),
            AppError::DecodeError(_) => (
                StatusCode::BAD_REQUEST,
                "Erro ao ler arquivo. Certifique-se que é um arquivo Excel válido.".to_string(),
            ),
            AppError::UnknownField(ref field) => (
                StatusCode::BAD_REQUEST,
                format!("O documento não possui o campo '{field}'."),
            ),
            AppError::PayloadInvalid(_) => (
                StatusCode::BAD_REQUEST,
                "Os dados enviados não correspondem ao formato do documento.".to_string(),
            ),
            // Indisponibilidade não bloqueia o usuário: 503 sinaliza o modo degradado.
            AppError::PersistenceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Sem conexão com o banco de dados. Trabalhando com dados locais.".to_string(),
            ),
            AppError::PersistenceWriteFailed(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Não foi possível salvar agora. Suas alterações continuam na tela.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
