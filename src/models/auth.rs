// src/models/auth.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

// Usuário provisionado por variável de ambiente (APP_USERS). O cadastro em si
// é responsabilidade do provedor de identidade; aqui só guardamos o necessário
// para validar credenciais e etiquetar a presença.
#[derive(Debug, Clone)]
pub struct ConfiguredUser {
    pub email: String,
    pub label: String,
    // IMPORTANTE: nunca serializar
    pub password_hash: String,
}

// Identidade extraída de um token validado.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub email: String,
    pub label: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (e-mail do usuário)
    pub name: String, // Rótulo exibido nas notificações de presença
    pub exp: usize,   // Expiration time (quando o token expira)
    pub iat: usize,   // Issued At (quando o token foi criado)
}
