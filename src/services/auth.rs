// src/services/auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    models::auth::{AuthUser, Claims, ConfiguredUser},
};

// O desenho do protocolo de autenticação é do provedor de identidade; aqui só
// conferimos credenciais provisionadas por ambiente e emitimos/validamos o
// token que carrega o rótulo usado na presença.
#[derive(Clone)]
pub struct AuthService {
    users: Vec<ConfiguredUser>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(users: Vec<ConfiguredUser>, jwt_secret: String) -> Self {
        Self { users, jwt_secret }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(&user)
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthUser, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(AuthUser {
            email: token_data.claims.sub,
            label: token_data.claims.name,
        })
    }

    fn create_token(&self, user: &ConfiguredUser) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user.email.clone(),
            name: user.label.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

// Formato do APP_USERS: "email:Rótulo:hash-bcrypt" separados por vírgula.
// O hash não contém ':' além dos internos do bcrypt ($2b$...), então o split
// em 3 partes é seguro.
pub fn parse_users(raw: &str) -> Vec<ConfiguredUser> {
    raw.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let mut parts = entry.splitn(3, ':');
            let email = parts.next()?.trim().to_string();
            let label = parts.next()?.trim().to_string();
            let password_hash = parts.next()?.trim().to_string();
            if email.is_empty() || password_hash.is_empty() {
                tracing::warn!("Entrada de APP_USERS ignorada (incompleta)");
                return None;
            }
            Some(ConfiguredUser { email, label, password_hash })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        let hash = bcrypt::hash("senha-forte", 4).unwrap();
        let users = vec![ConfiguredUser {
            email: "danilo@agencia.com".to_string(),
            label: "Danilo Silva".to_string(),
            password_hash: hash,
        }];
        AuthService::new(users, "segredo-de-teste".to_string())
    }

    #[tokio::test]
    async fn login_emite_token_com_rotulo() {
        let service = service();
        let token = service.login_user("danilo@agencia.com", "senha-forte").await.unwrap();
        let user = service.validate_token(&token).unwrap();
        assert_eq!(user.email, "danilo@agencia.com");
        assert_eq!(user.label, "Danilo Silva");
    }

    #[tokio::test]
    async fn senha_errada_e_credencial_invalida() {
        let service = service();
        let err = service.login_user("danilo@agencia.com", "outra").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn usuario_desconhecido_e_credencial_invalida() {
        let service = service();
        let err = service.login_user("x@y.com", "senha-forte").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn token_adulterado_e_invalido() {
        let service = service();
        let err = service.validate_token("abc.def.ghi").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn parse_users_aceita_varias_entradas() {
        let users = parse_users(
            "a@b.com:Ana:$2b$04$hash1, c@d.com:Carlos:$2b$04$hash2, ,incompleto",
        );
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].label, "Ana");
        assert_eq!(users[1].email, "c@d.com");
    }
}
