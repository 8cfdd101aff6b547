use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;

use crate::adapter::handler::error::AppError;
use crate::domain::entity::current_user::{Claims, CurrentUser};
use crate::infrastructure::config::AuthConfig;

/// JWT 検証に使う鍵と検証条件。
#[derive(Clone)]
pub struct FormDesignerAuthState {
    key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl FormDesignerAuthState {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        Self {
            key: Arc::new(DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes())),
            validation: Arc::new(validation),
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

/// Bearer トークンを検証し、`CurrentUser` をリクエスト拡張に格納する。
pub async fn auth_middleware(
    State(state): State<FormDesignerAuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req).ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    let claims = state.verify_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        AppError::unauthorized("Invalid or expired token")
    })?;

    req.extensions_mut().insert(CurrentUser::from(claims));
    Ok(next.run(req).await)
}

/// 認証が無効な環境では `system` として扱う。
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_else(CurrentUser::system))
    }
}

fn extract_bearer_token(req: &Request<Body>) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use secrecy::Secret;

    pub(crate) const SECRET: &str = "test-secret";

    pub(crate) fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: Secret::new(SECRET.to_string()),
            issuer: "k1s0".to_string(),
            audience: "form-designer".to_string(),
        }
    }

    pub(crate) fn token(sub: &str, issuer: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            name: Some("Alice".to_string()),
            exp: usize::try_from(chrono::Utc::now().timestamp() + exp_offset_secs).unwrap(),
            iss: Some(issuer.to_string()),
            aud: Some("form-designer".to_string()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.headers_mut().insert("Authorization", HeaderValue::from_static("Bearer my-token"));
        assert_eq!(extract_bearer_token(&req), Some("my-token".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_bearer_token(&req), None);
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.headers_mut().insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&req), None);
    }

    #[test]
    fn test_verify_token() {
        let state = FormDesignerAuthState::new(&config());
        let claims = state.verify_token(&token("alice", "k1s0", 600)).unwrap();
        assert_eq!(claims.sub, "alice");

        assert!(state.verify_token(&token("alice", "someone-else", 600)).is_err());
        assert!(state.verify_token(&token("alice", "k1s0", -600)).is_err());
    }
}
