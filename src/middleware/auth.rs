use crate::common::response::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVerifyStatus {
    Unverified,
    Verified,
    Banned,
}

/// Access-token payload. Tokens are issued by the user service; this service
/// only verifies them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub sub: String,
    pub verify: u8,
    pub exp: usize,
}

impl TokenClaims {
    pub fn verify_status(&self) -> UserVerifyStatus {
        match self.verify {
            1 => UserVerifyStatus::Verified,
            2 => UserVerifyStatus::Banned,
            _ => UserVerifyStatus::Unverified,
        }
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError("Unauthorized: Missing or invalid token".to_string(), StatusCode::UNAUTHORIZED))?;

    let claims = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError("Unauthorized: Invalid token signature".to_string(), StatusCode::UNAUTHORIZED))?
    .claims;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
