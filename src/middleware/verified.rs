use crate::common::response::ApiError;
use crate::middleware::auth::{TokenClaims, UserVerifyStatus};
use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

pub async fn verified_guard(
    Extension(claims): Extension<TokenClaims>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if claims.verify_status() != UserVerifyStatus::Verified {
        return Err(ApiError("Forbidden: User not verified".to_string(), StatusCode::FORBIDDEN));
    }

    Ok(next.run(req).await)
}
