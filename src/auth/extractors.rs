use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, repo::User};
use crate::{error::ApiError, state::AppState};

/// Extracts and validates the bearer token, resolves the subject against the
/// user store, and yields the authenticated user's ID. Handlers must take
/// ownership identity from here and nowhere else.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Auth("Unauthorized".into()))?;

        // "Bearer <token>" preferred, bare token tolerated.
        let token = auth.strip_prefix("Bearer ").unwrap_or(auth).trim();
        if token.is_empty() {
            return Err(ApiError::Auth("Unauthorized".into()));
        }

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "jwt verification failed");
            ApiError::Auth("Invalid token".into())
        })?;

        if !User::exists(&state.db, claims.sub).await? {
            warn!(user_id = %claims.sub, "token subject no longer exists");
            return Err(ApiError::Auth("Unauthorized".into()));
        }

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/todos");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn empty_bearer_is_rejected() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer "));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_store_access() {
        let state = AppState::fake();
        // No scheme prefix on purpose: the raw value is treated as the token.
        let mut parts = parts_with_auth(Some("definitely-not-a-jwt"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}
