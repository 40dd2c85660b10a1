use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    dto::{LoginRequest, RegisterRequest, TokenResponse},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::User,
};
use crate::{error::ApiError, extract::ValidJson, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    if name.chars().count() < 2 {
        warn!("registration rejected: name too short");
        return Err(ApiError::Validation(
            "Name must be at least 2 characters long".into(),
        ));
    }

    if payload.password.chars().count() < 6 {
        warn!("registration rejected: password too short");
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "registration rejected: invalid email");
        return Err(ApiError::Validation(
            "Please enter a valid email address".into(),
        ));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "registration rejected: email already in use");
        return Err(ApiError::Conflict("Email already in use".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &name, &email, &hash).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "login rejected: invalid email");
        return Err(ApiError::Validation(
            "Please enter a valid email address".into(),
        ));
    }

    // Unknown email and wrong password answer identically so account
    // existence never leaks.
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Auth("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth("Invalid credentials".into()));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_checks() {
        assert!(is_valid_email("ann@x.com"));
        assert!(is_valid_email("a.b-c@sub.domain.io"));
        assert!(!is_valid_email("annx.com"));
        assert!(!is_valid_email("ann@xcom"));
        assert!(!is_valid_email("ann @x.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_rejects_short_name() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            name: " A ".into(),
            email: "ann@x.com".into(),
            password: "secret1".into(),
        };
        let err = register(State(state), ValidJson(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password: "12345".into(),
        };
        let err = register(State(state), ValidJson(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_malformed_email() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            name: "Ann".into(),
            email: "not-an-email".into(),
            password: "secret1".into(),
        };
        let err = register(State(state), ValidJson(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_rejects_malformed_email() {
        let state = AppState::fake();
        let payload = LoginRequest {
            email: "broken@".into(),
            password: "secret1".into(),
        };
        let err = login(State(state), ValidJson(payload)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
