use tracing::{info, warn};

use super::{
    dto::{AuthResponse, CredentialsRequest},
    jwt::JwtKeys,
    password::{dummy_hash, hash_password_blocking, verify_password_blocking},
    repo::UserStore,
};
use crate::error::{AppError, AppResult, StoreError, INVALID_CREDENTIALS};

const MISSING_CREDENTIALS: &str = "Email and password are required.";

fn require_credentials(req: CredentialsRequest) -> AppResult<(String, String)> {
    match (req.email, req.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(AppError::Validation(MISSING_CREDENTIALS.into())),
    }
}

/// Registers a new user and issues their first token.
pub async fn signup(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: CredentialsRequest,
) -> AppResult<AuthResponse> {
    let (email, password) = require_credentials(req)?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(email_taken());
    }

    let hash = hash_password_blocking(password).await?;

    // the store's unique constraint settles races the check above can't see
    let user = match users.create(&email, &hash).await {
        Ok(u) => u,
        Err(StoreError::Conflict) => {
            warn!(email = %email, "email registered concurrently");
            return Err(email_taken());
        }
        Err(e) => return Err(e.into()),
    };

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

/// Verifies credentials and issues a fresh token. Unknown email and wrong
/// password produce the same error.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: CredentialsRequest,
) -> AppResult<AuthResponse> {
    let (email, password) = require_credentials(req)?;

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        // same Argon2 cost as a real mismatch; the outcome is ignored
        let _ = verify_password_blocking(password, dummy_hash().to_string()).await;
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

fn email_taken() -> AppError {
    AppError::Conflict("Email is already in use.".into())
}
