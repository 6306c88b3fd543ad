use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::{AppError, INVALID_TOKEN};

/// Authenticated identity for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Accepts only `Bearer <token>` where the token verifies. Every failure
/// yields the same rejection.
pub fn authenticate(
    header: Option<&str>,
    keys: &JwtKeys,
    now: OffsetDateTime,
) -> Result<AuthUser, AppError> {
    let Some(header) = header else {
        warn!("missing Authorization header");
        return Err(AppError::Unauthorized(INVALID_TOKEN));
    };

    let token = header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
        .ok_or_else(|| {
            warn!("malformed Authorization header");
            AppError::Unauthorized(INVALID_TOKEN)
        })?;

    match keys.verify_at(token, now) {
        Ok(claims) => Ok(AuthUser(claims.sub)),
        Err(e) => {
            warn!(reason = %e, "token rejected");
            Err(AppError::Unauthorized(INVALID_TOKEN))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(v) => Some(v.to_str().map_err(|_| AppError::Unauthorized(INVALID_TOKEN))?),
            None => None,
        };
        authenticate(header, &keys, OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use time::{macros::datetime, Duration};

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&AppConfig::for_tests().jwt)
    }

    fn assert_generic_reject(res: Result<AuthUser, AppError>) {
        match res {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, INVALID_TOKEN),
            other => panic!("expected generic 401, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_bearer_token() {
        let keys = keys();
        let now = datetime!(2025-01-01 0:00 UTC);
        let user_id = Uuid::new_v4();
        let header = format!("Bearer {}", keys.sign_at(user_id, now).unwrap());
        let user = authenticate(Some(&header), &keys, now).unwrap();
        assert_eq!(user, AuthUser(user_id));
    }

    #[test]
    fn missing_invalid_and_expired_look_the_same() {
        let keys = keys();
        let now = datetime!(2025-01-01 0:00 UTC);
        let token = keys.sign_at(Uuid::new_v4(), now).unwrap();

        assert_generic_reject(authenticate(None, &keys, now));
        assert_generic_reject(authenticate(Some("Bearer not-a-jwt"), &keys, now));
        assert_generic_reject(authenticate(
            Some(&format!("Bearer {token}")),
            &keys,
            now + Duration::days(8),
        ));
    }

    #[test]
    fn rejects_non_bearer_schemes() {
        let keys = keys();
        let now = datetime!(2025-01-01 0:00 UTC);
        let token = keys.sign_at(Uuid::new_v4(), now).unwrap();

        for header in [
            token.clone(),
            format!("Basic {token}"),
            format!("bearer {token}"),
            format!("Bearer  {token}"),
            format!("Bearer {token} extra"),
            "Bearer ".to_string(),
        ] {
            assert_generic_reject(authenticate(Some(&header), &keys, now));
        }
    }
}
