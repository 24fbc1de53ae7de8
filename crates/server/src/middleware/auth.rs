//! Authentication extractors.
//!
//! Identity is threaded into handlers as an explicit typed value
//! ([`AuthContext`]) produced per request by the [`RequireAuth`]
//! extractor, never by mutating shared request state. The guard is
//! stateless: it verifies the `token` cookie's signature and expiry
//! against the shared secret and attaches nothing but the user id.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use tradepost_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Identity context derived from a verified token.
///
/// Carries the user id only; lives for one request.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    /// The authenticated user.
    pub user_id: UserId,
}

/// Extractor that requires a valid session token.
///
/// Rejects with 401 `Unauthenticated` when no token cookie is present and
/// 401 `InvalidToken` when the signature is bad or the token expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(auth): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, user {}!", auth.user_id)
/// }
/// ```
pub struct RequireAuth(pub AuthContext);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let cookie = jar.get(TOKEN_COOKIE).ok_or_else(|| {
            AppError::Unauthenticated("No token provided, authorization denied".to_owned())
        })?;

        let user_id = state.tokens().verify(cookie.value())?;

        Ok(Self(AuthContext { user_id }))
    }
}

/// Extractor that optionally resolves the caller's identity.
///
/// Unlike `RequireAuth`, this does not reject the request when the token
/// is missing or invalid; read-only endpoints use it to personalize
/// results when possible.
pub struct OptionalAuth(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let context = jar
            .get(TOKEN_COOKIE)
            .and_then(|cookie| state.tokens().verify(cookie.value()).ok())
            .map(|user_id| AuthContext { user_id });

        Ok(Self(context))
    }
}

/// Build the session cookie carrying a freshly issued token.
///
/// Http-only, 1-hour max-age, matching the token's own expiry.
#[must_use]
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(1))
        .build()
}

/// Build the cookie used to clear the session on logout.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_owned());
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(1)));
    }

    #[test]
    fn test_removal_cookie_targets_same_path() {
        let cookie = removal_cookie();
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.path(), Some("/"));
    }
}
