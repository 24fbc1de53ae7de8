//! HTTP middleware and request extractors.

pub mod auth;

pub use auth::{AuthContext, OptionalAuth, RequireAuth, removal_cookie, session_cookie};
