//! User route handlers.
//!
//! Registration, login, session checks, cart and favorites mutations, and
//! admin operations. Cart mutations fan out `cart:added`/`cart:removed`
//! to the acting user's own connections; promotion fans out
//! `user:admin-updated` globally.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use tradepost_core::{Email, ProductId, StoreEvent, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, removal_cookie, session_cookie};
use crate::models::user::User;
use crate::routes::forms::FormData;
use crate::services::auth::AuthService;
use crate::services::images::{self, PROFILE_FOLDER};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Promote-to-admin request body.
#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub email: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// The user document as returned by register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub profile_image: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            profile_image: user.profile_image,
        }
    }
}

/// The caller's own profile, including cart and favorites.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub profile_image: Option<String>,
    pub cart_product: Vec<ProductId>,
    pub fov_product: Vec<ProductId>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            profile_image: user.profile_image,
            cart_product: user.cart_product,
            fov_product: user.fov_product,
        }
    }
}

/// A user document minus the password hash, for the admin listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub profile_image: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cart_product: Vec<ProductId>,
    pub fov_product: Vec<ProductId>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            profile_image: user.profile_image,
            phone: user.phone,
            address: user.address,
            cart_product: user.cart_product,
            fov_product: user.fov_product,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// Auth Handlers
// =============================================================================

/// Register a new account.
///
/// Multipart form: `fullName`, `email`, `password`, and a `profileImage`
/// file. On success, issues a session token cookie and returns the user
/// document (201).
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>)> {
    let form = FormData::from_multipart(multipart).await?;

    let (Some(full_name), Some(email), Some(password)) = (
        form.text("fullName"),
        form.text("email"),
        form.text("password"),
    ) else {
        return Err(AppError::Validation("All fields are required".to_owned()));
    };

    let image = form
        .image("profileImage")
        .ok_or_else(|| AppError::Validation("Profile image is required".to_owned()))?;
    if !images::is_supported_format(&image.content_type) {
        return Err(AppError::Validation("Unsupported image format".to_owned()));
    }

    let profile_image = state
        .images()
        .upload(
            PROFILE_FOLDER,
            &image.filename,
            &image.content_type,
            image.bytes.clone(),
        )
        .await?;

    let user = AuthService::new(state.pool())
        .register(full_name, email, password, Some(profile_image))
        .await?;

    let token = state.tokens().issue(user.id)?;
    let jar = jar.add(session_cookie(token));

    Ok((StatusCode::CREATED, jar, Json(UserResponse::from(user))))
}

/// Login with email and password.
///
/// On success, issues a session token cookie and returns the user document.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>)> {
    let (Some(email), Some(password)) = (request.email.as_deref(), request.password.as_deref())
    else {
        return Err(AppError::Validation("All fields are required".to_owned()));
    };

    let user = AuthService::new(state.pool()).login(email, password).await?;

    let token = state.tokens().issue(user.id)?;
    let jar = jar.add(session_cookie(token));

    Ok((jar, Json(UserResponse::from(user))))
}

/// Clear the session cookie.
pub async fn logout(RequireAuth(_auth): RequireAuth, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(removal_cookie());
    (jar, Json(json!({ "message": "Logout successful" })))
}

/// Report whether the caller's token is valid.
///
/// Reaching this handler means the auth guard already verified the token.
pub async fn check_authentication(RequireAuth(_auth): RequireAuth) -> Json<Value> {
    Json(json!({ "Authentication": true }))
}

/// Return the caller's own profile, without the password hash.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let user = AuthService::new(state.pool()).get_user(auth.user_id).await?;
    Ok(Json(ProfileResponse::from(user)))
}

// =============================================================================
// Cart Handlers
// =============================================================================

/// Append a product reference to the caller's cart.
///
/// No membership check: adding the same product twice yields two entries.
/// Fans out `cart:added` to the caller's own connections.
pub async fn add_cart(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(product_id);

    let cart = UserRepository::new(state.pool())
        .add_cart_product(auth.user_id, product_id)
        .await
        .map_err(user_not_found)?;

    state.broadcaster().publish(&StoreEvent::CartAdded {
        user_id: auth.user_id,
        product_id,
    });

    Ok(Json(json!({
        "message": "Product added to cart successfully",
        "cart": cart,
    })))
}

/// Filter a product reference out of the caller's cart.
///
/// Removing an absent reference is a no-op that still returns the
/// unchanged cart. Fans out `cart:removed` to the caller's own connections.
pub async fn remove_cart(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(product_id);

    let cart = UserRepository::new(state.pool())
        .remove_cart_product(auth.user_id, product_id)
        .await
        .map_err(user_not_found)?;

    state.broadcaster().publish(&StoreEvent::CartRemoved {
        user_id: auth.user_id,
        product_id,
    });

    Ok(Json(json!({
        "message": "Product removed from cart successfully",
        "cart": cart,
    })))
}

// =============================================================================
// Favorites Handlers
// =============================================================================

/// Add a product reference to the caller's favorites.
///
/// Favorites are a set: adding a reference already present is a 400.
pub async fn add_favorite(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(product_id);
    let users = UserRepository::new(state.pool());

    let user = users
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    if user.fov_product.contains(&product_id) {
        return Err(AppError::Validation(
            "Product already in favorites".to_owned(),
        ));
    }

    // The repository guard re-checks membership, closing the race between
    // the read above and this write
    let favorites = users
        .add_favorite(auth.user_id, product_id)
        .await?
        .ok_or_else(|| AppError::Validation("Product already in favorites".to_owned()))?;

    Ok(Json(json!({
        "message": "Product added to favorites successfully",
        "fovProduct": favorites,
    })))
}

/// Filter a product reference out of the caller's favorites.
///
/// Removing an absent reference is a no-op that still returns the
/// unchanged set.
pub async fn remove_favorite(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(product_id);

    let favorites = UserRepository::new(state.pool())
        .remove_favorite(auth.user_id, product_id)
        .await
        .map_err(user_not_found)?;

    Ok(Json(json!({
        "message": "Product removed from favorites successfully",
        "fovProduct": favorites,
    })))
}

// =============================================================================
// Admin Handlers
// =============================================================================

/// Promote the user with the given email to admin.
///
/// The caller must already be an admin. The flag only transitions false to
/// true. Fans out `user:admin-updated` globally on success; a 404 emits
/// nothing.
pub async fn promote_to_admin(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Json(request): Json<AdminRequest>,
) -> Result<Json<Value>> {
    let users = UserRepository::new(state.pool());

    let caller = users
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".to_owned()))?;
    if !caller.is_admin {
        return Err(AppError::Forbidden(
            "Forbidden: Admin access required".to_owned(),
        ));
    }

    let Some(email) = request.email.as_deref() else {
        return Err(AppError::Validation("Email is required.".to_owned()));
    };
    let email = Email::parse(email)
        .map_err(|_| AppError::Validation("Invalid email address".to_owned()))?;

    let user = users.set_admin_by_email(&email).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound("User not found.".to_owned()),
        other => other.into(),
    })?;

    state.broadcaster().publish(&StoreEvent::AdminUpdated {
        user_id: user.id,
        email: user.email,
        is_admin: true,
    });

    Ok(Json(json!({
        "message": "User promoted to admin successfully.",
    })))
}

/// List all users, minus password hashes. Admin only.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<Vec<UserRecord>>> {
    let users = UserRepository::new(state.pool());

    let caller = users
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".to_owned()))?;
    if !caller.is_admin {
        return Err(AppError::Forbidden(
            "Forbidden: Admin access required".to_owned(),
        ));
    }

    let all = users.list_all().await?;
    Ok(Json(all.into_iter().map(UserRecord::from).collect()))
}

/// Map a missing-user repository error to the client-facing 404.
fn user_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("User not found".to_owned()),
        other => other.into(),
    }
}
