//! User domain types.

use chrono::{DateTime, Utc};

use tradepost_core::{Email, ProductId, UserId};

/// A storefront user (domain type).
///
/// The password hash never travels on this type; login flows fetch it
/// separately at the repository boundary.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Email address, unique across all users.
    pub email: Email,
    /// Optional profile image reference (URL in the image store).
    pub profile_image: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Optional postal address.
    pub address: Option<String>,
    /// Ordered cart references. Duplicates are possible; entries may go
    /// stale after a product deletion and are tolerated.
    pub cart_product: Vec<ProductId>,
    /// Favorite references (set semantics).
    pub fov_product: Vec<ProductId>,
    /// Admin flag; only ever transitions false to true.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug)]
pub struct NewUser {
    pub full_name: String,
    pub email: Email,
    pub password_hash: String,
    pub profile_image: Option<String>,
}
