//! User repository for database operations.
//!
//! Cart and favorites mutations are single `UPDATE` statements over the
//! user row's array columns, so each call is atomic at the document level.
//! The core never takes locks or opens transactions of its own.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tradepost_core::{Email, ProductId, UserId};

use super::RepositoryError;
use crate::models::user::{NewUser, User};

/// Raw `users` row as it comes back from Postgres.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    full_name: String,
    email: String,
    password_hash: String,
    profile_image: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    cart_product: Vec<i32>,
    fov_product: Vec<i32>,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(self.id),
            full_name: self.full_name,
            email,
            profile_image: self.profile_image,
            phone: self.phone,
            address: self.address,
            cart_product: self.cart_product.into_iter().map(ProductId::new).collect(),
            fov_product: self.fov_product.into_iter().map(ProductId::new).collect(),
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, full_name, email, password_hash, profile_image, phone, address, \
                            cart_product, fov_product, is_admin, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (full_name, email, password_hash, profile_image)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.full_name)
        .bind(new_user.email.as_str())
        .bind(&new_user.password_hash)
        .bind(&new_user.profile_image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_user()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user together with their password hash, for login.
    ///
    /// Returns `None` if no user has this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hash = row.password_hash.clone();
        Ok(Some((row.into_user()?, hash)))
    }

    /// Append a product reference to the user's cart.
    ///
    /// No membership check: two adds of the same product yield two entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_cart_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let row: Option<(Vec<i32>,)> = sqlx::query_as(
            "UPDATE users
             SET cart_product = array_append(cart_product, $2), updated_at = now()
             WHERE id = $1
             RETURNING cart_product",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let (cart,) = row.ok_or(RepositoryError::NotFound)?;
        Ok(cart.into_iter().map(ProductId::new).collect())
    }

    /// Filter a product reference out of the user's cart.
    ///
    /// Removing an absent reference is a no-op that still returns the
    /// (unchanged) cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn remove_cart_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let row: Option<(Vec<i32>,)> = sqlx::query_as(
            "UPDATE users
             SET cart_product = array_remove(cart_product, $2), updated_at = now()
             WHERE id = $1
             RETURNING cart_product",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let (cart,) = row.ok_or(RepositoryError::NotFound)?;
        Ok(cart.into_iter().map(ProductId::new).collect())
    }

    /// Append a product reference to the user's favorites, unless already
    /// present.
    ///
    /// Returns `None` when the guard didn't match (the reference is already
    /// in the set); callers establish user existence beforehand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_favorite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Vec<ProductId>>, RepositoryError> {
        let row: Option<(Vec<i32>,)> = sqlx::query_as(
            "UPDATE users
             SET fov_product = array_append(fov_product, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY (fov_product))
             RETURNING fov_product",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(favorites,)| favorites.into_iter().map(ProductId::new).collect()))
    }

    /// Filter a product reference out of the user's favorites.
    ///
    /// Removing an absent reference is a no-op that still returns the
    /// (unchanged) set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn remove_favorite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let row: Option<(Vec<i32>,)> = sqlx::query_as(
            "UPDATE users
             SET fov_product = array_remove(fov_product, $2), updated_at = now()
             WHERE id = $1
             RETURNING fov_product",
        )
        .bind(user_id.as_i32())
        .bind(product_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let (favorites,) = row.ok_or(RepositoryError::NotFound)?;
        Ok(favorites.into_iter().map(ProductId::new).collect())
    }

    /// Set the admin flag on the user with this email.
    ///
    /// The flag only transitions false to true; promoting an existing admin
    /// is a no-op that still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_admin_by_email(&self, email: &Email) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users
             SET is_admin = TRUE, updated_at = now()
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_user()
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }
}
