//! Product route handlers.
//!
//! Create, update, and delete are authenticated mutations that fan their
//! events out globally; reads are public except the per-owner listing.
//! One payload shape ([`ProductPayload`]) serves both REST responses and
//! broadcast events, so client reconcilers merge a single shape.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use tradepost_core::{Price, ProductId, ProductPayload, StoreEvent, UserId};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{AuthContext, OptionalAuth, RequireAuth};
use crate::models::product::{NewProduct, Product, ProductPatch};
use crate::routes::forms::{FormData, UploadedImage};
use crate::services::images::{self, PRODUCT_FOLDER};
use crate::state::AppState;

/// Create a product.
///
/// Multipart form: `productName`, `productDescription`, `productPrice`,
/// and a `productImage` file. All are mandatory. Fans out
/// `product:created` globally on success (201).
pub async fn create_product(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let form = FormData::from_multipart(multipart).await?;

    let (Some(name), Some(description), Some(price)) = (
        form.text("productName"),
        form.text("productDescription"),
        form.text("productPrice"),
    ) else {
        return Err(AppError::Validation("All fields are required".to_owned()));
    };
    let price = Price::parse(price).map_err(|e| AppError::Validation(e.to_string()))?;

    let image = form
        .image("productImage")
        .ok_or_else(|| AppError::Validation("Product image is required".to_owned()))?;
    let image_url = upload_product_image(&state, image).await?;

    let product = ProductRepository::new(state.pool())
        .create(&NewProduct {
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            image: image_url,
            created_by: auth.user_id,
        })
        .await?;

    let payload = ProductPayload::from(product);
    state
        .broadcaster()
        .publish(&StoreEvent::ProductCreated(payload.clone()));

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "product": payload,
        })),
    ))
}

/// Patch a product's fields, optionally replacing its image.
///
/// The caller must be the product's owner or an admin. Fans out
/// `product:updated` globally on success.
pub async fn update_product(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(product_id);
    let products = ProductRepository::new(state.pool());

    let existing = products
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
    ensure_can_modify(&state, auth, &existing).await?;

    let form = FormData::from_multipart(multipart).await?;

    let price = form
        .text("productPrice")
        .map(Price::parse)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let image = match form.image("productImage") {
        Some(image) => Some(upload_product_image(&state, image).await?),
        None => None,
    };

    let patch = ProductPatch {
        name: form.text("productName").map(ToOwned::to_owned),
        description: form.text("productDescription").map(ToOwned::to_owned),
        price,
        image,
    };

    let product = products
        .update(product_id, &patch)
        .await
        .map_err(product_not_found)?;

    let payload = ProductPayload::from(product);
    state
        .broadcaster()
        .publish(&StoreEvent::ProductUpdated(payload.clone()));

    Ok(Json(json!({
        "message": "Product updated successfully",
        "product": payload,
    })))
}

/// Delete a product.
///
/// The caller must be the product's owner or an admin. Fans out
/// `product:deleted` (carrying the id) globally on success. References to
/// the deleted product left in carts and favorites are not cleaned up;
/// readers tolerate them.
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(product_id);
    let products = ProductRepository::new(state.pool());

    let existing = products
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
    ensure_can_modify(&state, auth, &existing).await?;

    let product = products
        .delete(product_id)
        .await
        .map_err(product_not_found)?;

    state
        .broadcaster()
        .publish(&StoreEvent::ProductDeleted(product_id));

    Ok(Json(json!({
        "message": "Product deleted successfully",
        "product": ProductPayload::from(product),
    })))
}

/// Get a product by id. Public.
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductPayload>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(ProductId::new(product_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    Ok(Json(ProductPayload::from(product)))
}

/// List all products in creation order. Public; a valid token only adds
/// the caller to the request trace.
pub async fn get_all_products(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> Result<Json<Vec<ProductPayload>>> {
    if let Some(auth) = auth {
        tracing::debug!(user_id = %auth.user_id, "Listing products for known user");
    }

    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(products.into_iter().map(ProductPayload::from).collect()))
}

/// List the products created by one user.
pub async fn get_products_by_user(
    State(state): State<AppState>,
    RequireAuth(_auth): RequireAuth,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<ProductPayload>>> {
    let products = ProductRepository::new(state.pool())
        .list_by_owner(UserId::new(user_id))
        .await?;
    Ok(Json(products.into_iter().map(ProductPayload::from).collect()))
}

/// Validate and upload a product image, returning its stored URL.
async fn upload_product_image(state: &AppState, image: &UploadedImage) -> Result<String> {
    if !images::is_supported_format(&image.content_type) {
        return Err(AppError::Validation("Unsupported image format".to_owned()));
    }

    let url = state
        .images()
        .upload(
            PRODUCT_FOLDER,
            &image.filename,
            &image.content_type,
            image.bytes.clone(),
        )
        .await?;

    Ok(url)
}

/// Ownership gate for update and delete: the product's owner, or an admin.
async fn ensure_can_modify(
    state: &AppState,
    auth: AuthContext,
    product: &Product,
) -> Result<()> {
    if product.created_by == auth.user_id {
        return Ok(());
    }

    let caller = UserRepository::new(state.pool())
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".to_owned()))?;

    if caller.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not own this product".to_owned(),
        ))
    }
}

/// Map a missing-product repository error to the client-facing 404.
fn product_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_owned()),
        other => other.into(),
    }
}
