//! Product domain types.

use chrono::{DateTime, Utc};

use tradepost_core::{Price, ProductId, ProductPayload, UserId};

/// A product listing (domain type).
#[derive(Debug, Clone)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Non-negative price.
    pub price: Price,
    /// Image reference (URL in the image store).
    pub image: String,
    /// The user who created the product. Recorded at creation; update and
    /// delete require the caller to be this user or an admin.
    pub created_by: UserId,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductPayload {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            product_name: product.name,
            product_description: product.description,
            product_price: product.price,
            product_image: product.image,
            created_by: product.created_by,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Input for creating a product.
#[derive(Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image: String,
    pub created_by: UserId,
}

/// A partial update; `None` fields keep their stored value.
#[derive(Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
}
