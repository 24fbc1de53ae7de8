//! Broadcast event catalog and wire payloads.
//!
//! Every state change the server fans out to connected clients is one of
//! the [`StoreEvent`] variants. The enum serializes directly to the wire
//! frame `{"event": <name>, "data": <payload>}`, so the server and any
//! client agree on shape by construction.
//!
//! Events have no identity and are never persisted: delivery is
//! best-effort, at-most-once. A client connected after an event fires
//! never sees it and must reconcile via its own queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, Price, ProductId, UserId};

/// The set of connections eligible to receive an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Every connected client.
    All,
    /// Only the named user's connections.
    User(UserId),
}

/// The full product document as it travels on the wire.
///
/// This one shape is used both by REST read responses and by broadcast
/// payloads, so a reconciler merges broadcast items into the same cached
/// collection it filled from its initial query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    /// Product identity.
    pub id: ProductId,
    /// Product display name.
    pub product_name: String,
    /// Product description.
    pub product_description: String,
    /// Non-negative price, serialized as a decimal string.
    pub product_price: Price,
    /// Image reference (URL in the image store).
    pub product_image: String,
    /// The user who created the product.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A broadcast event.
///
/// Serializes to the wire frame `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StoreEvent {
    /// A product was created. Payload: the full product document.
    #[serde(rename = "product:created")]
    ProductCreated(ProductPayload),

    /// A product was updated. Payload: the full product document.
    #[serde(rename = "product:updated")]
    ProductUpdated(ProductPayload),

    /// A product was deleted. Payload: the product id.
    #[serde(rename = "product:deleted")]
    ProductDeleted(ProductId),

    /// A product was added to the acting user's cart.
    #[serde(rename = "cart:added", rename_all = "camelCase")]
    CartAdded {
        /// The acting user.
        user_id: UserId,
        /// The product appended to the cart.
        product_id: ProductId,
    },

    /// A product was removed from the acting user's cart.
    #[serde(rename = "cart:removed", rename_all = "camelCase")]
    CartRemoved {
        /// The acting user.
        user_id: UserId,
        /// The product filtered out of the cart.
        product_id: ProductId,
    },

    /// A user was promoted to admin.
    #[serde(rename = "user:admin-updated", rename_all = "camelCase")]
    AdminUpdated {
        /// The promoted user.
        user_id: UserId,
        /// The promoted user's email.
        email: Email,
        /// Always `true`; the flag never transitions back.
        is_admin: bool,
    },
}

impl StoreEvent {
    /// The event's wire name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProductCreated(_) => "product:created",
            Self::ProductUpdated(_) => "product:updated",
            Self::ProductDeleted(_) => "product:deleted",
            Self::CartAdded { .. } => "cart:added",
            Self::CartRemoved { .. } => "cart:removed",
            Self::AdminUpdated { .. } => "user:admin-updated",
        }
    }

    /// The set of connections this event is delivered to.
    #[must_use]
    pub const fn scope(&self) -> EventScope {
        match self {
            Self::ProductCreated(_)
            | Self::ProductUpdated(_)
            | Self::ProductDeleted(_)
            | Self::AdminUpdated { .. } => EventScope::All,
            Self::CartAdded { user_id, .. } | Self::CartRemoved { user_id, .. } => {
                EventScope::User(*user_id)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_product() -> ProductPayload {
        ProductPayload {
            id: ProductId::new(1),
            product_name: "Mug".to_owned(),
            product_description: "A mug".to_owned(),
            product_price: Price::parse("9.99").unwrap(),
            product_image: "https://img.example/mug.jpg".to_owned(),
            created_by: UserId::new(2),
            created_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            updated_at: "2026-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(
            StoreEvent::ProductCreated(sample_product()).name(),
            "product:created"
        );
        assert_eq!(
            StoreEvent::ProductDeleted(ProductId::new(1)).name(),
            "product:deleted"
        );
        assert_eq!(
            StoreEvent::CartAdded {
                user_id: UserId::new(1),
                product_id: ProductId::new(2),
            }
            .name(),
            "cart:added"
        );
    }

    #[test]
    fn test_product_events_are_global() {
        assert_eq!(
            StoreEvent::ProductCreated(sample_product()).scope(),
            EventScope::All
        );
        assert_eq!(
            StoreEvent::ProductDeleted(ProductId::new(3)).scope(),
            EventScope::All
        );
        assert_eq!(
            StoreEvent::AdminUpdated {
                user_id: UserId::new(1),
                email: Email::parse("a@x.com").unwrap(),
                is_admin: true,
            }
            .scope(),
            EventScope::All
        );
    }

    #[test]
    fn test_cart_events_are_user_scoped() {
        let event = StoreEvent::CartAdded {
            user_id: UserId::new(7),
            product_id: ProductId::new(8),
        };
        assert_eq!(event.scope(), EventScope::User(UserId::new(7)));
    }

    #[test]
    fn test_frame_shape_cart_added() {
        let event = StoreEvent::CartAdded {
            user_id: UserId::new(1),
            product_id: ProductId::new(2),
        };
        let frame = serde_json::to_value(&event).unwrap();
        assert_eq!(
            frame,
            serde_json::json!({
                "event": "cart:added",
                "data": { "userId": 1, "productId": 2 }
            })
        );
    }

    #[test]
    fn test_frame_shape_product_deleted_carries_bare_id() {
        let event = StoreEvent::ProductDeleted(ProductId::new(42));
        let frame = serde_json::to_value(&event).unwrap();
        assert_eq!(
            frame,
            serde_json::json!({ "event": "product:deleted", "data": 42 })
        );
    }

    #[test]
    fn test_frame_shape_product_created_uses_camel_case() {
        let event = StoreEvent::ProductCreated(sample_product());
        let frame = serde_json::to_value(&event).unwrap();
        assert_eq!(frame["event"], "product:created");
        assert_eq!(frame["data"]["productName"], "Mug");
        assert_eq!(frame["data"]["productPrice"], "9.99");
        assert_eq!(frame["data"]["createdBy"], 2);
    }

    #[test]
    fn test_frame_roundtrip() {
        let event = StoreEvent::AdminUpdated {
            user_id: UserId::new(5),
            email: Email::parse("b@x.com").unwrap(),
            is_admin: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: StoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
