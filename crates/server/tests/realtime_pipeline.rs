//! End-to-end tests for the fan-out pipeline: events published through the
//! broadcaster, received as wire frames, and reconciled into per-client
//! cached collections.

use tokio::sync::mpsc::{self, UnboundedReceiver};

use tradepost_core::{
    CollectionCache, Price, ProductId, ProductPayload, StoreEvent, UserId,
};
use tradepost_server::realtime::Broadcaster;

fn mug(id: i32) -> ProductPayload {
    ProductPayload {
        id: ProductId::new(id),
        product_name: "Mug".to_owned(),
        product_description: "A mug".to_owned(),
        product_price: Price::parse("9.99").expect("valid price"),
        product_image: "https://img.example/mug.jpg".to_owned(),
        created_by: UserId::new(1),
        created_at: "2026-01-01T00:00:00Z".parse().expect("valid timestamp"),
        updated_at: "2026-01-01T00:00:00Z".parse().expect("valid timestamp"),
    }
}

/// Receive one frame and decode it as a `StoreEvent`.
async fn recv_event(rx: &mut UnboundedReceiver<String>) -> StoreEvent {
    let frame = rx.recv().await.expect("expected a frame");
    serde_json::from_str(&frame).expect("frame decodes as StoreEvent")
}

/// Apply a product event to a client's cached collection.
fn reconcile(cache: &mut CollectionCache<ProductPayload>, event: StoreEvent) {
    match event {
        StoreEvent::ProductCreated(payload) => {
            cache.apply_created(payload);
        }
        StoreEvent::ProductUpdated(payload) => {
            cache.apply_updated(payload);
        }
        StoreEvent::ProductDeleted(id) => {
            cache.apply_deleted(id);
        }
        StoreEvent::CartAdded { .. } | StoreEvent::CartRemoved { .. } => {}
        StoreEvent::AdminUpdated { .. } => {}
    }
}

#[tokio::test]
async fn product_created_reaches_every_other_client() {
    let broadcaster = Broadcaster::new();

    let (tx_creator, mut rx_creator) = mpsc::unbounded_channel();
    let (tx_other, mut rx_other) = mpsc::unbounded_channel();
    let creator_conn = broadcaster.register(tx_creator);
    let other_conn = broadcaster.register(tx_other);
    broadcaster.identify(creator_conn, UserId::new(1));
    broadcaster.identify(other_conn, UserId::new(2));

    let payload = mug(10);
    broadcaster.publish(&StoreEvent::ProductCreated(payload.clone()));

    // Every connected client observes the event, with the stored id
    let event = recv_event(&mut rx_other).await;
    match &event {
        StoreEvent::ProductCreated(received) => {
            assert_eq!(received.id, payload.id);
            assert_eq!(received.product_name, "Mug");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // The creator also receives its own echo; its reconciler dedupes it
    // against the direct-response insertion
    let mut creator_cache = CollectionCache::from_items(vec![payload.clone()]);
    let echo = recv_event(&mut rx_creator).await;
    reconcile(&mut creator_cache, echo);
    assert_eq!(creator_cache.len(), 1);

    // The other client had no direct response; the event fills its cache
    let mut other_cache = CollectionCache::new();
    reconcile(&mut other_cache, event);
    assert_eq!(other_cache.len(), 1);
    assert_eq!(other_cache.items()[0], payload);
}

#[tokio::test]
async fn cart_added_reaches_only_the_acting_user() {
    let broadcaster = Broadcaster::new();

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let conn_a = broadcaster.register(tx_a);
    let conn_b = broadcaster.register(tx_b);
    broadcaster.identify(conn_a, UserId::new(1));
    broadcaster.identify(conn_b, UserId::new(2));

    broadcaster.publish(&StoreEvent::CartAdded {
        user_id: UserId::new(2),
        product_id: ProductId::new(10),
    });

    // User B's own connection receives the event, user A's does not
    let event = recv_event(&mut rx_b).await;
    assert_eq!(event.name(), "cart:added");
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_delete_events_reconcile_identically() {
    let broadcaster = Broadcaster::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    broadcaster.register(tx);

    let mut cache = CollectionCache::from_items(vec![mug(10), mug(11)]);

    // The same event delivered twice must leave the cache identical to a
    // single delivery
    broadcaster.publish(&StoreEvent::ProductDeleted(ProductId::new(10)));
    broadcaster.publish(&StoreEvent::ProductDeleted(ProductId::new(10)));

    reconcile(&mut cache, recv_event(&mut rx).await);
    let after_first = cache.clone();
    reconcile(&mut cache, recv_event(&mut rx).await);

    assert_eq!(cache, after_first);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.items()[0].id, ProductId::new(11));
}

#[tokio::test]
async fn update_then_echo_is_idempotent() {
    let broadcaster = Broadcaster::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    broadcaster.register(tx);

    let mut cache = CollectionCache::from_items(vec![mug(10)]);

    let mut updated = mug(10);
    updated.product_name = "Better Mug".to_owned();
    broadcaster.publish(&StoreEvent::ProductUpdated(updated.clone()));
    broadcaster.publish(&StoreEvent::ProductUpdated(updated));

    reconcile(&mut cache, recv_event(&mut rx).await);
    reconcile(&mut cache, recv_event(&mut rx).await);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.items()[0].product_name, "Better Mug");
}

#[tokio::test]
async fn late_joining_client_misses_earlier_events() {
    let broadcaster = Broadcaster::new();

    broadcaster.publish(&StoreEvent::ProductDeleted(ProductId::new(10)));

    // Connecting after the event fired: nothing is replayed
    let (tx, mut rx) = mpsc::unbounded_channel();
    broadcaster.register(tx);
    assert!(rx.try_recv().is_err());
}
