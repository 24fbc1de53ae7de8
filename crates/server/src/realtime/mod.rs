//! Real-time fan-out.
//!
//! After select mutations succeed, their handlers hand a
//! [`tradepost_core::StoreEvent`] to the [`broadcaster::Broadcaster`],
//! which delivers it to every eligible WebSocket connection. Delivery is
//! at-most-once, best-effort, fire-and-forget: no acknowledgement, no
//! retry, no persistence of missed events. Clients that connect later
//! reconcile via their own queries.

pub mod broadcaster;
pub mod ws;

pub use broadcaster::{Broadcaster, ConnectionId};
