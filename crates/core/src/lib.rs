//! Tradepost Core - Shared types library.
//!
//! This crate provides the types shared between the Tradepost server and
//! any connected client:
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails
//! - [`events`] - The broadcast event catalog and wire payloads
//! - [`reconcile`] - Client-side reconciliation of broadcast events into
//!   locally cached collections
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere, including inside client binaries.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod events;
pub mod reconcile;
pub mod types;

pub use events::{EventScope, ProductPayload, StoreEvent};
pub use reconcile::{CollectionCache, Keyed};
pub use types::*;
