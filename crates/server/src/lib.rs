//! Tradepost server library.
//!
//! This crate provides the server functionality as a library, allowing it
//! to be tested and reused. The binary in `main.rs` wires configuration,
//! the database pool, and the router together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;
