//! Core types and pure logic for the Fluffy link-in-bio service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the invariants: handle normalization, canonical link URLs, dense link
//! ordering, visit attribution keys and audit entries. Storage backends
//! implement [`store::ProfileStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod admin;
pub mod audit;
pub mod error;
pub mod handle;
pub mod link;
pub mod platform;
pub mod store;
pub mod theme;
pub mod user;
pub mod visit;

pub use error::{DomainError, Error, Result};
