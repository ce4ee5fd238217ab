//! Domain types shared by the Shopfront API server and `shop-cli`.
//!
//! Nothing here performs I/O. The `postgres` feature adds `sqlx` encoding for
//! the types stored in columns ([`UserId`], [`Email`], [`OrderStatus`], ...);
//! without it the crate depends only on `serde`, `rust_decimal` and
//! `thiserror`.
//!
//! - [`types::id`]: per-entity integer keys
//! - [`types::email`]: normalized email addresses
//! - [`types::price`]: money rounding and column limits
//! - [`types::status`]: roles, order status transitions and payment status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
