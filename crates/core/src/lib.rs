//! Brewhouse Core - Shared domain types.
//!
//! This crate provides the types used by the storefront and its tests:
//!
//! - [`types`] - Typed ids, rupiah prices, emails, quantities and order statuses
//! - [`cart`] - The visitor's cart and its operations
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session access. The storefront decides where a [`Cart`] lives;
//! this crate decides how it behaves.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartItem, ProductSnapshot};
pub use types::*;
