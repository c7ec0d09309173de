//! Core types for Till.
//!
//! This module provides type-safe wrappers for the order-capture domain.

pub mod cart;
pub mod id;
pub mod order;
pub mod phone;
pub mod price;
pub mod product;
pub mod status;

pub use cart::{CartLine, LineKey};
pub use id::*;
pub use order::{Customer, CustomerProfile, Order, QueueEntry};
pub use phone::{Phone, PhoneError};
pub use price::Money;
pub use product::{Category, Product, Variety};
pub use status::*;
