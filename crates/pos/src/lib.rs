//! Till POS library.
//!
//! The order-capture core of the till: product selections become cart lines,
//! the cart becomes an order, and the order reaches the remote order service
//! either directly or, when the service cannot be reached, through a durable
//! offline queue that is replayed later.
//!
//! # Components
//!
//! - [`variant`] - per-product size selection before it reaches the cart
//! - [`cart`] - the live cart, persisted on every change
//! - [`store`] - local persistence (`SQLite` or in-memory)
//! - [`queue`] / [`sync`] - offline order queue and its reconciliation
//! - [`history`] - order log reporting by day
//! - [`catalog`], [`customers`], [`kot`], [`billing`], [`checkout`] - the
//!   rest of the till
//! - [`register`] - wires all of the above for one session

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod customers;
pub mod error;
pub mod history;
pub mod kot;
pub mod queue;
pub mod register;
pub mod remote;
pub mod store;
pub mod sync;
pub mod variant;

pub use config::{ConfigError, FeatureGrant, LogFormat, TillConfig};
pub use error::{Result, TillError};
pub use register::{Checkout, Register};
