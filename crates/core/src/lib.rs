//! Till Core - Shared domain types library.
//!
//! This crate provides the types used across all Till components:
//! - `till-pos` - Order capture, offline queue and reconciliation
//! - `till-cli` - Operator command line
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money and phone numbers, plus the
//!   catalog, cart and order records exchanged with the remote service

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
