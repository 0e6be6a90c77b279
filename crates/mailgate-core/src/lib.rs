//! # mailgate-core
//!
//! Foundation types and domain logic for the Mailgate control plane.
//!
//! This crate provides the shared vocabulary the store and server crates
//! depend on:
//!
//! - **Domain types**: [`types::RoutingRule`], [`types::SystemControlState`],
//!   [`types::AuditLogEntry`], [`types::SystemSettings`], [`types::EmailEvent`]
//! - **Errors**: [`errors::CoreError`] taxonomy via `thiserror`
//! - **Validation**: [`validate`] — identifier pattern, address normalization
//! - **Usage accounting**: [`usage`] — monthly token/cost reports, day
//!   bucketing in the fixed reference timezone
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other mailgate crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod time;
pub mod types;
pub mod usage;
pub mod validate;

pub use errors::{CoreError, Result};
