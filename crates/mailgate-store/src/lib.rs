//! # mailgate-store
//!
//! SQLite persistence for the Mailgate control plane.
//!
//! Layering, leaves first:
//!
//! - [`connection`] — r2d2 connection pool, pragmas
//! - [`migrations`] — sequential `user_version`-gated schema batches
//! - [`repositories`] — stateless per-collection repos; every method
//!   takes `&Connection`
//! - [`store`] — the high-level [`ControlStore`] implementing the
//!   control-plane contracts (rule store, system control, settings,
//!   audit trail, usage reads, event queries) on top of the repos
//!
//! Each document collection from the persisted layout maps to one
//! table. Partial updates write only the supplied columns, which is
//! exactly the field-level last-write-wins merge the store guarantees:
//! two admins editing different fields of the same rule do not
//! conflict; editing the same field is a silent overwrite race (an
//! accepted limitation, not a bug).

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::{ConnectionPool, PooledConnection, open_pool};
pub use errors::{Result, StoreError};
pub use store::ControlStore;
