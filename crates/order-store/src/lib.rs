//! Durable order persistence.
//!
//! This crate owns the [`OrderStore`] trait and its two implementations:
//! - [`InMemoryOrderStore`] for tests and embedded use
//! - [`PostgresOrderStore`] for production
//!
//! A save of an id-less order inserts it and assigns id and version; a save
//! of a persisted order is an optimistic update that must carry the current
//! version and bumps it by one on success.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
