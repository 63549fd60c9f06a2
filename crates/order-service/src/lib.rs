//! Order coordination layer.
//!
//! [`OrderService`] orchestrates every order mutation: it validates input,
//! drives the aggregate, persists through an [`order_store::OrderStore`],
//! and only then publishes the confirmed state into the injected
//! [`liveview::LiveOrderIndex`]. Read-only queries pass straight through to
//! the store; the index exists for push-based observers, not ad hoc queries.

pub mod error;
pub mod service;

pub use error::ServiceError;
pub use service::OrderService;
