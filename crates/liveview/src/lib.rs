//! Process-wide live view of orders.
//!
//! This crate provides the read-optimized mirror of persisted orders that
//! many concurrent sessions observe without re-querying the store:
//! - [`LiveOrderIndex`] — the concurrently mutable, concurrently readable
//!   collection of live order snapshots
//! - [`OrderSnapshot`] — an immutable point-in-time view handed to readers
//!   and subscribers
//! - [`OrderStats`] and [`StatsBoard`] — derived counts recomputed on every
//!   mutation and published as independently observable values
//!
//! The index is always a cache of confirmed durable state: callers publish
//! into it only after the store acknowledged the corresponding write. It is
//! constructed explicitly at composition time and injected wherever it is
//! needed; there are no globals here.

pub mod index;
pub mod stats;

pub use index::{LiveOrderIndex, OrderSnapshot, SubscriptionId};
pub use stats::{OrderStats, StatsBoard};
