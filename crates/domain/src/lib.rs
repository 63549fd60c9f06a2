//! Domain layer for the order management system.
//!
//! This crate provides the order aggregate and its supporting types:
//! - [`Order`] with its lifecycle state machine and total-price invariant
//! - [`OrderState`] and the permitted transitions between states
//! - Value objects: [`OrderItem`], [`Money`], [`CustomerId`], [`ProductId`],
//!   [`PickupLocation`]
//!
//! Everything here is pure logic: no I/O, no shared state.

pub mod order;

pub use order::{
    CustomerId, Money, Order, OrderError, OrderItem, OrderState, PickupLocation, ProductId,
};
