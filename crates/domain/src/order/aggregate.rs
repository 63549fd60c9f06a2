//! Order aggregate implementation.

use chrono::{DateTime, NaiveDate, Utc};
use common::{OrderId, Version};
use serde::{Deserialize, Serialize};

use super::{CustomerId, Money, OrderError, OrderItem, OrderState, PickupLocation, ProductId};

/// Order aggregate root.
///
/// Holds the full lifecycle of an order from placement through delivery or
/// cancellation. All mutation goes through methods that keep the derived
/// total price and the state machine consistent; fields are never exposed
/// mutably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier, absent until first persisted.
    id: Option<OrderId>,

    /// Date the order is due for pickup or delivery.
    due_date: NaiveDate,

    /// Current lifecycle state.
    state: OrderState,

    /// Customer who placed the order.
    customer_id: CustomerId,

    /// Ordered line items.
    items: Vec<OrderItem>,

    /// Derived total: max(0, sum of subtotals - discount).
    total_price: Money,

    /// Discount applied to the whole order.
    discount: Money,

    /// Whether the order has been paid for.
    paid: bool,

    /// Where the customer picks the order up.
    pickup_location: PickupLocation,

    /// Free-text notes.
    notes: Option<String>,

    /// When the order was created.
    created_at: DateTime<Utc>,

    /// When the state last changed.
    state_changed_at: DateTime<Utc>,

    /// Version token for optimistic concurrency control.
    #[serde(default)]
    version: Version,
}

impl Order {
    /// Creates a new, unpersisted order in the `New` state.
    pub fn new(due_date: NaiveDate, customer_id: CustomerId, pickup_location: PickupLocation) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            due_date,
            state: OrderState::New,
            customer_id,
            items: Vec::new(),
            total_price: Money::zero(),
            discount: Money::zero(),
            paid: false,
            pickup_location,
            notes: None,
            created_at: now,
            state_changed_at: now,
            version: Version::initial(),
        }
    }
}

// Query methods
impl Order {
    /// Returns the order ID, or None if the order has never been persisted.
    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    /// Returns the due date.
    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Returns the customer reference.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the line items in order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the derived total price.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// Returns the discount.
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Returns whether the order has been paid for.
    pub fn paid(&self) -> bool {
        self.paid
    }

    /// Returns the pickup location.
    pub fn pickup_location(&self) -> PickupLocation {
        self.pickup_location
    }

    /// Returns the free-text notes, if any.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the state last changed.
    pub fn state_changed_at(&self) -> DateTime<Utc> {
        self.state_changed_at
    }

    /// Returns the current version token.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

// State transitions
impl Order {
    /// Marks a `New` order as `Ready`.
    pub fn mark_ready(&mut self) -> Result<(), OrderError> {
        if !self.state.can_mark_ready() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.state,
                action: "mark ready",
            });
        }
        self.state = OrderState::Ready;
        self.state_changed_at = Utc::now();
        Ok(())
    }

    /// Marks a `Ready` order as `Delivered`.
    pub fn mark_delivered(&mut self) -> Result<(), OrderError> {
        if !self.state.can_mark_delivered() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.state,
                action: "mark delivered",
            });
        }
        self.state = OrderState::Delivered;
        self.state_changed_at = Utc::now();
        Ok(())
    }

    /// Cancels a `New` or `Ready` order.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.state.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.state,
                action: "cancel",
            });
        }
        self.state = OrderState::Cancelled;
        self.state_changed_at = Utc::now();
        Ok(())
    }
}

// Content mutation
impl Order {
    /// Adds a line item and recalculates the total.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
            });
        }
        self.items.push(item);
        self.recalculate_total();
        Ok(())
    }

    /// Removes the first line item for the given product, if present.
    ///
    /// Returns true when an item was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        if let Some(pos) = self.items.iter().position(|i| &i.product_id == product_id) {
            self.items.remove(pos);
            self.recalculate_total();
        }
        self.items.len() != before
    }

    /// Replaces the full item list and recalculates the total.
    pub fn set_items(&mut self, items: Vec<OrderItem>) -> Result<(), OrderError> {
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
            });
        }
        self.items = items;
        self.recalculate_total();
        Ok(())
    }

    /// Sets the discount and recalculates the total.
    pub fn set_discount(&mut self, discount: Money) {
        self.discount = discount;
        self.recalculate_total();
    }

    /// Sets the due date.
    pub fn set_due_date(&mut self, due_date: NaiveDate) {
        self.due_date = due_date;
    }

    /// Sets the paid flag.
    pub fn set_paid(&mut self, paid: bool) {
        self.paid = paid;
    }

    /// Sets the pickup location.
    pub fn set_pickup_location(&mut self, pickup_location: PickupLocation) {
        self.pickup_location = pickup_location;
    }

    /// Sets or clears the free-text notes.
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Recomputes the total price from the items and discount.
    ///
    /// The total never drops below zero: a discount larger than the item
    /// subtotal clamps to zero. Idempotent.
    pub fn recalculate_total(&mut self) {
        let subtotal = self
            .items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.subtotal());
        let total = subtotal - self.discount;
        self.total_price = if total.is_negative() {
            Money::zero()
        } else {
            total
        };
    }
}

// Persistence hooks, used by store implementations.
impl Order {
    /// Assigns the identifier on first persistence.
    ///
    /// An already-assigned id is immutable; later calls are ignored.
    pub fn assign_id(&mut self, id: OrderId) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    /// Sets the version token after a successful save.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}
