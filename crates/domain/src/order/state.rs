//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// New ──► Ready ──► Delivered
///  │        │
///  └────────┴──► Cancelled
/// ```
///
/// Transitions are monotonic: an order never regresses to an earlier state,
/// and `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order has been placed but not yet prepared.
    #[default]
    New,

    /// Order is prepared and awaiting pickup or delivery.
    Ready,

    /// Order has been handed over (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if the order can be marked ready in this state.
    pub fn can_mark_ready(&self) -> bool {
        matches!(self, OrderState::New)
    }

    /// Returns true if the order can be marked delivered in this state.
    pub fn can_mark_delivered(&self) -> bool {
        matches!(self, OrderState::Ready)
    }

    /// Returns true if the order can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderState::New | OrderState::Ready)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::New => "New",
            OrderState::Ready => "Ready",
            OrderState::Delivered => "Delivered",
            OrderState::Cancelled => "Cancelled",
        }
    }

    /// All states, in lifecycle order.
    pub fn all() -> [OrderState; 4] {
        [
            OrderState::New,
            OrderState::Ready,
            OrderState::Delivered,
            OrderState::Cancelled,
        ]
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_new() {
        assert_eq!(OrderState::default(), OrderState::New);
    }

    #[test]
    fn test_new_can_mark_ready() {
        assert!(OrderState::New.can_mark_ready());
        assert!(!OrderState::Ready.can_mark_ready());
        assert!(!OrderState::Delivered.can_mark_ready());
        assert!(!OrderState::Cancelled.can_mark_ready());
    }

    #[test]
    fn test_ready_can_mark_delivered() {
        assert!(!OrderState::New.can_mark_delivered());
        assert!(OrderState::Ready.can_mark_delivered());
        assert!(!OrderState::Delivered.can_mark_delivered());
        assert!(!OrderState::Cancelled.can_mark_delivered());
    }

    #[test]
    fn test_can_cancel_from_non_terminal_states() {
        assert!(OrderState::New.can_cancel());
        assert!(OrderState::Ready.can_cancel());
        assert!(!OrderState::Delivered.can_cancel());
        assert!(!OrderState::Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderState::New.is_terminal());
        assert!(!OrderState::Ready.is_terminal());
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderState::New.to_string(), "New");
        assert_eq!(OrderState::Ready.to_string(), "Ready");
        assert_eq!(OrderState::Delivered.to_string(), "Delivered");
        assert_eq!(OrderState::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_serialization() {
        let state = OrderState::Ready;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: OrderState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
