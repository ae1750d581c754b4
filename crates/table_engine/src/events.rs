//! Event bus and host dialog seams
//!
//! The engine's outbound boundary: lifecycle notifications are published on
//! a synchronous bus the host subscribes to, and destructive whole-table
//! deletion asks the host for confirmation through the [`ConfirmDialog`]
//! trait. Everything is single-threaded and dispatched inline.

use std::cell::RefCell;
use std::rc::Rc;
use table_model::NodeId;

/// Lifecycle notifications published by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// A table became editable
    Activated { table: NodeId },
    /// A table was restored to plain markup
    Deactivated { table: NodeId },
    /// The set of selected cells changed
    SelectionChanged { table: NodeId },
    /// Rows, columns or spans changed
    StructureChanged { table: NodeId },
    /// The whole table was deleted
    Deleted { table: NodeId },
}

type Subscriber = Box<dyn Fn(&TableEvent)>;

/// A synchronous publish/subscribe bus. Clones share the subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for all events
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&TableEvent) + 'static,
    {
        self.subscribers.borrow_mut().push(Box::new(subscriber));
    }

    /// Deliver an event to every subscriber, in registration order
    pub fn publish(&self, event: &TableEvent) {
        for subscriber in self.subscribers.borrow().iter() {
            subscriber(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

/// Payload of a confirmation prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub text: String,
}

/// Host seam for yes/no confirmation dialogs. Only whole-table deletion
/// goes through this; a negative answer must leave the table unchanged.
pub trait ConfirmDialog {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool;
}

/// A canned answer, useful for hosts without a dialog and for tests
#[derive(Debug, Clone, Copy)]
pub struct StaticAnswer(pub bool);

impl ConfirmDialog for StaticAnswer {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        self.0
    }
}
