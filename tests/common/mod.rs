//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use node_editor_layout::{
    ConnectorEvent, ConnectorEventKind, LayoutChange, LayoutStore, LinkConnector, Subscription,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Route `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every connector event, in dispatch order.
#[derive(Default, Clone)]
pub struct EventTracker {
    pub events: Rc<RefCell<Vec<ConnectorEvent>>>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent listener for every event kind
    pub fn attach(&self, connector: &mut LinkConnector) {
        for kind in ConnectorEventKind::ALL {
            let sink = self.events.clone();
            connector.add_listener(kind, move |event| sink.borrow_mut().push(event.clone()));
        }
    }

    pub fn kinds(&self) -> Vec<ConnectorEventKind> {
        self.events.borrow().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: ConnectorEventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// Records every store change notification.
#[derive(Default, Clone)]
pub struct ChangeTracker {
    pub changes: Rc<RefCell<Vec<LayoutChange>>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, store: &LayoutStore) -> Subscription {
        let sink = self.changes.clone();
        store.on_change(move |change| sink.borrow_mut().push(change.clone()))
    }

    pub fn len(&self) -> usize {
        self.changes.borrow().len()
    }

    pub fn last(&self) -> Option<LayoutChange> {
        self.changes.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.changes.borrow_mut().clear();
    }
}
