//! Connector events and the registry that dispatches them.
//!
//! Handlers are either persistent or scoped to one gesture. Gesture-scoped
//! handlers are dropped by [`EventRegistry::clear_gesture_scoped`], which the
//! connector calls on every reset.

use crate::error::ConnectorError;
use crate::geometry::Point;
use crate::layout::{LinkId, NodeId, RerouteId};
use std::fmt;
use std::str::FromStr;

/// Something that happened during a connection gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorEvent {
    /// A moved input link was reconnected; `old_link` has been removed
    InputMoved { old_link: LinkId, new_link: LinkId },
    /// A moved output link was reconnected; `old_link` has been removed
    OutputMoved { old_link: LinkId, new_link: LinkId },
    LinkCreated { link_id: LinkId },
    DroppedOnCanvas { point: Point },
    DroppedOnNode { node_id: NodeId, point: Point },
    DroppedOnReroute { reroute_id: RerouteId, point: Point },
    /// Fired at the end of every drop, whatever it hit
    AfterDrop { point: Point },
    Reset,
}

impl ConnectorEvent {
    pub fn kind(&self) -> ConnectorEventKind {
        match self {
            Self::InputMoved { .. } => ConnectorEventKind::InputMoved,
            Self::OutputMoved { .. } => ConnectorEventKind::OutputMoved,
            Self::LinkCreated { .. } => ConnectorEventKind::LinkCreated,
            Self::DroppedOnCanvas { .. } => ConnectorEventKind::DroppedOnCanvas,
            Self::DroppedOnNode { .. } => ConnectorEventKind::DroppedOnNode,
            Self::DroppedOnReroute { .. } => ConnectorEventKind::DroppedOnReroute,
            Self::AfterDrop { .. } => ConnectorEventKind::AfterDrop,
            Self::Reset => ConnectorEventKind::Reset,
        }
    }
}

/// Event names handlers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorEventKind {
    InputMoved,
    OutputMoved,
    LinkCreated,
    DroppedOnCanvas,
    DroppedOnNode,
    DroppedOnReroute,
    AfterDrop,
    Reset,
}

impl ConnectorEventKind {
    pub const ALL: [ConnectorEventKind; 8] = [
        Self::InputMoved,
        Self::OutputMoved,
        Self::LinkCreated,
        Self::DroppedOnCanvas,
        Self::DroppedOnNode,
        Self::DroppedOnReroute,
        Self::AfterDrop,
        Self::Reset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InputMoved => "input-moved",
            Self::OutputMoved => "output-moved",
            Self::LinkCreated => "link-created",
            Self::DroppedOnCanvas => "dropped-on-canvas",
            Self::DroppedOnNode => "dropped-on-node",
            Self::DroppedOnReroute => "dropped-on-reroute",
            Self::AfterDrop => "after-drop",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for ConnectorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConnectorEventKind {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConnectorError::UnknownEvent(s.to_string()))
    }
}

/// Handle returned when registering a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Handler = Box<dyn FnMut(&ConnectorEvent)>;

struct Registration {
    id: ListenerId,
    kind: ConnectorEventKind,
    gesture_scoped: bool,
    handler: Handler,
}

/// Handler registry for connector events.
#[derive(Default)]
pub struct EventRegistry {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("handlers", &self.registrations.len())
            .finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that stays until removed
    pub fn add<F>(&mut self, kind: ConnectorEventKind, handler: F) -> ListenerId
    where
        F: FnMut(&ConnectorEvent) + 'static,
    {
        self.register(kind, false, Box::new(handler))
    }

    /// Register a handler that is dropped at the next gesture reset
    pub fn add_until_reset<F>(&mut self, kind: ConnectorEventKind, handler: F) -> ListenerId
    where
        F: FnMut(&ConnectorEvent) + 'static,
    {
        self.register(kind, true, Box::new(handler))
    }

    fn register(&mut self, kind: ConnectorEventKind, gesture_scoped: bool, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            kind,
            gesture_scoped,
            handler,
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Call every handler registered for the event's kind, in registration
    /// order. Returns how many ran.
    pub fn dispatch(&mut self, event: &ConnectorEvent) -> usize {
        let kind = event.kind();
        let mut called = 0;
        for registration in self.registrations.iter_mut().filter(|r| r.kind == kind) {
            (registration.handler)(event);
            called += 1;
        }
        called
    }

    pub fn clear_gesture_scoped(&mut self) {
        self.registrations.retain(|r| !r.gesture_scoped);
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
