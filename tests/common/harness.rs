//! Test harness for a small three node editor.
//!
//! Sets up a graph, its layout store with slot geometry, and a connector
//! with event and change tracking.

#![allow(dead_code)]

use super::{init_logging, ChangeTracker, EventTracker};
use node_editor_layout::{
    Graph, GraphNode, LayoutStore, LinkConnector, LinkId, LinkNetwork, NodeId, Point, RerouteId,
    Size, SlotKey, SlotLayout, Subscription,
};

pub const SOURCE: NodeId = NodeId(1);
pub const SINK: NodeId = NodeId(2);
pub const MIXER: NodeId = NodeId(3);

pub fn out(node: NodeId, index: usize) -> SlotKey {
    SlotKey::output(node, index)
}

pub fn inp(node: NodeId, index: usize) -> SlotKey {
    SlotKey::input(node, index)
}

/// Three nodes:
///
/// - `SOURCE` at (0, 0): outputs `INT` (100, 20) and `IMAGE` (100, 40)
/// - `SINK` at (300, 0): inputs `INT` (300, 20) and `IMAGE` (300, 40)
/// - `MIXER` at (300, 200): inputs `INT` (300, 220) and `*` (300, 240),
///   output `INT` (400, 220)
///
/// Every node is 100 x 60.
pub struct EditorHarness {
    pub store: LayoutStore,
    pub graph: Graph,
    pub connector: LinkConnector,
    pub events: EventTracker,
    pub changes: ChangeTracker,
    subscription: Option<Subscription>,
}

impl EditorHarness {
    pub fn new() -> Self {
        init_logging();
        let store = LayoutStore::new();
        let mut graph = Graph::new(store.clone());
        let size = Size::new(100.0, 60.0);

        graph
            .add_node(
                GraphNode::new(SOURCE)
                    .with_output("value", "INT")
                    .with_output("image", "IMAGE"),
                Point::new(0.0, 0.0),
                size,
            )
            .unwrap();
        graph
            .add_node(
                GraphNode::new(SINK)
                    .with_input("value", "INT")
                    .with_input("image", "IMAGE"),
                Point::new(300.0, 0.0),
                size,
            )
            .unwrap();
        graph
            .add_node(
                GraphNode::new(MIXER)
                    .with_input("a", "INT")
                    .with_input("b", "*")
                    .with_output("sum", "INT"),
                Point::new(300.0, 200.0),
                size,
            )
            .unwrap();

        let radius = store.config().slot_hit_radius;
        store.batch_update_slot_layouts(vec![
            SlotLayout::new(out(SOURCE, 0), Point::new(100.0, 20.0), radius),
            SlotLayout::new(out(SOURCE, 1), Point::new(100.0, 40.0), radius),
            SlotLayout::new(inp(SINK, 0), Point::new(300.0, 20.0), radius),
            SlotLayout::new(inp(SINK, 1), Point::new(300.0, 40.0), radius),
            SlotLayout::new(inp(MIXER, 0), Point::new(300.0, 220.0), radius),
            SlotLayout::new(inp(MIXER, 1), Point::new(300.0, 240.0), radius),
            SlotLayout::new(out(MIXER, 0), Point::new(400.0, 220.0), radius),
        ]);

        let mut connector = LinkConnector::new(store.clone());
        let events = EventTracker::new();
        events.attach(&mut connector);
        let changes = ChangeTracker::new();
        let subscription = Some(changes.attach(&store));

        Self {
            store,
            graph,
            connector,
            events,
            changes,
            subscription,
        }
    }

    /// Centre of a slot as recorded in the store
    pub fn slot_pos(&self, key: SlotKey) -> Point {
        self.store.slot_layout(key).unwrap().position
    }

    pub fn connect(&mut self, origin: SlotKey, target: SlotKey) -> LinkId {
        self.graph.connect_slots(origin, target, None).unwrap().id
    }

    pub fn connect_via(&mut self, origin: SlotKey, target: SlotKey, parent: RerouteId) -> LinkId {
        self.graph.connect_slots(origin, target, Some(parent)).unwrap().id
    }

    pub fn input_link_id(&self, key: SlotKey) -> Option<LinkId> {
        self.graph.input_link(key).map(|link| link.id)
    }

    /// Stop recording store changes
    pub fn stop_tracking_changes(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
