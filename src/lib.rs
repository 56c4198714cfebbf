//! # Node Editor Layout
//!
//! The geometric and interactive core of a visual node graph editor: where
//! every node, slot, link and reroute lives, what sits under a point, and the
//! gesture of connecting or moving links.
//!
//! ## Features
//!
//! - **Geometry store** - [`LayoutStore`] mirrors node, slot, link, segment and
//!   reroute geometry, versioned and observable
//! - **Invertible operation log** - every [`OperationKind`] carries the
//!   previous values it overwrites, so [`LayoutOperation::inverse`] undoes it
//! - **Spatial queries** - grid-indexed hit tests and box selection
//! - **Link connector** - [`LinkConnector`], a single-flight state machine for
//!   dragging new links and moving existing ones
//! - **Pluggable validation** - the connector asks a [`LinkValidator`] which
//!   slots may be connected
//!
//! ## Quick Start
//!
//! ```
//! use node_editor_layout::{
//!     Graph, GraphNode, LayoutStore, LinkConnector, LinkNetwork, NodeId, Point, Size, SlotKey,
//!     SlotKind, SlotLayout,
//! };
//!
//! let store = LayoutStore::new();
//! let mut graph = Graph::new(store.clone());
//! graph.add_node(GraphNode::new(NodeId(1)).with_output("out", "INT"), Point::new(0.0, 0.0), Size::new(100.0, 60.0)).unwrap();
//! graph.add_node(GraphNode::new(NodeId(2)).with_input("in", "INT"), Point::new(300.0, 0.0), Size::new(100.0, 60.0)).unwrap();
//! store.update_slot_layout(SlotLayout::new(SlotKey::input(NodeId(2), 0), Point::new(300.0, 30.0), 10.0));
//!
//! let mut connector = LinkConnector::new(store.clone());
//! connector.drag_new_from_output(&graph, NodeId(1), 0, None).unwrap();
//! assert_eq!(connector.state().connecting_to, Some(SlotKind::Input));
//!
//! let outcome = connector.drop_links(&mut graph, Point::new(302.0, 31.0)).unwrap();
//! connector.reset();
//!
//! assert_eq!(outcome.created.len(), 1);
//! assert!(graph.input_link(SlotKey::input(NodeId(2), 0)).is_some());
//! assert_eq!(store.all_links().len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] / [`path`] - points, rectangles and link curves
//! - [`layout`] / [`operation`] / [`store`] - the geometry store and its log
//! - [`spatial`] / [`hit_test`] - the grid index and the queries built on it
//! - [`graph`] / [`network`] - slot validation and the graph model seam
//! - [`connector`] / [`events`] - the connection gesture
//! - [`links`] / [`tracking`] - keeping derived geometry in step with renderers

pub mod config;
pub mod connector;
pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod links;
mod mutations;
pub mod network;
pub mod operation;
pub mod path;
pub mod spatial;
pub mod store;
pub mod tracking;

pub use config::LayoutConfig;
pub use connector::{
    DropOutcome, DropTarget, LinkConnector, LinkConnectorExport, LinkConnectorState, RenderLink,
    RenderLinkKind,
};
pub use error::{ConnectorError, LayoutError};
pub use events::{ConnectorEvent, ConnectorEventKind, EventRegistry, ListenerId};
pub use geometry::{distance_to_line_segment_sq, Bounds, Point, Size};
pub use graph::{
    validate_link, CompositeValidator, LinkValidator, SlotDescriptor, TypeMatchValidator,
    ValidationError, ValidationResult,
};
pub use hit_test::ItemsInBounds;
pub use layout::{
    EntityId, LinkId, LinkLayout, LinkSegmentLayout, NodeId, NodeLayout, RerouteId, RerouteLayout,
    SegmentKey, SlotKey, SlotKind, SlotLayout,
};
pub use links::LinkLayoutSync;
pub use network::{Graph, GraphLink, GraphNode, GraphReroute, InputSlot, LinkNetwork, OutputSlot};
pub use operation::{
    ChangeType, LayoutChange, LayoutOperation, LayoutSource, NodeBoundsUpdate, OperationKind,
    OperationOutcome,
};
pub use path::{distance_to_bezier, generate_bezier_path, CubicBezier, LinkPath};
pub use spatial::SpatialIndex;
pub use store::{LayoutStore, NodeLayoutRef, Subscription};
pub use tracking::GeometryTracker;
