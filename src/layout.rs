//! Entity identifiers and the geometry records the store keeps per entity.
//!
//! The store mirrors geometry only. Domain objects (what a node computes, what
//! type a slot carries) live with the graph model; these records just say
//! where things are.

use crate::geometry::{Bounds, Point, Size};
use crate::path::LinkPath;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub i32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                $name(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of a node
    NodeId
);
entity_id!(
    /// Identifier of a link
    LinkId
);
entity_id!(
    /// Identifier of a reroute (a waypoint links can pass through)
    RerouteId
);

/// Whether a slot receives (input) or emits (output) a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SlotKind {
    Input,
    Output,
}

impl SlotKind {
    /// The kind on the other end of a link
    pub fn opposite(self) -> SlotKind {
        match self {
            SlotKind::Input => SlotKind::Output,
            SlotKind::Output => SlotKind::Input,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Input => write!(f, "input"),
            SlotKind::Output => write!(f, "output"),
        }
    }
}

/// Unique key of a slot: owning node, direction and index within that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotKey {
    pub node_id: NodeId,
    pub kind: SlotKind,
    pub index: usize,
}

impl SlotKey {
    pub fn new(node_id: NodeId, kind: SlotKind, index: usize) -> Self {
        Self {
            node_id,
            kind,
            index,
        }
    }

    pub fn input(node_id: NodeId, index: usize) -> Self {
        Self::new(node_id, SlotKind::Input, index)
    }

    pub fn output(node_id: NodeId, index: usize) -> Self {
        Self::new(node_id, SlotKind::Output, index)
    }
}

/// Key of one link segment. `reroute_id == None` is the final segment into
/// the target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentKey {
    pub link_id: LinkId,
    pub reroute_id: Option<RerouteId>,
}

/// Any entity an operation can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityId {
    Node(NodeId),
    Link(LinkId),
    Reroute(RerouteId),
}

impl From<NodeId> for EntityId {
    fn from(id: NodeId) -> Self {
        EntityId::Node(id)
    }
}

impl From<LinkId> for EntityId {
    fn from(id: LinkId) -> Self {
        EntityId::Link(id)
    }
}

impl From<RerouteId> for EntityId {
    fn from(id: RerouteId) -> Self {
        EntityId::Reroute(id)
    }
}

/// Geometry of one node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeLayout {
    pub id: NodeId,
    pub position: Point,
    pub size: Size,
    pub z_index: i32,
    pub visible: bool,
    /// Always `{position, size}`; collapsed and title offsets are applied by the writer
    pub bounds: Bounds,
}

impl NodeLayout {
    /// Visible node at z-index 0 with bounds derived from position and size
    pub fn new(id: NodeId, position: Point, size: Size) -> Self {
        Self {
            id,
            position,
            size,
            z_index: 0,
            visible: true,
            bounds: Bounds::from_position_size(position, size),
        }
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Bounds agree with position and size
    pub fn is_consistent(&self) -> bool {
        self.bounds == Bounds::from_position_size(self.position, self.size)
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
        self.bounds = Bounds::from_position_size(self.position, self.size);
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
        self.bounds = Bounds::from_position_size(self.position, self.size);
    }

    pub(crate) fn set_bounds(&mut self, bounds: Bounds) {
        self.position = bounds.position();
        self.size = bounds.size();
        self.bounds = bounds;
    }
}

/// Position of one slot. Bounds are a square hit area around the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotLayout {
    pub key: SlotKey,
    pub position: Point,
    pub bounds: Bounds,
}

impl SlotLayout {
    pub fn new(key: SlotKey, position: Point, hit_radius: f32) -> Self {
        Self {
            key,
            position,
            bounds: Bounds::around(position, hit_radius),
        }
    }
}

/// Endpoints and rendered geometry of one link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkLayout {
    pub id: LinkId,
    pub source_node_id: NodeId,
    pub source_slot: usize,
    pub target_node_id: NodeId,
    pub target_slot: usize,
    /// Reroute nearest the target, if the link passes through any
    pub parent_id: Option<RerouteId>,
    /// Empty until geometry sync computes it
    pub path: Option<LinkPath>,
    pub bounds: Bounds,
    pub center: Point,
}

impl LinkLayout {
    pub fn new(
        id: LinkId,
        source_node_id: NodeId,
        source_slot: usize,
        target_node_id: NodeId,
        target_slot: usize,
    ) -> Self {
        Self {
            id,
            source_node_id,
            source_slot,
            target_node_id,
            target_slot,
            parent_id: None,
            path: None,
            bounds: Bounds::default(),
            center: Point::default(),
        }
    }

    pub fn with_parent(mut self, parent_id: Option<RerouteId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn source_key(&self) -> SlotKey {
        SlotKey::output(self.source_node_id, self.source_slot)
    }

    pub fn target_key(&self) -> SlotKey {
        SlotKey::input(self.target_node_id, self.target_slot)
    }

    /// Whether either endpoint sits on `node_id`
    pub fn touches_node(&self, node_id: NodeId) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// Same endpoints and parent, ignoring derived geometry
    pub fn same_topology(&self, other: &LinkLayout) -> bool {
        self.id == other.id
            && self.source_node_id == other.source_node_id
            && self.source_slot == other.source_slot
            && self.target_node_id == other.target_node_id
            && self.target_slot == other.target_slot
            && self.parent_id == other.parent_id
    }
}

/// Rendered geometry of one piece of a link between two waypoints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkSegmentLayout {
    pub link_id: LinkId,
    /// Reroute this segment ends at. `None` for the segment into the target slot.
    pub reroute_id: Option<RerouteId>,
    pub path: LinkPath,
    pub bounds: Bounds,
    pub center: Point,
}

impl LinkSegmentLayout {
    /// Segment whose bounds and centre are derived from `path`
    pub fn from_path(link_id: LinkId, reroute_id: Option<RerouteId>, path: LinkPath) -> Self {
        Self {
            link_id,
            reroute_id,
            path,
            bounds: path.bounds(),
            center: path.center(),
        }
    }

    pub fn key(&self) -> SegmentKey {
        SegmentKey {
            link_id: self.link_id,
            reroute_id: self.reroute_id,
        }
    }
}

/// Geometry of one reroute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RerouteLayout {
    pub id: RerouteId,
    pub position: Point,
    pub radius: f32,
    pub bounds: Bounds,
    /// Next reroute towards the source
    pub parent_id: Option<RerouteId>,
    /// Links that pass through this reroute
    pub link_ids: Vec<LinkId>,
}

impl RerouteLayout {
    pub fn new(id: RerouteId, position: Point, radius: f32) -> Self {
        Self {
            id,
            position,
            radius,
            bounds: Bounds::around(position, radius),
            parent_id: None,
            link_ids: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: Option<RerouteId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_links(mut self, link_ids: impl IntoIterator<Item = LinkId>) -> Self {
        self.link_ids = link_ids.into_iter().collect();
        self
    }

    /// Whether `bounds` is the circle's bounding box
    pub fn is_consistent(&self) -> bool {
        self.bounds == Bounds::around(self.position, self.radius)
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
        self.bounds = Bounds::around(position, self.radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Identifiers
    // ========================================================================

    #[test]
    fn test_ids_display_and_order() {
        assert_eq!(NodeId(7).to_string(), "7");
        assert!(LinkId(1) < LinkId(2));
        assert_eq!(RerouteId::from(3), RerouteId(3));
    }

    #[test]
    fn test_slot_key_order_is_node_kind_index() {
        let mut keys = vec![
            SlotKey::output(NodeId(1), 0),
            SlotKey::input(NodeId(2), 0),
            SlotKey::input(NodeId(1), 1),
            SlotKey::input(NodeId(1), 0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                SlotKey::input(NodeId(1), 0),
                SlotKey::input(NodeId(1), 1),
                SlotKey::output(NodeId(1), 0),
                SlotKey::input(NodeId(2), 0),
            ]
        );
    }

    #[test]
    fn test_slot_kind_opposite() {
        assert_eq!(SlotKind::Input.opposite(), SlotKind::Output);
        assert_eq!(SlotKind::Output.opposite(), SlotKind::Input);
    }

    // ========================================================================
    // Entity records
    // ========================================================================

    #[test]
    fn test_node_layout_bounds_follow_position_and_size() {
        let mut node = NodeLayout::new(NodeId(1), Point::new(10.0, 10.0), Size::new(100.0, 50.0));
        assert_eq!(node.bounds, Bounds::new(10.0, 10.0, 100.0, 50.0));
        assert!(node.is_consistent());

        node.set_position(Point::new(0.0, 5.0));
        assert_eq!(node.bounds, Bounds::new(0.0, 5.0, 100.0, 50.0));

        node.set_size(Size::new(20.0, 20.0));
        assert_eq!(node.bounds, Bounds::new(0.0, 5.0, 20.0, 20.0));

        node.bounds.x = 99.0;
        assert!(!node.is_consistent());
    }

    #[test]
    fn test_link_layout_keys() {
        let link = LinkLayout::new(LinkId(1), NodeId(1), 2, NodeId(3), 0);
        assert_eq!(link.source_key(), SlotKey::output(NodeId(1), 2));
        assert_eq!(link.target_key(), SlotKey::input(NodeId(3), 0));
        assert!(link.touches_node(NodeId(3)));
        assert!(!link.touches_node(NodeId(2)));
        assert!(link.path.is_none());
    }

    #[test]
    fn test_reroute_bounds_follow_position() {
        let mut reroute = RerouteLayout::new(RerouteId(1), Point::new(50.0, 50.0), 8.0);
        assert_eq!(reroute.bounds, Bounds::new(42.0, 42.0, 16.0, 16.0));
        reroute.set_position(Point::new(0.0, 0.0));
        assert_eq!(reroute.bounds, Bounds::new(-8.0, -8.0, 16.0, 16.0));
    }
}
