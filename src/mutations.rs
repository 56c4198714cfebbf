//! Convenience mutation builders.
//!
//! Each method reads the current value from the store to fill the
//! `previous_*` fields, tags the operation with the store's current source
//! and actor, and applies it.

use crate::error::LayoutError;
use crate::geometry::{Bounds, Point, Size};
use crate::layout::{LinkId, LinkLayout, NodeId, NodeLayout, RerouteId, RerouteLayout};
use crate::operation::{LayoutOperation, NodeBoundsUpdate, OperationKind, OperationOutcome};
use crate::store::LayoutStore;
use log::{debug, warn};

type MutationResult = Result<OperationOutcome, LayoutError>;

fn missing(what: &str, id: impl std::fmt::Display) -> MutationResult {
    debug!("{} {} not in layout store, mutation ignored", what, id);
    Ok(OperationOutcome::Ignored)
}

impl LayoutStore {
    /// Wrap `kind` with the current time, actor and source
    pub fn stamp(&self, kind: OperationKind) -> LayoutOperation {
        LayoutOperation::new(kind, self.actor(), self.source())
    }

    fn submit(&self, kind: OperationKind) -> MutationResult {
        let operation = self.stamp(kind);
        self.apply_operation(operation)
    }

    pub fn create_node(&self, node_id: NodeId, position: Point, size: Size) -> MutationResult {
        self.submit(OperationKind::CreateNode {
            layout: NodeLayout::new(node_id, position, size),
        })
    }

    pub fn delete_node(&self, node_id: NodeId) -> MutationResult {
        let Some(previous_layout) = self.node_layout(node_id) else {
            return missing("node", node_id);
        };
        self.submit(OperationKind::DeleteNode {
            node_id,
            previous_layout,
        })
    }

    pub fn move_node(&self, node_id: NodeId, position: Point) -> MutationResult {
        let Some(current) = self.node_layout(node_id) else {
            return missing("node", node_id);
        };
        self.submit(OperationKind::MoveNode {
            node_id,
            position,
            previous_position: current.position,
        })
    }

    pub fn resize_node(&self, node_id: NodeId, size: Size) -> MutationResult {
        let Some(current) = self.node_layout(node_id) else {
            return missing("node", node_id);
        };
        self.submit(OperationKind::ResizeNode {
            node_id,
            size,
            previous_size: current.size,
        })
    }

    pub fn set_node_z_index(&self, node_id: NodeId, z_index: i32) -> MutationResult {
        let Some(current) = self.node_layout(node_id) else {
            return missing("node", node_id);
        };
        self.submit(OperationKind::SetNodeZIndex {
            node_id,
            z_index,
            previous_z_index: current.z_index,
        })
    }

    pub fn set_node_visibility(&self, node_id: NodeId, visible: bool) -> MutationResult {
        let Some(current) = self.node_layout(node_id) else {
            return missing("node", node_id);
        };
        self.submit(OperationKind::SetNodeVisibility {
            node_id,
            visible,
            previous_visible: current.visible,
        })
    }

    /// Raise a node above every other node. Ignored when it already is the
    /// only node at the top.
    pub fn bring_node_to_front(&self, node_id: NodeId) -> MutationResult {
        let Some(current) = self.node_layout(node_id) else {
            return missing("node", node_id);
        };
        let max_other = self
            .all_nodes()
            .iter()
            .filter(|node| node.id != node_id)
            .map(|node| node.z_index)
            .max();
        match max_other {
            Some(max) if max >= current.z_index => match max.checked_add(1) {
                Some(z_index) => self.set_node_z_index(node_id, z_index),
                None => {
                    warn!("node {} cannot be raised above z-index {}", node_id, max);
                    Ok(OperationOutcome::Ignored)
                }
            },
            _ => Ok(OperationOutcome::Ignored),
        }
    }

    /// Update many node rectangles as one operation.
    ///
    /// Unknown nodes are dropped from the batch; if none remain the call is
    /// ignored.
    pub fn batch_update_node_bounds<I>(&self, updates: I) -> MutationResult
    where
        I: IntoIterator<Item = (NodeId, Bounds)>,
    {
        let updates: Vec<NodeBoundsUpdate> = updates
            .into_iter()
            .filter_map(|(node_id, bounds)| match self.node_layout(node_id) {
                Some(current) => Some(NodeBoundsUpdate {
                    node_id,
                    bounds,
                    previous_bounds: current.bounds,
                }),
                None => {
                    debug!("node {} not in layout store, dropped from batch", node_id);
                    None
                }
            })
            .collect();
        if updates.is_empty() {
            return Ok(OperationOutcome::Ignored);
        }
        self.submit(OperationKind::BatchUpdateBounds { updates })
    }

    pub fn create_link(&self, link: LinkLayout) -> MutationResult {
        self.submit(OperationKind::CreateLink { link })
    }

    pub fn delete_link(&self, link_id: LinkId) -> MutationResult {
        let Some(previous_link) = self.link_layout(link_id) else {
            return missing("link", link_id);
        };
        self.submit(OperationKind::DeleteLink {
            link_id,
            previous_link,
        })
    }

    /// Create a reroute with the configured default radius
    pub fn create_reroute(
        &self,
        reroute_id: RerouteId,
        position: Point,
        parent_id: Option<RerouteId>,
        link_ids: Vec<LinkId>,
    ) -> MutationResult {
        let radius = self.config().reroute_radius;
        self.submit(OperationKind::CreateReroute {
            reroute: RerouteLayout::new(reroute_id, position, radius)
                .with_parent(parent_id)
                .with_links(link_ids),
        })
    }

    pub fn move_reroute(&self, reroute_id: RerouteId, position: Point) -> MutationResult {
        let Some(current) = self.reroute_layout(reroute_id) else {
            return missing("reroute", reroute_id);
        };
        self.submit(OperationKind::MoveReroute {
            reroute_id,
            position,
            previous_position: current.position,
        })
    }

    pub fn delete_reroute(&self, reroute_id: RerouteId) -> MutationResult {
        let Some(previous_reroute) = self.reroute_layout(reroute_id) else {
            return missing("reroute", reroute_id);
        };
        self.submit(OperationKind::DeleteReroute {
            reroute_id,
            previous_reroute,
        })
    }
}
