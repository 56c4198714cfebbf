//! Typed, invertible layout operations and the change records built from them.
//!
//! Every variant carries the previous value of each field it changes, so
//! [`LayoutOperation::inverse`] needs nothing but the operation itself.

use crate::error::LayoutError;
use crate::geometry::{Bounds, Point, Size};
use crate::layout::{EntityId, LinkId, LinkLayout, NodeId, NodeLayout, RerouteId, RerouteLayout};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which producer issued an operation.
///
/// Only used so a producer can recognise and skip echoes of its own writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LayoutSource {
    CanvasRenderer,
    OverlayRenderer,
    #[default]
    External,
}

/// Coarse classification of a change for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// One entry of a [`OperationKind::BatchUpdateBounds`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeBoundsUpdate {
    pub node_id: NodeId,
    pub bounds: Bounds,
    pub previous_bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum OperationKind {
    CreateNode {
        layout: NodeLayout,
    },
    DeleteNode {
        node_id: NodeId,
        previous_layout: NodeLayout,
    },
    MoveNode {
        node_id: NodeId,
        position: Point,
        previous_position: Point,
    },
    ResizeNode {
        node_id: NodeId,
        size: Size,
        previous_size: Size,
    },
    SetNodeZIndex {
        node_id: NodeId,
        z_index: i32,
        previous_z_index: i32,
    },
    SetNodeVisibility {
        node_id: NodeId,
        visible: bool,
        previous_visible: bool,
    },
    BatchUpdateBounds {
        updates: Vec<NodeBoundsUpdate>,
    },
    CreateLink {
        link: LinkLayout,
    },
    DeleteLink {
        link_id: LinkId,
        previous_link: LinkLayout,
    },
    CreateReroute {
        reroute: RerouteLayout,
    },
    DeleteReroute {
        reroute_id: RerouteId,
        previous_reroute: RerouteLayout,
    },
    MoveReroute {
        reroute_id: RerouteId,
        position: Point,
        previous_position: Point,
    },
}

/// A mutation plus who issued it and when.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutOperation {
    /// Milliseconds since the unix epoch
    pub timestamp: u64,
    pub actor: String,
    pub source: LayoutSource,
    pub kind: OperationKind,
}

impl LayoutOperation {
    /// Operation stamped with the current wall clock time
    pub fn new(kind: OperationKind, actor: impl Into<String>, source: LayoutSource) -> Self {
        Self {
            timestamp: now_millis(),
            actor: actor.into(),
            source,
            kind,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The operation that undoes this one. Metadata is kept.
    pub fn inverse(&self) -> LayoutOperation {
        LayoutOperation {
            timestamp: self.timestamp,
            actor: self.actor.clone(),
            source: self.source,
            kind: self.kind.inverse(),
        }
    }

    pub fn change_type(&self) -> ChangeType {
        self.kind.change_type()
    }

    pub fn affected_ids(&self) -> Vec<EntityId> {
        self.kind.affected_ids()
    }

    /// Check that the operation's fields can all be true at once
    pub fn validate(&self) -> Result<(), LayoutError> {
        self.kind.validate()
    }
}

impl OperationKind {
    pub fn inverse(&self) -> OperationKind {
        match self {
            OperationKind::CreateNode { layout } => OperationKind::DeleteNode {
                node_id: layout.id,
                previous_layout: layout.clone(),
            },
            OperationKind::DeleteNode {
                previous_layout, ..
            } => OperationKind::CreateNode {
                layout: previous_layout.clone(),
            },
            OperationKind::MoveNode {
                node_id,
                position,
                previous_position,
            } => OperationKind::MoveNode {
                node_id: *node_id,
                position: *previous_position,
                previous_position: *position,
            },
            OperationKind::ResizeNode {
                node_id,
                size,
                previous_size,
            } => OperationKind::ResizeNode {
                node_id: *node_id,
                size: *previous_size,
                previous_size: *size,
            },
            OperationKind::SetNodeZIndex {
                node_id,
                z_index,
                previous_z_index,
            } => OperationKind::SetNodeZIndex {
                node_id: *node_id,
                z_index: *previous_z_index,
                previous_z_index: *z_index,
            },
            OperationKind::SetNodeVisibility {
                node_id,
                visible,
                previous_visible,
            } => OperationKind::SetNodeVisibility {
                node_id: *node_id,
                visible: *previous_visible,
                previous_visible: *visible,
            },
            OperationKind::BatchUpdateBounds { updates } => OperationKind::BatchUpdateBounds {
                updates: updates
                    .iter()
                    .map(|u| NodeBoundsUpdate {
                        node_id: u.node_id,
                        bounds: u.previous_bounds,
                        previous_bounds: u.bounds,
                    })
                    .collect(),
            },
            OperationKind::CreateLink { link } => OperationKind::DeleteLink {
                link_id: link.id,
                previous_link: link.clone(),
            },
            OperationKind::DeleteLink { previous_link, .. } => OperationKind::CreateLink {
                link: previous_link.clone(),
            },
            OperationKind::CreateReroute { reroute } => OperationKind::DeleteReroute {
                reroute_id: reroute.id,
                previous_reroute: reroute.clone(),
            },
            OperationKind::DeleteReroute {
                previous_reroute, ..
            } => OperationKind::CreateReroute {
                reroute: previous_reroute.clone(),
            },
            OperationKind::MoveReroute {
                reroute_id,
                position,
                previous_position,
            } => OperationKind::MoveReroute {
                reroute_id: *reroute_id,
                position: *previous_position,
                previous_position: *position,
            },
        }
    }

    pub fn change_type(&self) -> ChangeType {
        match self {
            OperationKind::CreateNode { .. }
            | OperationKind::CreateLink { .. }
            | OperationKind::CreateReroute { .. } => ChangeType::Create,
            OperationKind::DeleteNode { .. }
            | OperationKind::DeleteLink { .. }
            | OperationKind::DeleteReroute { .. } => ChangeType::Delete,
            _ => ChangeType::Update,
        }
    }

    pub fn affected_ids(&self) -> Vec<EntityId> {
        match self {
            OperationKind::CreateNode { layout } => vec![layout.id.into()],
            OperationKind::DeleteNode { node_id, .. }
            | OperationKind::MoveNode { node_id, .. }
            | OperationKind::ResizeNode { node_id, .. }
            | OperationKind::SetNodeZIndex { node_id, .. }
            | OperationKind::SetNodeVisibility { node_id, .. } => vec![(*node_id).into()],
            OperationKind::BatchUpdateBounds { updates } => {
                updates.iter().map(|u| u.node_id.into()).collect()
            }
            OperationKind::CreateLink { link } => vec![link.id.into()],
            OperationKind::DeleteLink { link_id, .. } => vec![(*link_id).into()],
            OperationKind::CreateReroute { reroute } => vec![reroute.id.into()],
            OperationKind::DeleteReroute { reroute_id, .. }
            | OperationKind::MoveReroute { reroute_id, .. } => vec![(*reroute_id).into()],
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        match self {
            OperationKind::CreateNode { layout } => check_node_layout(layout),
            OperationKind::DeleteNode {
                node_id,
                previous_layout,
            } => {
                if previous_layout.id != *node_id {
                    return Err(LayoutError::malformed(format!(
                        "delete of node {} carries layout of node {}",
                        node_id, previous_layout.id
                    )));
                }
                check_node_layout(previous_layout)
            }
            OperationKind::MoveNode {
                position,
                previous_position,
                ..
            } => check_points(*position, *previous_position, "node position"),
            OperationKind::ResizeNode {
                size,
                previous_size,
                ..
            } => {
                if !size.is_valid() || !previous_size.is_valid() {
                    return Err(LayoutError::malformed("node size must be finite and non-negative"));
                }
                Ok(())
            }
            OperationKind::SetNodeZIndex { .. } | OperationKind::SetNodeVisibility { .. } => Ok(()),
            OperationKind::BatchUpdateBounds { updates } => {
                let mut seen = HashSet::with_capacity(updates.len());
                for update in updates {
                    if !seen.insert(update.node_id) {
                        return Err(LayoutError::malformed(format!(
                            "node {} appears twice in one batch",
                            update.node_id
                        )));
                    }
                    if !update.bounds.is_valid() || !update.previous_bounds.is_valid() {
                        return Err(LayoutError::malformed(format!(
                            "bounds of node {} must be finite and non-negative",
                            update.node_id
                        )));
                    }
                }
                Ok(())
            }
            OperationKind::CreateLink { link } => check_link(link),
            OperationKind::DeleteLink {
                link_id,
                previous_link,
            } => {
                if previous_link.id != *link_id {
                    return Err(LayoutError::malformed(format!(
                        "delete of link {} carries link {}",
                        link_id, previous_link.id
                    )));
                }
                check_link(previous_link)
            }
            OperationKind::CreateReroute { reroute } => check_reroute(reroute),
            OperationKind::DeleteReroute {
                reroute_id,
                previous_reroute,
            } => {
                if previous_reroute.id != *reroute_id {
                    return Err(LayoutError::malformed(format!(
                        "delete of reroute {} carries reroute {}",
                        reroute_id, previous_reroute.id
                    )));
                }
                check_reroute(previous_reroute)
            }
            OperationKind::MoveReroute {
                position,
                previous_position,
                ..
            } => check_points(*position, *previous_position, "reroute position"),
        }
    }
}

fn check_points(a: Point, b: Point, what: &str) -> Result<(), LayoutError> {
    if !a.is_finite() || !b.is_finite() {
        return Err(LayoutError::malformed(format!("{what} must be finite")));
    }
    Ok(())
}

fn check_node_layout(layout: &NodeLayout) -> Result<(), LayoutError> {
    if !layout.position.is_finite() || !layout.size.is_valid() {
        return Err(LayoutError::malformed(format!(
            "node {} needs a finite position and a non-negative size",
            layout.id
        )));
    }
    if !layout.is_consistent() {
        return Err(LayoutError::malformed(format!(
            "bounds of node {} disagree with its position and size",
            layout.id
        )));
    }
    Ok(())
}

fn check_link(link: &LinkLayout) -> Result<(), LayoutError> {
    if link.source_node_id == link.target_node_id {
        return Err(LayoutError::malformed(format!(
            "link {} connects node {} to itself",
            link.id, link.source_node_id
        )));
    }
    Ok(())
}

fn check_reroute(reroute: &RerouteLayout) -> Result<(), LayoutError> {
    if !reroute.position.is_finite() || !reroute.radius.is_finite() || reroute.radius < 0.0 {
        return Err(LayoutError::malformed(format!(
            "reroute {} needs a finite position and a non-negative radius",
            reroute.id
        )));
    }
    if !reroute.is_consistent() {
        return Err(LayoutError::malformed(format!(
            "bounds of reroute {} disagree with its position and radius",
            reroute.id
        )));
    }
    if reroute.parent_id == Some(reroute.id) {
        return Err(LayoutError::malformed(format!(
            "reroute {} is its own parent",
            reroute.id
        )));
    }
    Ok(())
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// What subscribers receive after an operation was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutChange {
    pub change_type: ChangeType,
    pub affected_ids: Vec<EntityId>,
    pub timestamp: u64,
    pub source: LayoutSource,
    pub operation: LayoutOperation,
}

impl LayoutChange {
    pub(crate) fn from_operation(operation: &LayoutOperation) -> Self {
        Self {
            change_type: operation.change_type(),
            affected_ids: operation.affected_ids(),
            timestamp: operation.timestamp,
            source: operation.source,
            operation: operation.clone(),
        }
    }

    pub fn affects_node(&self, node_id: NodeId) -> bool {
        self.affected_ids.contains(&EntityId::Node(node_id))
    }
}

/// Result of [`LayoutStore::apply_operation`](crate::LayoutStore::apply_operation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Applied; the store is now at `version`
    Applied { version: u64 },
    /// Referenced a missing entity or created an existing one. Nothing changed.
    Ignored,
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, OperationOutcome::Applied { .. })
    }
}
