//! The graph model the link connector commits to.
//!
//! [`LinkNetwork`] is the seam between the connector and whatever owns the
//! real nodes and links. [`Graph`] is an in-memory implementation that keeps
//! a [`LayoutStore`] in sync: every link or reroute it adds or removes is
//! mirrored as the matching store operation.

use crate::error::LayoutError;
use crate::geometry::{Point, Size};
use crate::graph::SlotDescriptor;
use crate::layout::{LinkId, LinkLayout, NodeId, RerouteId, SlotKey, SlotKind};
use crate::operation::OperationOutcome;
use crate::store::LayoutStore;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// An input slot. Inputs hold at most one link.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub descriptor: SlotDescriptor,
    pub link: Option<LinkId>,
}

/// An output slot. Outputs fan out to any number of links.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSlot {
    pub descriptor: SlotDescriptor,
    pub links: Vec<LinkId>,
}

/// A node as the graph model sees it: just its slots.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
}

impl GraphNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        self.inputs.push(InputSlot {
            descriptor: SlotDescriptor::new(name, slot_type),
            link: None,
        });
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        self.outputs.push(OutputSlot {
            descriptor: SlotDescriptor::new(name, slot_type),
            links: Vec::new(),
        });
        self
    }

    pub fn slot_count(&self, kind: SlotKind) -> usize {
        match kind {
            SlotKind::Input => self.inputs.len(),
            SlotKind::Output => self.outputs.len(),
        }
    }

    pub fn slot_descriptor(&self, kind: SlotKind, index: usize) -> Option<&SlotDescriptor> {
        match kind {
            SlotKind::Input => self.inputs.get(index).map(|slot| &slot.descriptor),
            SlotKind::Output => self.outputs.get(index).map(|slot| &slot.descriptor),
        }
    }

    /// Links attached to a slot. At most one for inputs.
    pub fn slot_links(&self, kind: SlotKind, index: usize) -> Vec<LinkId> {
        match kind {
            SlotKind::Input => self
                .inputs
                .get(index)
                .and_then(|slot| slot.link)
                .into_iter()
                .collect(),
            SlotKind::Output => self
                .outputs
                .get(index)
                .map(|slot| slot.links.clone())
                .unwrap_or_default(),
        }
    }
}

/// A committed link.
///
/// `dragging` is a render hint set by the connector while the link is being
/// moved; it is shared through the `Rc` so the renderer sees it too.
#[derive(Debug)]
pub struct GraphLink {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
    /// Last reroute before the target
    pub parent_id: Option<RerouteId>,
    pub link_type: String,
    dragging: Cell<bool>,
}

impl GraphLink {
    pub fn new(
        id: LinkId,
        origin: SlotKey,
        target: SlotKey,
        parent_id: Option<RerouteId>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            origin_id: origin.node_id,
            origin_slot: origin.index,
            target_id: target.node_id,
            target_slot: target.index,
            parent_id,
            link_type: link_type.into(),
            dragging: Cell::new(false),
        }
    }

    pub fn origin_key(&self) -> SlotKey {
        SlotKey::output(self.origin_id, self.origin_slot)
    }

    pub fn target_key(&self) -> SlotKey {
        SlotKey::input(self.target_id, self.target_slot)
    }

    pub fn has_origin(&self, node_id: NodeId, slot: usize) -> bool {
        self.origin_id == node_id && self.origin_slot == slot
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.get()
    }

    pub fn set_dragging(&self, dragging: bool) {
        self.dragging.set(dragging);
    }

    /// The store record for this link
    pub fn to_layout(&self) -> LinkLayout {
        LinkLayout::new(
            self.id,
            self.origin_id,
            self.origin_slot,
            self.target_id,
            self.target_slot,
        )
        .with_parent(self.parent_id)
    }
}

/// A committed reroute.
#[derive(Debug)]
pub struct GraphReroute {
    pub id: RerouteId,
    pub position: Point,
    /// Next reroute towards the source
    pub parent_id: Option<RerouteId>,
    link_ids: RefCell<Vec<LinkId>>,
    dragging: Cell<bool>,
}

impl GraphReroute {
    pub fn new(id: RerouteId, position: Point, parent_id: Option<RerouteId>) -> Self {
        Self {
            id,
            position,
            parent_id,
            link_ids: RefCell::new(Vec::new()),
            dragging: Cell::new(false),
        }
    }

    pub fn link_ids(&self) -> Vec<LinkId> {
        self.link_ids.borrow().clone()
    }

    pub fn first_link(&self) -> Option<LinkId> {
        self.link_ids.borrow().first().copied()
    }

    pub fn add_link(&self, link_id: LinkId) {
        let mut ids = self.link_ids.borrow_mut();
        if !ids.contains(&link_id) {
            ids.push(link_id);
        }
    }

    pub fn remove_link(&self, link_id: LinkId) {
        self.link_ids.borrow_mut().retain(|id| *id != link_id);
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.get()
    }

    pub fn set_dragging(&self, dragging: bool) {
        self.dragging.set(dragging);
    }
}

/// Graph model collaborator.
///
/// The connector reads nodes, links and reroutes through this trait and
/// commits through [`connect_slots`](LinkNetwork::connect_slots) and
/// [`disconnect_link`](LinkNetwork::disconnect_link).
pub trait LinkNetwork {
    fn node(&self, node_id: NodeId) -> Option<&GraphNode>;

    fn link(&self, link_id: LinkId) -> Option<Rc<GraphLink>>;

    fn reroute(&self, reroute_id: RerouteId) -> Option<Rc<GraphReroute>>;

    /// Connect an output to an input, replacing whatever the input held.
    /// Returns `None` when either slot does not exist.
    fn connect_slots(
        &mut self,
        origin: SlotKey,
        target: SlotKey,
        parent_id: Option<RerouteId>,
    ) -> Option<Rc<GraphLink>>;

    /// Remove a link. Returns false if it was already gone.
    fn disconnect_link(&mut self, link_id: LinkId) -> bool;

    /// The link occupying an input slot
    fn input_link(&self, slot: SlotKey) -> Option<Rc<GraphLink>> {
        let node = self.node(slot.node_id)?;
        let link_id = node.inputs.get(slot.index)?.link?;
        self.link(link_id)
    }

    /// Every link leaving an output slot
    fn output_links(&self, slot: SlotKey) -> Vec<Rc<GraphLink>> {
        self.node(slot.node_id)
            .map(|node| node.slot_links(SlotKind::Output, slot.index))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|link_id| self.link(link_id))
            .collect()
    }

    /// Reroute ids walking from `start` towards the source, `start` first.
    fn reroute_ancestors(&self, start: Option<RerouteId>) -> Result<Vec<RerouteId>, LayoutError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = start;
        while let Some(reroute_id) = next {
            if !visited.insert(reroute_id) {
                return Err(LayoutError::RerouteLoop(reroute_id));
            }
            let Some(reroute) = self.reroute(reroute_id) else {
                break;
            };
            chain.push(reroute_id);
            next = reroute.parent_id;
        }
        Ok(chain)
    }

    /// Reroutes a link passes through, ordered from source to target
    fn reroute_chain(&self, link: &GraphLink) -> Result<Vec<Rc<GraphReroute>>, LayoutError> {
        let mut ids = self.reroute_ancestors(link.parent_id)?;
        ids.reverse();
        Ok(ids.into_iter().filter_map(|id| self.reroute(id)).collect())
    }

    /// The reroute nearest the link's source
    fn first_reroute(&self, link: &GraphLink) -> Result<Option<Rc<GraphReroute>>, LayoutError> {
        Ok(self.reroute_chain(link)?.into_iter().next())
    }
}

/// In-memory graph that mirrors its links and reroutes into a [`LayoutStore`].
///
/// # Example
///
/// ```
/// use node_editor_layout::{Graph, GraphNode, LayoutStore, LinkNetwork, NodeId, Point, Size, SlotKey};
///
/// let mut graph = Graph::new(LayoutStore::new());
/// graph.add_node(GraphNode::new(NodeId(1)).with_output("out", "INT"), Point::new(0.0, 0.0), Size::new(100.0, 60.0)).unwrap();
/// graph.add_node(GraphNode::new(NodeId(2)).with_input("in", "INT"), Point::new(200.0, 0.0), Size::new(100.0, 60.0)).unwrap();
///
/// let link = graph.connect_slots(SlotKey::output(NodeId(1), 0), SlotKey::input(NodeId(2), 0), None).unwrap();
/// assert!(graph.store().link_layout(link.id).is_some());
/// ```
#[derive(Debug)]
pub struct Graph {
    store: LayoutStore,
    nodes: BTreeMap<NodeId, GraphNode>,
    links: BTreeMap<LinkId, Rc<GraphLink>>,
    reroutes: BTreeMap<RerouteId, Rc<GraphReroute>>,
    next_link_id: i32,
    next_reroute_id: i32,
}

impl Graph {
    pub fn new(store: LayoutStore) -> Self {
        Self {
            store,
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            reroutes: BTreeMap::new(),
            next_link_id: 1,
            next_reroute_id: 1,
        }
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn links(&self) -> Vec<Rc<GraphLink>> {
        self.links.values().cloned().collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn reroutes(&self) -> Vec<Rc<GraphReroute>> {
        self.reroutes.values().cloned().collect()
    }

    /// Add a node and create its layout. A node id that is already taken is
    /// ignored.
    pub fn add_node(
        &mut self,
        node: GraphNode,
        position: Point,
        size: Size,
    ) -> Result<OperationOutcome, LayoutError> {
        if self.nodes.contains_key(&node.id) {
            warn!("node {} already in graph", node.id);
            return Ok(OperationOutcome::Ignored);
        }
        let node_id = node.id;
        let outcome = self.store.create_node(node_id, position, size)?;
        self.nodes.insert(node_id, node);
        Ok(outcome)
    }

    /// Remove a node together with its links and slot layouts.
    ///
    /// The store never cascades, so each dependent entity is deleted
    /// explicitly before the node itself.
    pub fn remove_node(&mut self, node_id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&node_id) else {
            return false;
        };
        let attached: Vec<LinkId> = node
            .inputs
            .iter()
            .filter_map(|slot| slot.link)
            .chain(node.outputs.iter().flat_map(|slot| slot.links.iter().copied()))
            .collect();
        for link_id in attached {
            self.disconnect_link(link_id);
        }
        self.nodes.remove(&node_id);
        self.store.delete_node_slot_layouts(node_id);
        self.mirror(self.store.delete_node(node_id), "delete node");
        true
    }

    /// Add a reroute after `parent_id` and mirror it into the store
    pub fn add_reroute(&mut self, position: Point, parent_id: Option<RerouteId>) -> RerouteId {
        let reroute_id = RerouteId(self.next_reroute_id);
        self.next_reroute_id += 1;
        self.reroutes.insert(
            reroute_id,
            Rc::new(GraphReroute::new(reroute_id, position, parent_id)),
        );
        self.mirror(
            self.store
                .create_reroute(reroute_id, position, parent_id, Vec::new()),
            "create reroute",
        );
        reroute_id
    }

    pub fn remove_reroute(&mut self, reroute_id: RerouteId) -> bool {
        if self.reroutes.remove(&reroute_id).is_none() {
            return false;
        }
        self.mirror(self.store.delete_reroute(reroute_id), "delete reroute");
        true
    }

    fn mirror(&self, result: Result<OperationOutcome, LayoutError>, what: &str) {
        match result {
            Ok(OperationOutcome::Applied { version }) => {
                debug!("{} mirrored at version {}", what, version)
            }
            Ok(OperationOutcome::Ignored) => debug!("{} ignored by layout store", what),
            Err(err) => warn!("{} rejected by layout store: {}", what, err),
        }
    }

    fn chain_ids(&self, parent_id: Option<RerouteId>) -> Vec<RerouteId> {
        match self.reroute_ancestors(parent_id) {
            Ok(ids) => ids,
            Err(err) => {
                warn!("{}", err);
                Vec::new()
            }
        }
    }
}

impl LinkNetwork for Graph {
    fn node(&self, node_id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&node_id)
    }

    fn link(&self, link_id: LinkId) -> Option<Rc<GraphLink>> {
        self.links.get(&link_id).cloned()
    }

    fn reroute(&self, reroute_id: RerouteId) -> Option<Rc<GraphReroute>> {
        self.reroutes.get(&reroute_id).cloned()
    }

    fn connect_slots(
        &mut self,
        origin: SlotKey,
        target: SlotKey,
        parent_id: Option<RerouteId>,
    ) -> Option<Rc<GraphLink>> {
        if origin.kind != SlotKind::Output || target.kind != SlotKind::Input {
            warn!("cannot connect {:?} to {:?}", origin, target);
            return None;
        }
        if origin.node_id == target.node_id {
            warn!("cannot link node {} to itself", origin.node_id);
            return None;
        }
        let link_type = self
            .nodes
            .get(&origin.node_id)
            .and_then(|node| node.slot_descriptor(SlotKind::Output, origin.index))
            .map(|slot| slot.slot_type.clone());
        let Some(link_type) = link_type else {
            warn!("output {} of node {} not found", origin.index, origin.node_id);
            return None;
        };
        let replaced = match self
            .nodes
            .get(&target.node_id)
            .and_then(|node| node.inputs.get(target.index))
        {
            Some(slot) => slot.link,
            None => {
                warn!("input {} of node {} not found", target.index, target.node_id);
                return None;
            }
        };

        let link_id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        let link = Rc::new(GraphLink::new(link_id, origin, target, parent_id, link_type));

        // Claim reroutes before the replaced link releases them
        for reroute_id in self.chain_ids(parent_id) {
            if let Some(reroute) = self.reroutes.get(&reroute_id) {
                reroute.add_link(link_id);
                self.store.set_reroute_links(reroute_id, reroute.link_ids());
            }
        }
        if let Some(old) = replaced {
            self.disconnect_link(old);
        }

        if let Some(slot) = self
            .nodes
            .get_mut(&origin.node_id)
            .and_then(|node| node.outputs.get_mut(origin.index))
        {
            slot.links.push(link_id);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&target.node_id)
            .and_then(|node| node.inputs.get_mut(target.index))
        {
            slot.link = Some(link_id);
        }
        self.links.insert(link_id, link.clone());
        debug!("connected {:?} -> {:?} as link {}", origin, target, link_id);

        self.mirror(self.store.create_link(link.to_layout()), "create link");
        Some(link)
    }

    fn disconnect_link(&mut self, link_id: LinkId) -> bool {
        let Some(link) = self.links.remove(&link_id) else {
            return false;
        };
        if let Some(slot) = self
            .nodes
            .get_mut(&link.origin_id)
            .and_then(|node| node.outputs.get_mut(link.origin_slot))
        {
            slot.links.retain(|id| *id != link_id);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&link.target_id)
            .and_then(|node| node.inputs.get_mut(link.target_slot))
        {
            if slot.link == Some(link_id) {
                slot.link = None;
            }
        }
        self.mirror(self.store.delete_link(link_id), "delete link");

        // Reroutes left without any link go with it
        for reroute_id in self.chain_ids(link.parent_id) {
            let orphaned = match self.reroutes.get(&reroute_id) {
                Some(reroute) => {
                    reroute.remove_link(link_id);
                    let link_ids = reroute.link_ids();
                    if !link_ids.is_empty() {
                        self.store.set_reroute_links(reroute_id, link_ids);
                    }
                    reroute.link_ids.borrow().is_empty()
                }
                None => false,
            };
            if orphaned {
                self.remove_reroute(reroute_id);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Graph {
        let mut graph = Graph::new(LayoutStore::new());
        graph
            .add_node(
                GraphNode::new(NodeId(1)).with_output("out", "INT"),
                Point::new(0.0, 0.0),
                Size::new(100.0, 60.0),
            )
            .unwrap();
        graph
            .add_node(
                GraphNode::new(NodeId(2))
                    .with_input("a", "INT")
                    .with_input("b", "FLOAT"),
                Point::new(300.0, 0.0),
                Size::new(100.0, 60.0),
            )
            .unwrap();
        graph
    }

    fn out(node: i32, index: usize) -> SlotKey {
        SlotKey::output(NodeId(node), index)
    }

    fn inp(node: i32, index: usize) -> SlotKey {
        SlotKey::input(NodeId(node), index)
    }

    // ========================================================================
    // Connecting
    // ========================================================================

    #[test]
    fn test_connect_updates_slots_and_store() {
        let mut graph = graph();
        let link = graph.connect_slots(out(1, 0), inp(2, 1), None).unwrap();

        assert_eq!(link.link_type, "INT");
        assert_eq!(graph.node(NodeId(1)).unwrap().outputs[0].links, vec![link.id]);
        assert_eq!(graph.node(NodeId(2)).unwrap().inputs[1].link, Some(link.id));
        let layout = graph.store().link_layout(link.id).unwrap();
        assert_eq!(layout.target_slot, 1);
    }

    #[test]
    fn test_connect_replaces_occupied_input() {
        let mut graph = graph();
        let first = graph.connect_slots(out(1, 0), inp(2, 0), None).unwrap();
        let second = graph.connect_slots(out(1, 0), inp(2, 0), None).unwrap();

        assert!(graph.link(first.id).is_none());
        assert!(graph.store().link_layout(first.id).is_none());
        assert_eq!(graph.input_link(inp(2, 0)).unwrap().id, second.id);
        assert_eq!(graph.output_links(out(1, 0)).len(), 1);
    }

    #[test]
    fn test_connect_rejects_missing_slots_and_self_links() {
        let mut graph = graph();
        assert!(graph.connect_slots(out(1, 5), inp(2, 0), None).is_none());
        assert!(graph.connect_slots(out(1, 0), inp(2, 9), None).is_none());
        assert!(graph.connect_slots(out(1, 0), inp(1, 0), None).is_none());
        assert!(graph.connect_slots(inp(2, 0), out(1, 0), None).is_none());
        assert_eq!(graph.link_count(), 0);
    }

    // ========================================================================
    // Reroutes
    // ========================================================================

    #[test]
    fn test_reroute_chain_source_to_target() {
        let mut graph = graph();
        let r1 = graph.add_reroute(Point::new(120.0, 30.0), None);
        let r2 = graph.add_reroute(Point::new(200.0, 30.0), Some(r1));
        let link = graph.connect_slots(out(1, 0), inp(2, 0), Some(r2)).unwrap();

        let chain: Vec<RerouteId> = graph
            .reroute_chain(&link)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(chain, vec![r1, r2]);
        assert_eq!(graph.first_reroute(&link).unwrap().unwrap().id, r1);
        assert_eq!(graph.reroute(r1).unwrap().link_ids(), vec![link.id]);
        assert_eq!(graph.store().reroute_chain(link.id).unwrap(), vec![r1, r2]);
    }

    #[test]
    fn test_disconnect_removes_orphaned_reroutes() {
        let mut graph = graph();
        let r1 = graph.add_reroute(Point::new(120.0, 30.0), None);
        let link = graph.connect_slots(out(1, 0), inp(2, 0), Some(r1)).unwrap();
        let kept = graph.connect_slots(out(1, 0), inp(2, 1), Some(r1)).unwrap();

        assert!(graph.disconnect_link(link.id));
        assert!(graph.reroute(r1).is_some());

        assert!(graph.disconnect_link(kept.id));
        assert!(graph.reroute(r1).is_none());
        assert!(graph.store().reroute_layout(r1).is_none());
        assert!(!graph.disconnect_link(kept.id));
    }

    #[test]
    fn test_replacing_link_keeps_shared_reroute() {
        let mut graph = graph();
        let r1 = graph.add_reroute(Point::new(120.0, 30.0), None);
        let old = graph.connect_slots(out(1, 0), inp(2, 0), Some(r1)).unwrap();
        let new = graph.connect_slots(out(1, 0), inp(2, 0), Some(r1)).unwrap();

        assert!(graph.link(old.id).is_none());
        assert_eq!(graph.reroute(r1).unwrap().link_ids(), vec![new.id]);
        assert!(graph.store().reroute_layout(r1).is_some());
    }

    #[test]
    fn test_store_reroute_tracks_link_membership() {
        let mut graph = graph();
        let r1 = graph.add_reroute(Point::new(120.0, 30.0), None);
        let r2 = graph.add_reroute(Point::new(160.0, 30.0), Some(r1));
        let version = graph.store().version();

        let first = graph.connect_slots(out(1, 0), inp(2, 0), Some(r2)).unwrap();
        let second = graph.connect_slots(out(1, 0), inp(2, 1), Some(r1)).unwrap();
        let link_ids = |id| graph.store().reroute_layout(id).unwrap().link_ids;
        assert_eq!(link_ids(r1), vec![first.id, second.id]);
        assert_eq!(link_ids(r2), vec![first.id]);

        graph.disconnect_link(first.id);
        assert_eq!(graph.store().reroute_layout(r1).unwrap().link_ids, vec![second.id]);
        assert!(graph.store().reroute_layout(r2).is_none());
        // Membership is derived data: only the link and reroute operations count
        assert_eq!(graph.store().version(), version + 4);
    }

    // ========================================================================
    // Removal
    // ========================================================================

    #[test]
    fn test_remove_node_deletes_dependents_explicitly() {
        let mut graph = graph();
        let link = graph.connect_slots(out(1, 0), inp(2, 0), None).unwrap();

        assert!(graph.remove_node(NodeId(2)));
        assert!(graph.link(link.id).is_none());
        assert!(graph.store().link_layout(link.id).is_none());
        assert!(graph.store().node_layout(NodeId(2)).is_none());
        assert!(graph.node(NodeId(1)).unwrap().outputs[0].links.is_empty());
        assert!(!graph.remove_node(NodeId(2)));
    }

    #[test]
    fn test_add_duplicate_node_is_ignored() {
        let mut graph = graph();
        let outcome = graph
            .add_node(GraphNode::new(NodeId(1)), Point::default(), Size::new(1.0, 1.0))
            .unwrap();
        assert_eq!(outcome, OperationOutcome::Ignored);
        assert_eq!(graph.node(NodeId(1)).unwrap().outputs.len(), 1);
    }
}
