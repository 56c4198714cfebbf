//! The authoritative geometry store.
//!
//! [`LayoutStore`] owns the layout of every node, slot, link, link segment
//! and reroute in canvas space, plus one spatial index per collection. Entity
//! geometry only changes through [`LayoutStore::apply_operation`]; each
//! accepted operation bumps the version once, is appended to the operation
//! log and is announced to subscribers.
//!
//! Slot positions and link/segment paths are derived geometry. They are
//! written through the cache maintenance methods (`update_slot_layout`,
//! `update_link_geometry`, ...) which bypass the log and leave the version
//! alone.
//!
//! # Example
//!
//! ```
//! use node_editor_layout::{LayoutStore, NodeId, Point, Size};
//!
//! let store = LayoutStore::new();
//! store.create_node(NodeId(1), Point::new(10.0, 10.0), Size::new(100.0, 50.0)).unwrap();
//!
//! assert_eq!(store.query_node_at_point(Point::new(50.0, 30.0)), Some(NodeId(1)));
//! assert_eq!(store.query_node_at_point(Point::new(200.0, 30.0)), None);
//! assert_eq!(store.version(), 1);
//! ```

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::{Point, Size};
use crate::layout::{
    LinkId, LinkLayout, LinkSegmentLayout, NodeId, NodeLayout, RerouteId, RerouteLayout,
    SegmentKey, SlotKey, SlotLayout,
};
use crate::operation::{
    LayoutChange, LayoutOperation, LayoutSource, OperationKind, OperationOutcome,
};
use crate::path::LinkPath;
use crate::spatial::SpatialIndex;
use log::debug;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn(&LayoutChange)>;

pub(crate) struct StoreState {
    pub(crate) config: LayoutConfig,
    version: u64,
    source: LayoutSource,
    actor: String,

    pub(crate) nodes: BTreeMap<NodeId, NodeLayout>,
    pub(crate) slots: BTreeMap<SlotKey, SlotLayout>,
    pub(crate) links: BTreeMap<LinkId, LinkLayout>,
    /// Ordered chain per link, the `None` segment last
    pub(crate) segments: HashMap<LinkId, Vec<LinkSegmentLayout>>,
    pub(crate) reroutes: BTreeMap<RerouteId, RerouteLayout>,

    pub(crate) node_index: SpatialIndex<NodeId>,
    pub(crate) slot_index: SpatialIndex<SlotKey>,
    pub(crate) link_index: SpatialIndex<LinkId>,
    pub(crate) segment_index: SpatialIndex<SegmentKey>,
    pub(crate) reroute_index: SpatialIndex<RerouteId>,

    /// Monotonic stamp of the last geometry update per link
    pub(crate) link_stamps: HashMap<LinkId, u64>,
    stamp_counter: u64,

    operations: Vec<LayoutOperation>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

impl StoreState {
    fn new(config: LayoutConfig) -> Self {
        let cell_size = config.effective_cell_size();
        Self {
            config,
            version: 0,
            source: LayoutSource::External,
            actor: String::from("local"),
            nodes: BTreeMap::new(),
            slots: BTreeMap::new(),
            links: BTreeMap::new(),
            segments: HashMap::new(),
            reroutes: BTreeMap::new(),
            node_index: SpatialIndex::new(cell_size),
            slot_index: SpatialIndex::new(cell_size),
            link_index: SpatialIndex::new(cell_size),
            segment_index: SpatialIndex::new(cell_size),
            reroute_index: SpatialIndex::new(cell_size),
            link_stamps: HashMap::new(),
            stamp_counter: 0,
            operations: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    fn reset_collections(&mut self) {
        self.nodes.clear();
        self.slots.clear();
        self.links.clear();
        self.segments.clear();
        self.reroutes.clear();
        self.node_index.clear();
        self.slot_index.clear();
        self.link_index.clear();
        self.segment_index.clear();
        self.reroute_index.clear();
        self.link_stamps.clear();
        self.operations.clear();
    }

    fn touch_link(&mut self, link_id: LinkId) {
        self.stamp_counter += 1;
        self.link_stamps.insert(link_id, self.stamp_counter);
    }

    fn put_node(&mut self, layout: NodeLayout) {
        self.node_index.update(layout.id, layout.bounds);
        self.nodes.insert(layout.id, layout);
    }

    fn put_reroute(&mut self, reroute: RerouteLayout) {
        self.reroute_index.update(reroute.id, reroute.bounds);
        self.reroutes.insert(reroute.id, reroute);
    }

    fn put_link(&mut self, link: LinkLayout) {
        match link.path {
            Some(_) => self.link_index.update(link.id, link.bounds),
            None => {
                self.link_index.remove(&link.id);
            }
        }
        self.touch_link(link.id);
        self.links.insert(link.id, link);
    }

    fn drop_segments(&mut self, link_id: LinkId) {
        if let Some(chain) = self.segments.remove(&link_id) {
            for segment in chain {
                self.segment_index.remove(&segment.key());
            }
        }
    }

    /// Returns false when the operation referenced a missing entity or
    /// created one that already exists.
    fn apply_kind(&mut self, kind: &OperationKind) -> bool {
        match kind {
            OperationKind::CreateNode { layout } => {
                if self.nodes.contains_key(&layout.id) {
                    return false;
                }
                self.put_node(layout.clone());
            }
            OperationKind::DeleteNode { node_id, .. } => {
                if self.nodes.remove(node_id).is_none() {
                    return false;
                }
                self.node_index.remove(node_id);
            }
            OperationKind::MoveNode {
                node_id, position, ..
            } => return self.edit_node(*node_id, |node| node.set_position(*position)),
            OperationKind::ResizeNode { node_id, size, .. } => {
                return self.edit_node(*node_id, |node| node.set_size(*size))
            }
            OperationKind::SetNodeZIndex {
                node_id, z_index, ..
            } => return self.edit_node(*node_id, |node| node.z_index = *z_index),
            OperationKind::SetNodeVisibility {
                node_id, visible, ..
            } => return self.edit_node(*node_id, |node| node.visible = *visible),
            OperationKind::BatchUpdateBounds { updates } => {
                let mut any = false;
                for update in updates {
                    if self.edit_node(update.node_id, |node| node.set_bounds(update.bounds)) {
                        any = true;
                    } else {
                        debug!("batch bounds update skipped missing node {}", update.node_id);
                    }
                }
                return any;
            }
            OperationKind::CreateLink { link } => {
                if self.links.contains_key(&link.id) {
                    return false;
                }
                self.put_link(link.clone());
            }
            OperationKind::DeleteLink { link_id, .. } => {
                if self.links.remove(link_id).is_none() {
                    return false;
                }
                self.link_index.remove(link_id);
                self.link_stamps.remove(link_id);
                self.drop_segments(*link_id);
            }
            OperationKind::CreateReroute { reroute } => {
                if self.reroutes.contains_key(&reroute.id) {
                    return false;
                }
                self.put_reroute(reroute.clone());
            }
            OperationKind::DeleteReroute { reroute_id, .. } => {
                if self.reroutes.remove(reroute_id).is_none() {
                    return false;
                }
                self.reroute_index.remove(reroute_id);
            }
            OperationKind::MoveReroute {
                reroute_id,
                position,
                ..
            } => {
                let Some(reroute) = self.reroutes.get_mut(reroute_id) else {
                    return false;
                };
                reroute.set_position(*position);
                let bounds = reroute.bounds;
                self.reroute_index.update(*reroute_id, bounds);
            }
        }
        true
    }

    fn edit_node(&mut self, node_id: NodeId, edit: impl FnOnce(&mut NodeLayout)) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        edit(node);
        let bounds = node.bounds;
        self.node_index.update(node_id, bounds);
        true
    }
}

/// Shared handle to the geometry store.
///
/// Cloning is cheap; every clone sees the same state. The store is
/// single-threaded.
#[derive(Clone)]
pub struct LayoutStore {
    pub(crate) inner: Rc<RefCell<StoreState>>,
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("LayoutStore")
            .field("version", &state.version)
            .field("nodes", &state.nodes.len())
            .field("links", &state.links.len())
            .field("reroutes", &state.reroutes.len())
            .finish()
    }
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreState::new(config))),
        }
    }

    pub fn config(&self) -> LayoutConfig {
        self.inner.borrow().config.clone()
    }

    /// Number of accepted operations (plus resets) so far
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Source stamped on operations built by the convenience methods
    pub fn set_source(&self, source: LayoutSource) {
        self.inner.borrow_mut().source = source;
    }

    pub fn source(&self) -> LayoutSource {
        self.inner.borrow().source
    }

    pub fn set_actor(&self, actor: impl Into<String>) {
        self.inner.borrow_mut().actor = actor.into();
    }

    pub fn actor(&self) -> String {
        self.inner.borrow().actor.clone()
    }

    // ========================================================================
    // Single-entity access
    // ========================================================================

    /// Live cell for one node. Reads snapshot the current layout; writes are
    /// turned into operations.
    pub fn get_node_layout(&self, node_id: NodeId) -> NodeLayoutRef {
        NodeLayoutRef {
            store: self.clone(),
            node_id,
        }
    }

    pub fn node_layout(&self, node_id: NodeId) -> Option<NodeLayout> {
        self.inner.borrow().nodes.get(&node_id).cloned()
    }

    /// Every node, ordered by id
    pub fn all_nodes(&self) -> Vec<NodeLayout> {
        self.inner.borrow().nodes.values().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn slot_layout(&self, key: SlotKey) -> Option<SlotLayout> {
        self.inner.borrow().slots.get(&key).copied()
    }

    pub fn all_slot_keys(&self) -> Vec<SlotKey> {
        self.inner.borrow().slots.keys().copied().collect()
    }

    pub fn link_layout(&self, link_id: LinkId) -> Option<LinkLayout> {
        self.inner.borrow().links.get(&link_id).cloned()
    }

    /// Every link, ordered by id
    pub fn all_links(&self) -> Vec<LinkLayout> {
        self.inner.borrow().links.values().cloned().collect()
    }

    /// Links with an endpoint on `node_id`, ordered by id
    pub fn links_for_node(&self, node_id: NodeId) -> Vec<LinkId> {
        self.inner
            .borrow()
            .links
            .values()
            .filter(|link| link.touches_node(node_id))
            .map(|link| link.id)
            .collect()
    }

    /// Segment chain of a link from source to target
    pub fn link_segments(&self, link_id: LinkId) -> Vec<LinkSegmentLayout> {
        self.inner
            .borrow()
            .segments
            .get(&link_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn link_segment(&self, key: SegmentKey) -> Option<LinkSegmentLayout> {
        self.inner
            .borrow()
            .segments
            .get(&key.link_id)?
            .iter()
            .find(|segment| segment.reroute_id == key.reroute_id)
            .copied()
    }

    pub fn reroute_layout(&self, reroute_id: RerouteId) -> Option<RerouteLayout> {
        self.inner.borrow().reroutes.get(&reroute_id).cloned()
    }

    pub fn all_reroutes(&self) -> Vec<RerouteLayout> {
        self.inner.borrow().reroutes.values().cloned().collect()
    }

    /// Reroutes a link passes through, ordered from source to target.
    ///
    /// Walks `parent_id` from the link towards the source. A reroute that is
    /// missing from the store ends the walk; revisiting one is an error.
    pub fn reroute_chain(&self, link_id: LinkId) -> Result<Vec<RerouteId>, LayoutError> {
        let state = self.inner.borrow();
        let Some(link) = state.links.get(&link_id) else {
            return Ok(Vec::new());
        };

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = link.parent_id;
        while let Some(reroute_id) = next {
            if !visited.insert(reroute_id) {
                return Err(LayoutError::RerouteLoop(reroute_id));
            }
            let Some(reroute) = state.reroutes.get(&reroute_id) else {
                debug!("reroute chain of link {} ends at missing reroute {}", link_id, reroute_id);
                break;
            };
            chain.push(reroute_id);
            next = reroute.parent_id;
        }
        chain.reverse();
        Ok(chain)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Apply one operation.
    ///
    /// Malformed operations are rejected with an error. Operations that
    /// reference missing entities, or create existing ones, are ignored.
    /// Otherwise the version is bumped once, the operation is logged and every
    /// subscriber is called once, after the store's borrow is released.
    pub fn apply_operation(&self, operation: LayoutOperation) -> Result<OperationOutcome, LayoutError> {
        operation.validate()?;

        let (version, listeners, change) = {
            let mut state = self.inner.borrow_mut();
            if !state.apply_kind(&operation.kind) {
                debug!(
                    "ignored {:?} from {}: stale or duplicate id {:?}",
                    operation.change_type(),
                    operation.actor,
                    operation.affected_ids()
                );
                return Ok(OperationOutcome::Ignored);
            }
            state.version += 1;
            let change = LayoutChange::from_operation(&operation);
            state.operations.push(operation);
            let listeners: Vec<Listener> = state.listeners.iter().map(|(_, l)| l.clone()).collect();
            (state.version, listeners, change)
        };

        for listener in listeners {
            listener(&change);
        }
        Ok(OperationOutcome::Applied { version })
    }

    /// Register a change subscriber
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LayoutChange) + 'static,
    {
        let mut state = self.inner.borrow_mut();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, Rc::new(callback)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub(crate) fn downgrade(&self) -> WeakLayoutStore {
        WeakLayoutStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    // ========================================================================
    // Operation log
    // ========================================================================

    pub fn operations(&self) -> Vec<LayoutOperation> {
        self.inner.borrow().operations.clone()
    }

    /// Operations with a timestamp strictly after `timestamp`
    pub fn operations_since(&self, timestamp: u64) -> Vec<LayoutOperation> {
        self.inner
            .borrow()
            .operations
            .iter()
            .filter(|op| op.timestamp > timestamp)
            .cloned()
            .collect()
    }

    pub fn operations_by_actor(&self, actor: &str) -> Vec<LayoutOperation> {
        self.inner
            .borrow()
            .operations
            .iter()
            .filter(|op| op.actor == actor)
            .cloned()
            .collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Empty every collection, index and the log. Subscribers stay registered
    /// and the version keeps counting up.
    pub fn clear(&self) {
        let mut state = self.inner.borrow_mut();
        state.reset_collections();
        state.version += 1;
        debug!("layout store cleared at version {}", state.version);
    }

    /// Replace everything with `nodes`. Each node's z-index is its position in
    /// the input.
    pub fn initialize_nodes<I>(&self, nodes: I)
    where
        I: IntoIterator<Item = (NodeId, Point, Size)>,
    {
        let mut state = self.inner.borrow_mut();
        state.reset_collections();
        for (index, (id, position, size)) in nodes.into_iter().enumerate() {
            let layout = NodeLayout::new(id, position, size).with_z_index(index as i32);
            state.put_node(layout);
        }
        state.version += 1;
        debug!("layout store initialized with {} nodes", state.nodes.len());
    }

    // ========================================================================
    // Derived geometry: slots
    // ========================================================================

    /// Store a slot position. Returns false when nothing changed.
    pub fn update_slot_layout(&self, layout: SlotLayout) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.slots.get(&layout.key) == Some(&layout) {
            return false;
        }
        if !state.slots.contains_key(&layout.key) {
            debug!("slot layout inserted for {:?}", layout.key);
        }
        state.slot_index.update(layout.key, layout.bounds);
        state.slots.insert(layout.key, layout);
        true
    }

    pub fn batch_update_slot_layouts<I>(&self, layouts: I) -> usize
    where
        I: IntoIterator<Item = SlotLayout>,
    {
        layouts
            .into_iter()
            .filter(|layout| self.update_slot_layout(*layout))
            .count()
    }

    pub fn delete_slot_layout(&self, key: SlotKey) -> bool {
        let mut state = self.inner.borrow_mut();
        state.slot_index.remove(&key);
        state.slots.remove(&key).is_some()
    }

    /// Remove every slot of `node_id`; returns how many were removed
    pub fn delete_node_slot_layouts(&self, node_id: NodeId) -> usize {
        let mut state = self.inner.borrow_mut();
        let keys: Vec<SlotKey> = state
            .slots
            .keys()
            .filter(|key| key.node_id == node_id)
            .copied()
            .collect();
        for key in &keys {
            state.slots.remove(key);
            state.slot_index.remove(key);
        }
        keys.len()
    }

    pub fn clear_all_slot_layouts(&self) {
        let mut state = self.inner.borrow_mut();
        state.slots.clear();
        state.slot_index.clear();
    }

    // ========================================================================
    // Derived geometry: reroute membership
    // ========================================================================

    /// Record which links pass through a reroute. Returns false for unknown
    /// reroutes and unchanged membership.
    pub fn set_reroute_links(&self, reroute_id: RerouteId, link_ids: Vec<LinkId>) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(reroute) = state.reroutes.get_mut(&reroute_id) else {
            debug!("links for unknown reroute {} dropped", reroute_id);
            return false;
        };
        if reroute.link_ids == link_ids {
            return false;
        }
        reroute.link_ids = link_ids;
        true
    }

    // ========================================================================
    // Derived geometry: links and segments
    // ========================================================================

    /// Set a link's rendered path. Returns false for unknown links and
    /// unchanged paths.
    pub fn update_link_geometry(&self, link_id: LinkId, path: LinkPath) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(link) = state.links.get(&link_id) else {
            debug!("geometry for unknown link {} dropped", link_id);
            return false;
        };
        if link.path == Some(path) {
            return false;
        }
        let mut link = link.clone();
        link.path = Some(path);
        link.bounds = path.bounds();
        link.center = path.center();
        state.put_link(link);
        true
    }

    /// Replace a link's whole segment chain.
    ///
    /// Segments keep their given order except that the final (`None`)
    /// segment is moved last. Every segment must belong to `link_id` and keys
    /// must be unique.
    pub fn set_link_segments(
        &self,
        link_id: LinkId,
        segments: Vec<LinkSegmentLayout>,
    ) -> Result<bool, LayoutError> {
        let mut seen = HashSet::new();
        for segment in &segments {
            if segment.link_id != link_id {
                return Err(LayoutError::malformed(format!(
                    "segment of link {} in chain of link {}",
                    segment.link_id, link_id
                )));
            }
            if !seen.insert(segment.reroute_id) {
                return Err(LayoutError::malformed(format!(
                    "link {} has two segments ending at {:?}",
                    link_id, segment.reroute_id
                )));
            }
        }

        let (mut chain, tail): (Vec<_>, Vec<_>) =
            segments.into_iter().partition(|segment| segment.reroute_id.is_some());
        chain.extend(tail);

        let mut state = self.inner.borrow_mut();
        if !state.links.contains_key(&link_id) {
            debug!("segments for unknown link {} dropped", link_id);
            return Ok(false);
        }
        if state.segments.get(&link_id) == Some(&chain) {
            return Ok(false);
        }
        state.drop_segments(link_id);
        for segment in &chain {
            state.segment_index.insert(segment.key(), segment.bounds);
        }
        state.segments.insert(link_id, chain);
        state.touch_link(link_id);
        Ok(true)
    }

    /// Insert or replace one segment, keeping the chain order
    pub fn update_link_segment_layout(&self, segment: LinkSegmentLayout) -> bool {
        let mut state = self.inner.borrow_mut();
        if !state.links.contains_key(&segment.link_id) {
            debug!("segment for unknown link {} dropped", segment.link_id);
            return false;
        }
        let chain = state.segments.entry(segment.link_id).or_default();
        match chain.iter().position(|s| s.reroute_id == segment.reroute_id) {
            Some(i) if chain[i] == segment => return false,
            Some(i) => chain[i] = segment,
            None => {
                debug!("segment inserted for {:?}", segment.key());
                let at = match segment.reroute_id {
                    None => chain.len(),
                    Some(_) => chain
                        .iter()
                        .position(|s| s.reroute_id.is_none())
                        .unwrap_or(chain.len()),
                };
                chain.insert(at, segment);
            }
        }
        state.segment_index.update(segment.key(), segment.bounds);
        state.touch_link(segment.link_id);
        true
    }

    pub fn delete_link_segment_layout(&self, key: SegmentKey) -> bool {
        let mut state = self.inner.borrow_mut();
        let Some(chain) = state.segments.get_mut(&key.link_id) else {
            return false;
        };
        let Some(i) = chain.iter().position(|s| s.reroute_id == key.reroute_id) else {
            return false;
        };
        chain.remove(i);
        if chain.is_empty() {
            state.segments.remove(&key.link_id);
        }
        state.segment_index.remove(&key);
        true
    }
}

/// Live handle to one node's layout.
#[derive(Clone)]
pub struct NodeLayoutRef {
    store: LayoutStore,
    node_id: NodeId,
}

impl NodeLayoutRef {
    pub fn id(&self) -> NodeId {
        self.node_id
    }

    /// Snapshot of the current layout, `None` if the node does not exist
    pub fn get(&self) -> Option<NodeLayout> {
        self.store.node_layout(self.node_id)
    }

    /// Write through to the store.
    ///
    /// `Some` creates the node or issues one operation per changed field;
    /// `None` deletes it.
    pub fn set(&self, layout: Option<NodeLayout>) -> Result<(), LayoutError> {
        let current = self.get();
        match (current, layout) {
            (None, None) => Ok(()),
            (Some(_), None) => self.store.delete_node(self.node_id).map(|_| ()),
            (current, Some(layout)) => {
                if layout.id != self.node_id {
                    return Err(LayoutError::malformed(format!(
                        "layout of node {} written to node {}",
                        layout.id, self.node_id
                    )));
                }
                let Some(current) = current else {
                    let op = self.store.stamp(OperationKind::CreateNode { layout });
                    return self.store.apply_operation(op).map(|_| ());
                };
                if !layout.is_consistent() {
                    return Err(LayoutError::malformed(format!(
                        "bounds of node {} disagree with its position and size",
                        layout.id
                    )));
                }
                if layout.position != current.position {
                    self.store.move_node(self.node_id, layout.position)?;
                }
                if layout.size != current.size {
                    self.store.resize_node(self.node_id, layout.size)?;
                }
                if layout.z_index != current.z_index {
                    self.store.set_node_z_index(self.node_id, layout.z_index)?;
                }
                if layout.visible != current.visible {
                    self.store.set_node_visibility(self.node_id, layout.visible)?;
                }
                Ok(())
            }
        }
    }
}

/// Non-owning handle to a [`LayoutStore`], for listeners that live inside
/// the store they observe.
#[derive(Clone)]
pub(crate) struct WeakLayoutStore {
    inner: Weak<RefCell<StoreState>>,
}

impl WeakLayoutStore {
    pub(crate) fn upgrade(&self) -> Option<LayoutStore> {
        self.inner.upgrade().map(|inner| LayoutStore { inner })
    }
}

/// Handle returned by [`LayoutStore::on_change`].
pub struct Subscription {
    store: Weak<RefCell<StoreState>>,
    id: u64,
}

impl Subscription {
    /// Remove the subscriber. Does nothing if the store is gone.
    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.borrow_mut().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
