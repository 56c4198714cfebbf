//! The link connector: one connection gesture at a time.
//!
//! A gesture starts with one of the entry operations (`move_input_link`,
//! `move_output_link`, `drag_new_from_output`, `drag_new_from_input`,
//! `drag_from_reroute`), follows the pointer with `move_pointer`, commits
//! with `drop_links` and always ends with `reset`. Entry operations are only
//! accepted while idle.
//!
//! The connector reads geometry from the [`LayoutStore`] to find drop
//! targets and commits through a [`LinkNetwork`]. It never writes geometry
//! itself.

use crate::error::ConnectorError;
use crate::events::{ConnectorEvent, ConnectorEventKind, EventRegistry, ListenerId};
use crate::geometry::Point;
use crate::graph::{
    validate_link, LinkValidator, SlotDescriptor, TypeMatchValidator, ValidationError, ValidationResult,
};
use crate::layout::{LinkId, NodeId, RerouteId, SlotKey, SlotKind};
use crate::network::{GraphLink, GraphReroute, LinkNetwork};
use crate::store::LayoutStore;
use log::{debug, warn};
use std::rc::Rc;

/// Connector state. `connecting_to` is `None` while idle and otherwise names
/// the kind of slot still being sought.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkConnectorState {
    pub connecting_to: Option<SlotKind>,
    pub multi: bool,
    pub dragging_existing_links: bool,
    /// Position of the valid slot under the pointer, if any
    pub snap_links_pos: Option<Point>,
}

impl LinkConnectorState {
    pub fn is_idle(&self) -> bool {
        self.connecting_to.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderLinkKind {
    /// New link dragged from an output towards an input
    ToInput,
    /// New link dragged from an input towards an output
    ToOutput,
    /// Existing link whose input end is being moved
    MovingInput,
    /// Existing link whose output end is being moved
    MovingOutput,
}

impl RenderLinkKind {
    /// Kind of slot this link can be dropped on
    pub fn to_type(self) -> SlotKind {
        match self {
            Self::ToInput | Self::MovingInput => SlotKind::Input,
            Self::ToOutput | Self::MovingOutput => SlotKind::Output,
        }
    }

    pub fn is_moving(self) -> bool {
        matches!(self, Self::MovingInput | Self::MovingOutput)
    }
}

/// An uncommitted link being drawn from a fixed anchor to the pointer.
///
/// The anchor is referenced by id and the slot descriptor is copied, so a
/// render link stays valid if the anchor disappears mid-gesture.
#[derive(Debug, Clone)]
pub struct RenderLink {
    pub kind: RenderLinkKind,
    /// Node the link stays attached to
    pub node_id: NodeId,
    pub from_slot_index: usize,
    pub from_slot: SlotDescriptor,
    pub from_pos: Point,
    pub from_reroute: Option<RerouteId>,
    /// The existing link, for moving render links
    pub link: Option<Rc<GraphLink>>,
}

impl RenderLink {
    pub fn to_type(&self) -> SlotKind {
        self.kind.to_type()
    }

    /// Key of the anchored slot
    pub fn from_slot_key(&self) -> SlotKey {
        SlotKey::new(self.node_id, self.to_type().opposite(), self.from_slot_index)
    }
}

/// What a drop landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Slot(SlotKey),
    Node(NodeId),
    Reroute(RerouteId),
    Nothing,
    /// `drop_links` was called while idle
    NotConnecting,
}

/// Result of [`LinkConnector::drop_links`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub target: DropTarget,
    /// Links created by the drop
    pub created: Vec<LinkId>,
    /// Links removed by the drop
    pub disconnected: Vec<LinkId>,
}

impl DropOutcome {
    fn new(target: DropTarget) -> Self {
        Self {
            target,
            created: Vec::new(),
            disconnected: Vec::new(),
        }
    }

    pub fn is_committed(&self) -> bool {
        !self.created.is_empty() || !self.disconnected.is_empty()
    }
}

/// Snapshot of the connector for the renderer.
#[derive(Debug)]
pub struct LinkConnectorExport<'a, N: ?Sized> {
    pub state: LinkConnectorState,
    pub input_links: Vec<Rc<GraphLink>>,
    pub output_links: Vec<Rc<GraphLink>>,
    pub render_links: Vec<RenderLink>,
    pub network: &'a N,
    pub pointer: Option<Point>,
}

/// Single-flight state machine for connecting and moving links.
///
/// # Example
///
/// ```
/// use node_editor_layout::{Graph, GraphNode, LayoutStore, LinkConnector, NodeId, Point, Size, SlotKind};
///
/// let store = LayoutStore::new();
/// let mut graph = Graph::new(store.clone());
/// graph.add_node(GraphNode::new(NodeId(1)).with_output("out", "INT"), Point::new(0.0, 0.0), Size::new(100.0, 60.0)).unwrap();
///
/// let mut connector = LinkConnector::new(store);
/// connector.drag_new_from_output(&graph, NodeId(1), 0, None).unwrap();
/// assert_eq!(connector.state().connecting_to, Some(SlotKind::Input));
/// assert!(connector.drag_new_from_output(&graph, NodeId(1), 0, None).is_err());
///
/// connector.reset();
/// assert!(connector.state().is_idle());
/// ```
pub struct LinkConnector {
    store: LayoutStore,
    validator: Box<dyn LinkValidator>,
    state: LinkConnectorState,
    render_links: Vec<RenderLink>,
    input_links: Vec<Rc<GraphLink>>,
    output_links: Vec<Rc<GraphLink>>,
    hidden_reroutes: Vec<Rc<GraphReroute>>,
    pointer: Option<Point>,
    events: EventRegistry,
}

impl std::fmt::Debug for LinkConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkConnector")
            .field("state", &self.state)
            .field("render_links", &self.render_links.len())
            .field("input_links", &self.input_links.len())
            .field("output_links", &self.output_links.len())
            .field("hidden_reroutes", &self.hidden_reroutes.len())
            .finish()
    }
}

impl LinkConnector {
    pub fn new(store: LayoutStore) -> Self {
        Self {
            store,
            validator: Box::new(TypeMatchValidator),
            state: LinkConnectorState::default(),
            render_links: Vec::new(),
            input_links: Vec::new(),
            output_links: Vec::new(),
            hidden_reroutes: Vec::new(),
            pointer: None,
            events: EventRegistry::new(),
        }
    }

    /// Replace the type-compatibility check
    pub fn with_validator<V: LinkValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Box::new(validator);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn state(&self) -> LinkConnectorState {
        self.state
    }

    pub fn is_connecting(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn dragging_existing_links(&self) -> bool {
        self.state.dragging_existing_links
    }

    pub fn render_links(&self) -> &[RenderLink] {
        &self.render_links
    }

    pub fn input_links(&self) -> &[Rc<GraphLink>] {
        &self.input_links
    }

    pub fn output_links(&self) -> &[Rc<GraphLink>] {
        &self.output_links
    }

    pub fn hidden_reroutes(&self) -> &[Rc<GraphReroute>] {
        &self.hidden_reroutes
    }

    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    // ========================================================================
    // Entry operations
    // ========================================================================

    fn ensure_idle(&self) -> Result<(), ConnectorError> {
        if self.is_connecting() {
            warn!("gesture start rejected: {:?} already in flight", self.state.connecting_to);
            return Err(ConnectorError::AlreadyDragging);
        }
        Ok(())
    }

    /// Pick up the link on an input so its input end can be moved.
    ///
    /// An empty input leaves the connector idle.
    pub fn move_input_link<N>(&mut self, network: &N, node_id: NodeId, slot: usize) -> Result<(), ConnectorError>
    where
        N: LinkNetwork + ?Sized,
    {
        self.ensure_idle()?;
        let Some(link) = network.input_link(SlotKey::input(node_id, slot)) else {
            debug!("input {} of node {} has no link to move", slot, node_id);
            return Ok(());
        };
        let Some(render_link) = self.moving_render_link(network, &link, RenderLinkKind::MovingInput, link.parent_id) else {
            return Ok(());
        };

        link.set_dragging(true);
        self.render_links.push(render_link);
        self.input_links.push(link);
        self.state.connecting_to = Some(SlotKind::Input);
        self.state.dragging_existing_links = true;
        self.state.multi = false;
        debug!("moving input link from node {} slot {}", node_id, slot);
        Ok(())
    }

    /// Pick up every link on an output so their output ends can be moved.
    ///
    /// A link that passes through reroutes hides its first reroute instead
    /// of being flagged itself. An output with no links leaves the connector
    /// idle.
    pub fn move_output_link<N>(&mut self, network: &N, node_id: NodeId, slot: usize) -> Result<(), ConnectorError>
    where
        N: LinkNetwork + ?Sized,
    {
        self.ensure_idle()?;

        let mut picked = Vec::new();
        for link in network.output_links(SlotKey::output(node_id, slot)) {
            let first_reroute = network.first_reroute(&link)?;
            let from_reroute = first_reroute.as_ref().map(|r| r.id);
            if let Some(render_link) = self.moving_render_link(network, &link, RenderLinkKind::MovingOutput, from_reroute) {
                picked.push((link, first_reroute, render_link));
            }
        }
        if picked.is_empty() {
            debug!("output {} of node {} has no links to move", slot, node_id);
            return Ok(());
        }

        for (link, first_reroute, render_link) in picked {
            match first_reroute {
                Some(reroute) => {
                    reroute.set_dragging(true);
                    if !self.hidden_reroutes.iter().any(|r| r.id == reroute.id) {
                        self.hidden_reroutes.push(reroute);
                    }
                }
                None => link.set_dragging(true),
            }
            self.output_links.push(link);
            self.render_links.push(render_link);
        }
        self.state.connecting_to = Some(SlotKind::Output);
        self.state.dragging_existing_links = true;
        self.state.multi = true;
        debug!("moving {} output links from node {} slot {}", self.output_links.len(), node_id, slot);
        Ok(())
    }

    /// Start a new link from an output; the gesture then seeks an input
    pub fn drag_new_from_output<N>(
        &mut self,
        network: &N,
        node_id: NodeId,
        slot: usize,
        from_reroute: Option<RerouteId>,
    ) -> Result<(), ConnectorError>
    where
        N: LinkNetwork + ?Sized,
    {
        self.ensure_idle()?;
        self.start_new_link(network, SlotKey::output(node_id, slot), from_reroute);
        Ok(())
    }

    /// Start a new link from an input; the gesture then seeks an output
    pub fn drag_new_from_input<N>(
        &mut self,
        network: &N,
        node_id: NodeId,
        slot: usize,
        from_reroute: Option<RerouteId>,
    ) -> Result<(), ConnectorError>
    where
        N: LinkNetwork + ?Sized,
    {
        self.ensure_idle()?;
        self.start_new_link(network, SlotKey::input(node_id, slot), from_reroute);
        Ok(())
    }

    /// Start a new link from a reroute, carrying the output of the first
    /// link that passes through it
    pub fn drag_from_reroute<N>(&mut self, network: &N, reroute_id: RerouteId) -> Result<(), ConnectorError>
    where
        N: LinkNetwork + ?Sized,
    {
        self.ensure_idle()?;
        let link = network
            .reroute(reroute_id)
            .and_then(|reroute| reroute.first_link())
            .and_then(|link_id| network.link(link_id));
        let Some(link) = link else {
            debug!("reroute {} carries no link to drag from", reroute_id);
            return Ok(());
        };
        self.start_new_link(network, link.origin_key(), Some(reroute_id));
        Ok(())
    }

    fn start_new_link<N>(&mut self, network: &N, anchor: SlotKey, from_reroute: Option<RerouteId>)
    where
        N: LinkNetwork + ?Sized,
    {
        let descriptor = network
            .node(anchor.node_id)
            .and_then(|node| node.slot_descriptor(anchor.kind, anchor.index))
            .cloned();
        let Some(from_slot) = descriptor else {
            warn!("{} {} of node {} not found, nothing to drag", anchor.kind, anchor.index, anchor.node_id);
            return;
        };
        let kind = match anchor.kind {
            SlotKind::Output => RenderLinkKind::ToInput,
            SlotKind::Input => RenderLinkKind::ToOutput,
        };
        self.render_links.push(RenderLink {
            kind,
            node_id: anchor.node_id,
            from_slot_index: anchor.index,
            from_slot,
            from_pos: self.anchor_position(anchor, from_reroute),
            from_reroute,
            link: None,
        });
        self.state.connecting_to = Some(kind.to_type());
        self.state.dragging_existing_links = false;
        self.state.multi = false;
        debug!("dragging new link from {:?}", anchor);
    }

    fn moving_render_link<N>(
        &self,
        network: &N,
        link: &Rc<GraphLink>,
        kind: RenderLinkKind,
        from_reroute: Option<RerouteId>,
    ) -> Option<RenderLink>
    where
        N: LinkNetwork + ?Sized,
    {
        // The end that is not moving stays anchored
        let anchor = match kind {
            RenderLinkKind::MovingOutput => link.target_key(),
            _ => link.origin_key(),
        };
        let from_slot = network
            .node(anchor.node_id)
            .and_then(|node| node.slot_descriptor(anchor.kind, anchor.index))
            .cloned();
        let Some(from_slot) = from_slot else {
            warn!("could not create render link for link {}: {:?} not found", link.id, anchor);
            return None;
        };
        Some(RenderLink {
            kind,
            node_id: anchor.node_id,
            from_slot_index: anchor.index,
            from_slot,
            from_pos: self.anchor_position(anchor, from_reroute),
            from_reroute,
            link: Some(link.clone()),
        })
    }

    /// Where a render link starts: its reroute, else the slot, else the
    /// matching edge of the node
    fn anchor_position(&self, anchor: SlotKey, from_reroute: Option<RerouteId>) -> Point {
        if let Some(reroute) = from_reroute.and_then(|id| self.store.reroute_layout(id)) {
            return reroute.position;
        }
        if let Some(slot) = self.store.slot_layout(anchor) {
            return slot.position;
        }
        if let Some(node) = self.store.node_layout(anchor.node_id) {
            let y = node.bounds.center().y;
            return match anchor.kind {
                SlotKind::Output => Point::new(node.bounds.right(), y),
                SlotKind::Input => Point::new(node.bounds.x, y),
            };
        }
        warn!("no geometry for {:?}", anchor);
        Point::default()
    }

    // ========================================================================
    // Pointer tracking
    // ========================================================================

    /// Follow the pointer and snap to a valid slot under it
    pub fn move_pointer<N>(&mut self, network: &N, point: Point)
    where
        N: LinkNetwork + ?Sized,
    {
        let Some(connecting_to) = self.state.connecting_to else {
            return;
        };
        self.pointer = Some(point);
        self.state.snap_links_pos = self
            .store
            .query_slot_at_point(point)
            .filter(|slot| slot.key.kind == connecting_to)
            .filter(|slot| self.is_slot_valid_drop(network, slot.key))
            .map(|slot| slot.position);
    }

    // ========================================================================
    // Validity checks
    // ========================================================================

    /// Whether `render_link` may be connected to `target`
    pub fn check_connection<N>(&self, network: &N, render_link: &RenderLink, target: SlotKey) -> ValidationResult
    where
        N: LinkNetwork + ?Sized,
    {
        if target.kind != render_link.to_type() {
            return ValidationResult::Invalid(ValidationError::IncompatibleDirection);
        }
        let Some(target_slot) = network
            .node(target.node_id)
            .and_then(|node| node.slot_descriptor(target.kind, target.index))
        else {
            return ValidationResult::Invalid(ValidationError::SlotNotFound(target));
        };
        let same_node = if target.node_id == render_link.node_id {
            ValidationResult::Invalid(ValidationError::SameNode)
        } else {
            ValidationResult::Valid
        };
        let current = render_link.link.as_ref().map(|link| match render_link.kind {
            RenderLinkKind::MovingInput => link.target_key(),
            _ => link.origin_key(),
        });
        let unchanged = if current == Some(target) {
            ValidationResult::Invalid(ValidationError::AlreadyConnected)
        } else {
            ValidationResult::Valid
        };
        same_node.and(unchanged).and_then(|| match target.kind {
            SlotKind::Input => validate_link(&render_link.from_slot, target_slot, self.validator.as_ref()),
            SlotKind::Output => validate_link(target_slot, &render_link.from_slot, self.validator.as_ref()),
        })
    }

    /// Whether any render link may be dropped on `slot`
    pub fn is_slot_valid_drop<N>(&self, network: &N, slot: SlotKey) -> bool
    where
        N: LinkNetwork + ?Sized,
    {
        self.render_links
            .iter()
            .any(|render_link| self.check_connection(network, render_link, slot).is_valid())
    }

    pub fn is_input_valid_drop<N>(&self, network: &N, node_id: NodeId, slot: usize) -> bool
    where
        N: LinkNetwork + ?Sized,
    {
        self.is_slot_valid_drop(network, SlotKey::input(node_id, slot))
    }

    pub fn is_output_valid_drop<N>(&self, network: &N, node_id: NodeId, slot: usize) -> bool
    where
        N: LinkNetwork + ?Sized,
    {
        self.is_slot_valid_drop(network, SlotKey::output(node_id, slot))
    }

    /// Whether dropping on the node background would connect anything
    pub fn is_node_valid_drop<N>(&self, network: &N, node_id: NodeId) -> bool
    where
        N: LinkNetwork + ?Sized,
    {
        self.node_drop_slot(network, node_id).is_some()
    }

    /// Whether dropping on the reroute would connect anything
    pub fn is_reroute_valid_drop<N>(&self, network: &N, reroute_id: RerouteId) -> bool
    where
        N: LinkNetwork + ?Sized,
    {
        match self.state.connecting_to {
            Some(SlotKind::Input) => !self.reroute_input_pairs(network, reroute_id).is_empty(),
            Some(SlotKind::Output) => !self.reroute_output_pairs(network, reroute_id).is_empty(),
            None => false,
        }
    }

    /// First slot of the sought kind on `node_id` the first render link
    /// accepts. Loopback to the anchoring node is refused.
    fn node_drop_slot<N>(&self, network: &N, node_id: NodeId) -> Option<SlotKey>
    where
        N: LinkNetwork + ?Sized,
    {
        let kind = self.state.connecting_to?;
        let first = self.render_links.first()?;
        if first.node_id == node_id {
            return None;
        }
        let node = network.node(node_id)?;
        (0..node.slot_count(kind))
            .map(|index| SlotKey::new(node_id, kind, index))
            .find(|key| self.check_connection(network, first, *key).is_valid())
    }

    /// (render link index, target input, parent for the new link) for a
    /// drop onto a reroute while seeking inputs
    fn reroute_input_pairs<N>(&self, network: &N, reroute_id: RerouteId) -> Vec<(usize, SlotKey, Option<RerouteId>)>
    where
        N: LinkNetwork + ?Sized,
    {
        let Some(reroute) = network.reroute(reroute_id) else {
            return Vec::new();
        };
        let mut pairs = Vec::new();
        for through in reroute.link_ids().into_iter().filter_map(|id| network.link(id)) {
            let target = through.target_key();
            for (i, render_link) in self.render_links.iter().enumerate() {
                if render_link.to_type() != SlotKind::Input {
                    continue;
                }
                if !self.check_connection(network, render_link, target).is_valid() {
                    continue;
                }
                // Would make no change
                if render_link.from_reroute.is_some() && render_link.from_reroute == reroute.parent_id {
                    continue;
                }
                if render_link.from_reroute == Some(reroute_id) {
                    continue;
                }
                if render_link.kind == RenderLinkKind::ToInput
                    && reroute.parent_id.is_none()
                    && through.has_origin(render_link.node_id, render_link.from_slot_index)
                {
                    continue;
                }
                // Cannot connect from a reroute back to one of its parents
                let ancestors = network.reroute_ancestors(render_link.from_reroute).unwrap_or_default();
                if ancestors.contains(&reroute_id) {
                    continue;
                }
                let parent = match render_link.kind {
                    RenderLinkKind::MovingInput => render_link.from_reroute,
                    _ => through.parent_id,
                };
                pairs.push((i, target, parent));
            }
        }
        pairs
    }

    /// (render link index, source output) for a drop onto a reroute while
    /// seeking outputs
    fn reroute_output_pairs<N>(&self, network: &N, reroute_id: RerouteId) -> Vec<(usize, SlotKey)>
    where
        N: LinkNetwork + ?Sized,
    {
        let source = network
            .reroute(reroute_id)
            .and_then(|reroute| reroute.first_link())
            .and_then(|link_id| network.link(link_id))
            .map(|link| link.origin_key());
        let Some(source) = source else {
            return Vec::new();
        };
        self.render_links
            .iter()
            .enumerate()
            .filter(|(_, render_link)| render_link.to_type() == SlotKind::Output)
            .filter(|(_, render_link)| self.check_connection(network, render_link, source).is_valid())
            .map(|(i, _)| (i, source))
            .collect()
    }

    // ========================================================================
    // Dropping
    // ========================================================================

    /// Commit the gesture at `point`.
    ///
    /// Tries the slot under the point, then the node, then a reroute, and
    /// otherwise treats it as a drop on the canvas. `after-drop` always
    /// fires. The connector is not reset; call [`reset`](Self::reset) next.
    pub fn drop_links<N>(&mut self, network: &mut N, point: Point) -> Result<DropOutcome, ConnectorError>
    where
        N: LinkNetwork + ?Sized,
    {
        let Some(connecting_to) = self.state.connecting_to else {
            return Ok(DropOutcome::new(DropTarget::NotConnecting));
        };
        self.pointer = Some(point);

        let slot = self
            .store
            .query_slot_at_point(point)
            .map(|slot| slot.key)
            .filter(|key| key.kind == connecting_to);

        let outcome = if let Some(slot) = slot {
            let mut outcome = DropOutcome::new(DropTarget::Slot(slot));
            self.drop_on_slot(network, slot, &mut outcome);
            outcome
        } else if let Some(node_id) = self.store.query_node_at_point(point) {
            self.drop_on_node(network, node_id, point)
        } else {
            match self.store.query_reroute_at_point(point) {
                Some(reroute) if self.is_reroute_valid_drop(&*network, reroute.id) => {
                    self.drop_on_reroute(network, reroute.id, point)
                }
                _ => self.drop_on_nothing(network, point),
            }
        };

        self.events.dispatch(&ConnectorEvent::AfterDrop { point });
        debug!("drop at ({}, {}) landed on {:?}", point.x, point.y, outcome.target);
        Ok(outcome)
    }

    fn drop_on_slot<N>(&mut self, network: &mut N, target: SlotKey, outcome: &mut DropOutcome)
    where
        N: LinkNetwork + ?Sized,
    {
        let render_links = self.render_links.clone();
        let mut connected = 0;
        for render_link in &render_links {
            match self.check_connection(&*network, render_link, target) {
                ValidationResult::Valid => {
                    self.commit(network, render_link, target, render_link.from_reroute, outcome);
                    connected += 1;
                }
                ValidationResult::Invalid(reason) => {
                    debug!("render link from {:?} not dropped on {:?}: {}", render_link.from_slot_key(), target, reason)
                }
            }
        }
        if connected == 0 {
            warn!("drop on {:?} rejected for every link", target);
        }
    }

    fn drop_on_node<N>(&mut self, network: &mut N, node_id: NodeId, point: Point) -> DropOutcome
    where
        N: LinkNetwork + ?Sized,
    {
        let mut outcome = DropOutcome::new(DropTarget::Node(node_id));
        self.events.dispatch(&ConnectorEvent::DroppedOnNode { node_id, point });
        match self.node_drop_slot(&*network, node_id) {
            Some(slot) => self.drop_on_slot(network, slot, &mut outcome),
            None => {
                let link_type = self.render_links.first().map(|l| l.from_slot.slot_type.clone());
                warn!("could not find slot on node {} for link type {:?}", node_id, link_type)
            }
        }
        outcome
    }

    fn drop_on_reroute<N>(&mut self, network: &mut N, reroute_id: RerouteId, point: Point) -> DropOutcome
    where
        N: LinkNetwork + ?Sized,
    {
        let mut outcome = DropOutcome::new(DropTarget::Reroute(reroute_id));
        self.events.dispatch(&ConnectorEvent::DroppedOnReroute { reroute_id, point });

        let render_links = self.render_links.clone();
        match self.state.connecting_to {
            Some(SlotKind::Input) => {
                for (i, target, parent) in self.reroute_input_pairs(&*network, reroute_id) {
                    self.commit(network, &render_links[i], target, parent, &mut outcome);
                }
            }
            Some(SlotKind::Output) => {
                for (i, source) in self.reroute_output_pairs(&*network, reroute_id) {
                    self.commit(network, &render_links[i], source, Some(reroute_id), &mut outcome);
                }
            }
            None => {}
        }
        outcome
    }

    fn drop_on_nothing<N>(&mut self, network: &mut N, point: Point) -> DropOutcome
    where
        N: LinkNetwork + ?Sized,
    {
        let mut outcome = DropOutcome::new(DropTarget::Nothing);
        if self.state.connecting_to == Some(SlotKind::Input) {
            for link in &self.input_links {
                if network.disconnect_link(link.id) {
                    outcome.disconnected.push(link.id);
                }
            }
        }
        self.events.dispatch(&ConnectorEvent::DroppedOnCanvas { point });
        outcome
    }

    /// Connect one render link to `target`. Moved links are replaced by the
    /// new link.
    fn commit<N>(
        &mut self,
        network: &mut N,
        render_link: &RenderLink,
        target: SlotKey,
        parent_id: Option<RerouteId>,
        outcome: &mut DropOutcome,
    ) where
        N: LinkNetwork + ?Sized,
    {
        let anchor = render_link.from_slot_key();
        let (origin, input, parent_id) = match (render_link.kind, &render_link.link) {
            (RenderLinkKind::MovingInput, Some(link)) => (link.origin_key(), target, parent_id),
            // Keep the reroute chain of the moved link
            (RenderLinkKind::MovingOutput, Some(link)) => (
                target,
                link.target_key(),
                if parent_id == render_link.from_reroute { link.parent_id } else { parent_id },
            ),
            (RenderLinkKind::ToInput, _) => (anchor, target, parent_id),
            (RenderLinkKind::ToOutput, _) => (target, anchor, parent_id),
            (_, None) => {
                warn!("moving render link from {:?} lost its link", anchor);
                return;
            }
        };

        let Some(new_link) = network.connect_slots(origin, input, parent_id) else {
            warn!("network refused link {:?} -> {:?}", origin, input);
            return;
        };
        outcome.created.push(new_link.id);

        let event = match (render_link.kind, &render_link.link) {
            (RenderLinkKind::MovingInput, Some(old)) => {
                if network.disconnect_link(old.id) {
                    outcome.disconnected.push(old.id);
                }
                ConnectorEvent::InputMoved {
                    old_link: old.id,
                    new_link: new_link.id,
                }
            }
            (RenderLinkKind::MovingOutput, Some(old)) => {
                // Usually already replaced when the input was reused
                network.disconnect_link(old.id);
                outcome.disconnected.push(old.id);
                ConnectorEvent::OutputMoved {
                    old_link: old.id,
                    new_link: new_link.id,
                }
            }
            _ => ConnectorEvent::LinkCreated {
                link_id: new_link.id,
            },
        };
        self.events.dispatch(&event);
    }

    /// Disconnect every link being moved. Returns the ids actually removed.
    pub fn disconnect_links<N>(&mut self, network: &mut N) -> Vec<LinkId>
    where
        N: LinkNetwork + ?Sized,
    {
        self.input_links
            .iter()
            .chain(self.output_links.iter())
            .filter(|link| network.disconnect_link(link.id))
            .map(|link| link.id)
            .collect()
    }

    // ========================================================================
    // Reset / export / events
    // ========================================================================

    /// Return to idle, dropping everything the gesture touched.
    ///
    /// Fires `reset`, then removes gesture-scoped listeners and clears the
    /// dragging flags. Safe to call at any time.
    pub fn reset(&mut self) {
        self.events.dispatch(&ConnectorEvent::Reset);
        self.events.clear_gesture_scoped();

        for link in self.input_links.iter().chain(self.output_links.iter()) {
            link.set_dragging(false);
        }
        for reroute in &self.hidden_reroutes {
            reroute.set_dragging(false);
        }
        if self.is_connecting() {
            debug!("connector reset from {:?}", self.state.connecting_to);
        }
        self.render_links.clear();
        self.input_links.clear();
        self.output_links.clear();
        self.hidden_reroutes.clear();
        self.pointer = None;
        self.state = LinkConnectorState::default();
    }

    /// Snapshot for the renderer. Collections are cloned; the network is
    /// borrowed.
    pub fn export<'a, N>(&self, network: &'a N) -> LinkConnectorExport<'a, N>
    where
        N: LinkNetwork + ?Sized,
    {
        LinkConnectorExport {
            state: self.state,
            input_links: self.input_links.clone(),
            output_links: self.output_links.clone(),
            render_links: self.render_links.clone(),
            network,
            pointer: self.pointer,
        }
    }

    /// Listen for one gesture; removed at the next reset
    pub fn listen_until_reset<F>(&mut self, kind: ConnectorEventKind, handler: F) -> ListenerId
    where
        F: FnMut(&ConnectorEvent) + 'static,
    {
        self.events.add_until_reset(kind, handler)
    }

    pub fn add_listener<F>(&mut self, kind: ConnectorEventKind, handler: F) -> ListenerId
    where
        F: FnMut(&ConnectorEvent) + 'static,
    {
        self.events.add(kind, handler)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }
}
