//! Producer-side helpers for feeding renderer geometry into the store.
//!
//! A renderer reports node rectangles and slot positions as it lays things
//! out. [`GeometryTracker`] turns those reports into store writes tagged with
//! the renderer's [`LayoutSource`], and lets the same renderer skip the change
//! notifications its own writes cause.
//!
//! # Example
//!
//! ```
//! use node_editor_layout::{GeometryTracker, LayoutSource, LayoutStore, NodeId, Point, Size, SlotKind};
//!
//! let store = LayoutStore::new();
//! store.create_node(NodeId(1), Point::new(0.0, 0.0), Size::new(100.0, 50.0)).unwrap();
//!
//! let tracker = GeometryTracker::new(store.clone(), LayoutSource::CanvasRenderer);
//! let on_node_rect = tracker.node_rect_callback();
//! let on_slot_position = tracker.slot_position_callback();
//!
//! on_node_rect(1, 20.0, 10.0, 120.0, 60.0);
//! on_slot_position(1, SlotKind::Output, 0, 120.0, 30.0);
//!
//! assert_eq!(store.node_layout(NodeId(1)).unwrap().position, Point::new(20.0, 10.0));
//! assert_eq!(store.operations().last().unwrap().source, LayoutSource::CanvasRenderer);
//! ```

use crate::error::LayoutError;
use crate::geometry::{Bounds, Point};
use crate::layout::{NodeId, SlotKey, SlotKind, SlotLayout};
use crate::links::LinkLayoutSync;
use crate::operation::{LayoutChange, LayoutOperation, LayoutSource, NodeBoundsUpdate, OperationKind, OperationOutcome};
use crate::store::{LayoutStore, Subscription};
use log::{debug, warn};

/// Writes renderer geometry into a [`LayoutStore`] on behalf of one source.
#[derive(Debug, Clone)]
pub struct GeometryTracker {
    store: LayoutStore,
    source: LayoutSource,
    actor: String,
    sync: Option<LinkLayoutSync>,
}

impl GeometryTracker {
    pub fn new(store: LayoutStore, source: LayoutSource) -> Self {
        let actor = store.actor();
        Self {
            store,
            source,
            actor,
            sync: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Recompute link geometry after each slot report
    pub fn with_link_sync(mut self) -> Self {
        self.sync = Some(LinkLayoutSync::new(self.store.clone()));
        self
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn source(&self) -> LayoutSource {
        self.source
    }

    /// False for changes this tracker's source produced itself
    pub fn should_apply(&self, change: &LayoutChange) -> bool {
        change.source != self.source
    }

    /// Subscribe to store changes, skipping echoes of this source's writes
    pub fn on_external_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LayoutChange) + 'static,
    {
        let source = self.source;
        self.store.on_change(move |change| {
            if change.source != source {
                callback(change);
            }
        })
    }

    fn submit(&self, kind: OperationKind) -> Result<OperationOutcome, LayoutError> {
        let operation = LayoutOperation::new(kind, self.actor.clone(), self.source);
        self.store.apply_operation(operation)
    }

    /// Record a node rectangle. Unchanged rectangles and unknown nodes are
    /// ignored.
    pub fn report_node_rect(&self, node_id: NodeId, bounds: Bounds) -> Result<OperationOutcome, LayoutError> {
        self.report_node_rects(std::iter::once((node_id, bounds)))
    }

    /// Record many node rectangles as one batch
    pub fn report_node_rects<I>(&self, reports: I) -> Result<OperationOutcome, LayoutError>
    where
        I: IntoIterator<Item = (NodeId, Bounds)>,
    {
        let updates: Vec<NodeBoundsUpdate> = reports
            .into_iter()
            .filter_map(|(node_id, bounds)| {
                let current = self.store.node_layout(node_id)?;
                (current.bounds != bounds).then_some(NodeBoundsUpdate {
                    node_id,
                    bounds,
                    previous_bounds: current.bounds,
                })
            })
            .collect();
        if updates.is_empty() {
            return Ok(OperationOutcome::Ignored);
        }
        self.submit(OperationKind::BatchUpdateBounds { updates })
    }

    /// Record a slot position given relative to its node's top-left corner.
    /// Returns whether the slot layout changed.
    pub fn report_slot_position(&self, key: SlotKey, rel: Point) -> bool {
        let Some(node) = self.store.node_layout(key.node_id) else {
            debug!("slot report for unknown node {} dropped", key.node_id);
            return false;
        };
        let position = Point::new(node.position.x + rel.x, node.position.y + rel.y);
        let radius = self.store.config().slot_hit_radius;
        let changed = self.store.update_slot_layout(SlotLayout::new(key, position, radius));
        if changed {
            if let Some(sync) = &self.sync {
                if let Err(err) = sync.recompute_links_for_node(key.node_id) {
                    warn!("link sync after slot report failed: {}", err);
                }
            }
        }
        changed
    }

    /// Callback for node rectangle reports: `(node_id, x, y, width, height)`
    pub fn node_rect_callback(&self) -> impl Fn(i32, f32, f32, f32, f32) + Clone {
        let tracker = self.clone();
        move |id, x, y, width, height| {
            if let Err(err) = tracker.report_node_rect(NodeId(id), Bounds::new(x, y, width, height)) {
                warn!("node rect report for {} rejected: {}", id, err);
            }
        }
    }

    /// Callback for slot reports: `(node_id, kind, index, rel_x, rel_y)`
    pub fn slot_position_callback(&self) -> impl Fn(i32, SlotKind, usize, f32, f32) + Clone {
        let tracker = self.clone();
        move |node_id, kind, index, rel_x, rel_y| {
            tracker.report_slot_position(SlotKey::new(NodeId(node_id), kind, index), Point::new(rel_x, rel_y));
        }
    }
}
