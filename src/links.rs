//! Keeps link and segment geometry in step with slots and reroutes.
//!
//! [`LinkLayoutSync`] derives each link's path from its two slot layouts and
//! splits it into one segment per reroute plus a final segment into the
//! target slot. It writes through the store's derived-geometry cache, so
//! recomputing never bumps the version or notifies subscribers.
//!
//! # Example
//!
//! ```
//! use node_editor_layout::{
//!     LayoutStore, LinkLayout, LinkLayoutSync, LinkId, NodeId, Point, Size, SlotKey, SlotLayout,
//! };
//!
//! let store = LayoutStore::new();
//! store.create_node(NodeId(1), Point::new(0.0, 0.0), Size::new(100.0, 50.0)).unwrap();
//! store.create_node(NodeId(2), Point::new(300.0, 0.0), Size::new(100.0, 50.0)).unwrap();
//! store.update_slot_layout(SlotLayout::new(SlotKey::output(NodeId(1), 0), Point::new(100.0, 25.0), 10.0));
//! store.update_slot_layout(SlotLayout::new(SlotKey::input(NodeId(2), 0), Point::new(300.0, 25.0), 10.0));
//! store.create_link(LinkLayout::new(LinkId(1), NodeId(1), 0, NodeId(2), 0)).unwrap();
//!
//! let sync = LinkLayoutSync::new(store.clone());
//! let _subscription = sync.attach();
//! sync.recompute_all().unwrap();
//! assert!(store.link_layout(LinkId(1)).unwrap().path.is_some());
//!
//! // Moving a node re-derives the links that touch it
//! store.update_slot_layout(SlotLayout::new(SlotKey::output(NodeId(1), 0), Point::new(100.0, 125.0), 10.0));
//! store.move_node(NodeId(1), Point::new(0.0, 100.0)).unwrap();
//! assert_eq!(store.link_layout(LinkId(1)).unwrap().path.unwrap().start(), Point::new(100.0, 125.0));
//! ```

use crate::error::LayoutError;
use crate::geometry::Point;
use crate::layout::{EntityId, LinkId, LinkSegmentLayout, NodeId, RerouteId};
use crate::operation::{ChangeType, LayoutChange};
use crate::path::LinkPath;
use crate::store::{LayoutStore, Subscription};
use log::{debug, warn};
use std::collections::BTreeSet;

/// Recomputes link paths and segment chains from slot and reroute geometry.
#[derive(Debug, Clone)]
pub struct LinkLayoutSync {
    store: LayoutStore,
}

impl LinkLayoutSync {
    pub fn new(store: LayoutStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    /// Re-derive one link. Returns whether its path or segments changed.
    ///
    /// A link whose slots have no layout yet is left alone.
    pub fn recompute_link(&self, link_id: LinkId) -> Result<bool, LayoutError> {
        let Some(link) = self.store.link_layout(link_id) else {
            debug!("link {} not in layout store, nothing to recompute", link_id);
            return Ok(false);
        };
        let (Some(source), Some(target)) = (
            self.store.slot_layout(link.source_key()),
            self.store.slot_layout(link.target_key()),
        ) else {
            warn!("link {} has no slot geometry yet", link_id);
            return Ok(false);
        };

        let config = self.store.config();
        let path = LinkPath::between_slots(
            source.position,
            target.position,
            config.zoom,
            config.bezier_min_offset,
        );
        let mut changed = self.store.update_link_geometry(link_id, path);

        let reroutes: Vec<(RerouteId, Point)> = self
            .store
            .reroute_chain(link_id)?
            .into_iter()
            .filter_map(|id| self.store.reroute_layout(id).map(|r| (id, r.position)))
            .collect();

        let segments = if reroutes.is_empty() {
            vec![LinkSegmentLayout::from_path(link_id, None, path)]
        } else {
            let mut segments = Vec::with_capacity(reroutes.len() + 1);
            let mut from = source.position;
            for (reroute_id, position) in &reroutes {
                let path = LinkPath::through_reroute(from, *position, config.max_spline_offset);
                segments.push(LinkSegmentLayout::from_path(link_id, Some(*reroute_id), path));
                from = *position;
            }
            let tail = LinkPath::through_reroute(from, target.position, config.max_spline_offset);
            segments.push(LinkSegmentLayout::from_path(link_id, None, tail));
            segments
        };
        changed |= self.store.set_link_segments(link_id, segments)?;
        Ok(changed)
    }

    /// Re-derive every link with an end on `node_id`. Returns how many changed.
    pub fn recompute_links_for_node(&self, node_id: NodeId) -> Result<usize, LayoutError> {
        self.recompute_many(self.store.links_for_node(node_id))
    }

    /// Re-derive every link passing through `reroute_id`
    pub fn recompute_links_for_reroute(&self, reroute_id: RerouteId) -> Result<usize, LayoutError> {
        self.recompute_many(self.links_through(reroute_id)?)
    }

    pub fn recompute_all(&self) -> Result<usize, LayoutError> {
        let ids: Vec<LinkId> = self.store.all_links().iter().map(|link| link.id).collect();
        self.recompute_many(ids)
    }

    fn recompute_many(&self, ids: impl IntoIterator<Item = LinkId>) -> Result<usize, LayoutError> {
        let mut changed = 0;
        for link_id in ids {
            if self.recompute_link(link_id)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Recompute affected links whenever the store reports a change.
    ///
    /// The subscriber holds the store weakly; drop the store and it stops.
    pub fn attach(&self) -> Subscription {
        let weak = self.store.downgrade();
        self.store.on_change(move |change| {
            if let Some(store) = weak.upgrade() {
                LinkLayoutSync::new(store).apply_change(change);
            }
        })
    }

    fn apply_change(&self, change: &LayoutChange) {
        let mut links = BTreeSet::new();
        let mut result = Ok(());
        for id in &change.affected_ids {
            let found = match id {
                EntityId::Node(node_id) => Ok(self.store.links_for_node(*node_id)),
                EntityId::Reroute(reroute_id) => self.links_through(*reroute_id),
                EntityId::Link(link_id) if change.change_type != ChangeType::Delete => Ok(vec![*link_id]),
                EntityId::Link(_) => Ok(Vec::new()),
            };
            match found {
                Ok(ids) => links.extend(ids),
                Err(err) => result = Err(err),
            }
        }
        if let Err(err) = result.and_then(|_| self.recompute_many(links)) {
            warn!("link geometry sync failed: {}", err);
        }
    }

    fn links_through(&self, reroute_id: RerouteId) -> Result<Vec<LinkId>, LayoutError> {
        let mut through = Vec::new();
        for link in self.store.all_links() {
            if self.store.reroute_chain(link.id)?.contains(&reroute_id) {
                through.push(link.id);
            }
        }
        Ok(through)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::layout::{LinkLayout, SegmentKey, SlotKey, SlotLayout};

    fn store() -> LayoutStore {
        let store = LayoutStore::new();
        store
            .create_node(NodeId(1), Point::new(0.0, 0.0), Size::new(100.0, 50.0))
            .unwrap();
        store
            .create_node(NodeId(2), Point::new(400.0, 0.0), Size::new(100.0, 50.0))
            .unwrap();
        store.batch_update_slot_layouts(vec![
            SlotLayout::new(SlotKey::output(NodeId(1), 0), Point::new(100.0, 25.0), 10.0),
            SlotLayout::new(SlotKey::input(NodeId(2), 0), Point::new(400.0, 25.0), 10.0),
        ]);
        store
    }

    // ========================================================================
    // Paths and segments
    // ========================================================================

    #[test]
    fn test_link_without_reroutes_has_single_segment() {
        let store = store();
        store
            .create_link(LinkLayout::new(LinkId(1), NodeId(1), 0, NodeId(2), 0))
            .unwrap();
        let sync = LinkLayoutSync::new(store.clone());

        assert!(sync.recompute_link(LinkId(1)).unwrap());
        let segments = store.link_segments(LinkId(1));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].reroute_id, None);
        assert_eq!(Some(segments[0].path), store.link_layout(LinkId(1)).unwrap().path);

        // Nothing moved
        assert!(!sync.recompute_link(LinkId(1)).unwrap());
    }

    #[test]
    fn test_segment_per_reroute_plus_final() {
        let store = store();
        store
            .create_reroute(RerouteId(1), Point::new(200.0, 100.0), None, vec![LinkId(1)])
            .unwrap();
        store
            .create_reroute(RerouteId(2), Point::new(300.0, 100.0), Some(RerouteId(1)), vec![LinkId(1)])
            .unwrap();
        store
            .create_link(LinkLayout::new(LinkId(1), NodeId(1), 0, NodeId(2), 0).with_parent(Some(RerouteId(2))))
            .unwrap();
        let sync = LinkLayoutSync::new(store.clone());
        sync.recompute_all().unwrap();

        let keys: Vec<Option<RerouteId>> = store
            .link_segments(LinkId(1))
            .iter()
            .map(|s| s.reroute_id)
            .collect();
        assert_eq!(keys, vec![Some(RerouteId(1)), Some(RerouteId(2)), None]);

        let first = store
            .link_segment(SegmentKey {
                link_id: LinkId(1),
                reroute_id: Some(RerouteId(1)),
            })
            .unwrap();
        assert_eq!(first.path.start(), Point::new(100.0, 25.0));
        assert_eq!(first.path.end(), Point::new(200.0, 100.0));
    }

    #[test]
    fn test_missing_slot_geometry_skips_link() {
        let store = store();
        store
            .create_link(LinkLayout::new(LinkId(1), NodeId(1), 3, NodeId(2), 0))
            .unwrap();
        let sync = LinkLayoutSync::new(store.clone());

        assert!(!sync.recompute_link(LinkId(1)).unwrap());
        assert!(store.link_layout(LinkId(1)).unwrap().path.is_none());
    }

    // ========================================================================
    // Subscription
    // ========================================================================

    #[test]
    fn test_attached_sync_follows_reroute_moves() {
        let store = store();
        store
            .create_reroute(RerouteId(1), Point::new(200.0, 100.0), None, vec![LinkId(1)])
            .unwrap();
        let sync = LinkLayoutSync::new(store.clone());
        let subscription = sync.attach();

        // Link creation is itself a change the sync reacts to
        store
            .create_link(LinkLayout::new(LinkId(1), NodeId(1), 0, NodeId(2), 0).with_parent(Some(RerouteId(1))))
            .unwrap();
        assert_eq!(store.link_segments(LinkId(1)).len(), 2);

        store.move_reroute(RerouteId(1), Point::new(250.0, 300.0)).unwrap();
        let segment = store.link_segments(LinkId(1))[0];
        assert_eq!(segment.path.end(), Point::new(250.0, 300.0));

        subscription.unsubscribe();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_sync_does_not_bump_version() {
        let store = store();
        store
            .create_link(LinkLayout::new(LinkId(1), NodeId(1), 0, NodeId(2), 0))
            .unwrap();
        let version = store.version();
        LinkLayoutSync::new(store.clone()).recompute_all().unwrap();
        assert_eq!(store.version(), version);
    }
}
