//! Level 6: Scalability Tests
//!
//! These tests verify that the store and its queries handle large scenes
//! (1K-10K nodes, slots and links) without quadratic behaviour. Thresholds
//! are generous (2-5x expected) so CI noise does not fail them.
//!
//! **IMPORTANT:** Run with `cargo test level6 --release` for realistic numbers.
//! Debug builds are 10-50x slower, so timing assertions only warn there.

mod common;

use common::init_logging;
use node_editor_layout::{
    Bounds, Graph, GraphNode, LayoutStore, LinkConnector, LinkId, LinkLayout, LinkLayoutSync,
    LinkNetwork, NodeId, Point, Size, SlotKey, SlotLayout,
};
use std::time::{Duration, Instant};

// ============================================================================
// Debug Mode Detection
// ============================================================================

const fn is_debug_mode() -> bool {
    cfg!(debug_assertions)
}

/// Assert that elapsed time is within threshold. Debug builds only warn.
macro_rules! assert_timing {
    ($elapsed:expr, $threshold:expr, $($msg:tt)+) => {
        if is_debug_mode() {
            if $elapsed > $threshold {
                eprintln!(
                    "SKIPPED (debug mode): {} took {:?}, threshold {:?}. Run with --release for accurate timing.",
                    format!($($msg)+),
                    $elapsed,
                    $threshold
                );
            }
        } else {
            assert!(
                $elapsed <= $threshold,
                "{} took {:?}, expected <= {:?}",
                format!($($msg)+),
                $elapsed,
                $threshold
            );
        }
    };
}

// ============================================================================
// Constants
// ============================================================================

/// Small scale: 1,000 items
const SCALE_SMALL: usize = 1_000;

/// Medium scale: 5,000 items
const SCALE_MEDIUM: usize = 5_000;

/// Large scale: 10,000 items
const SCALE_LARGE: usize = 10_000;

const SPACING: f32 = 150.0;

// ============================================================================
// Timing Thresholds (generous to avoid CI flakiness)
// ============================================================================

mod thresholds {
    use super::*;

    pub const INITIALIZE_1K: Duration = Duration::from_millis(50);
    pub const INITIALIZE_10K: Duration = Duration::from_millis(200);

    /// Single slot hit test
    pub const SLOT_HIT_SINGLE: Duration = Duration::from_millis(5);

    /// 100 slot hit tests (simulated pointer tracking)
    pub const SLOT_HIT_100_QUERIES: Duration = Duration::from_millis(50);

    pub const LINK_HIT_SINGLE: Duration = Duration::from_millis(10);
    pub const LINK_HIT_100_QUERIES: Duration = Duration::from_millis(200);

    /// Deriving every path and segment chain for 1K links
    pub const LINK_SYNC_1K: Duration = Duration::from_millis(100);

    pub const BOX_SELECT_SMALL: Duration = Duration::from_millis(10);
    pub const BOX_SELECT_FULL_10K: Duration = Duration::from_millis(100);

    /// 1K node moves, each re-deriving the links that touch the node
    pub const DRAG_1K_MOVES: Duration = Duration::from_millis(300);

    /// Moving 1K fanned-out links onto a new output in one drop
    pub const FAN_OUT_DROP_1K: Duration = Duration::from_millis(500);
}

// ============================================================================
// Data Generators
// ============================================================================

fn grid_position(i: usize, count: usize) -> Point {
    let cols = (count as f32).sqrt().ceil() as usize;
    Point::new((i % cols) as f32 * SPACING, (i / cols) as f32 * SPACING)
}

fn is_row_end(i: usize, count: usize) -> bool {
    let cols = (count as f32).sqrt().ceil() as usize;
    i % cols == cols - 1 || i + 1 == count
}

/// Grid of 100x80 nodes, each with an input slot on its left edge and an
/// output slot on its right edge.
fn populate_store(count: usize) -> LayoutStore {
    init_logging();
    let store = LayoutStore::new();
    store.initialize_nodes(
        (0..count).map(|i| (NodeId(i as i32 + 1), grid_position(i, count), Size::new(100.0, 80.0))),
    );
    let radius = store.config().slot_hit_radius;
    store.batch_update_slot_layouts((0..count).flat_map(|i| {
        let p = grid_position(i, count);
        let id = NodeId(i as i32 + 1);
        [
            SlotLayout::new(SlotKey::input(id, 0), Point::new(p.x, p.y + 40.0), radius),
            SlotLayout::new(SlotKey::output(id, 0), Point::new(p.x + 100.0, p.y + 40.0), radius),
        ]
    }));
    store
}

/// Chain every node to its right-hand neighbour. Link `i + 1` leaves node
/// `i + 1`; row ends have no link.
fn populate_chain(count: usize) -> LayoutStore {
    let store = populate_store(count);
    for i in (0..count).filter(|i| !is_row_end(*i, count)) {
        let id = i as i32 + 1;
        store
            .create_link(LinkLayout::new(LinkId(id), NodeId(id), 0, NodeId(id + 1), 0))
            .unwrap();
    }
    LinkLayoutSync::new(store.clone()).recompute_all().unwrap();
    store
}

/// Midpoint of the horizontal link leaving node index `i`
fn link_midpoint(i: usize, count: usize) -> Point {
    let p = grid_position(i, count);
    Point::new(p.x + 125.0, p.y + 40.0)
}

// ============================================================================
// Population Tests
// ============================================================================

#[test]
fn test_initialize_1k_nodes() {
    init_logging();
    let store = LayoutStore::new();
    let start = Instant::now();
    store.initialize_nodes(
        (0..SCALE_SMALL).map(|i| (NodeId(i as i32 + 1), grid_position(i, SCALE_SMALL), Size::new(100.0, 80.0))),
    );
    let elapsed = start.elapsed();

    assert_eq!(store.node_count(), SCALE_SMALL);
    assert_timing!(elapsed, thresholds::INITIALIZE_1K, "Initialize (1K)");
}

#[test]
fn test_initialize_10k_nodes() {
    init_logging();
    let store = LayoutStore::new();
    let start = Instant::now();
    store.initialize_nodes(
        (0..SCALE_LARGE).map(|i| (NodeId(i as i32 + 1), grid_position(i, SCALE_LARGE), Size::new(100.0, 80.0))),
    );
    let elapsed = start.elapsed();

    assert_eq!(store.node_count(), SCALE_LARGE);
    assert_eq!(store.version(), 1);
    assert_timing!(elapsed, thresholds::INITIALIZE_10K, "Initialize (10K)");
}

// ============================================================================
// Slot Hit Testing Tests
// ============================================================================

#[test]
fn test_slot_hit_10k_nodes_single_query() {
    let store = populate_store(SCALE_LARGE);
    let target = SCALE_LARGE - 100;
    let p = grid_position(target, SCALE_LARGE);

    let start = Instant::now();
    let hit = store.query_slot_at_point(Point::new(p.x + 102.0, p.y + 41.0));
    let elapsed = start.elapsed();

    assert_eq!(hit.unwrap().key, SlotKey::output(NodeId(target as i32 + 1), 0));
    assert_timing!(elapsed, thresholds::SLOT_HIT_SINGLE, "Slot hit test (10K)");
}

#[test]
fn test_slot_hit_10k_nodes_miss() {
    let store = populate_store(SCALE_LARGE);

    let start = Instant::now();
    let hit = store.query_slot_at_point(Point::new(-1000.0, -1000.0));
    let elapsed = start.elapsed();

    assert!(hit.is_none());
    assert_timing!(elapsed, thresholds::SLOT_HIT_SINGLE, "Slot hit test (miss)");
}

#[test]
fn test_slot_hit_simulated_pointer_tracking() {
    let store = populate_store(SCALE_LARGE);

    let start = Instant::now();
    for i in 0..100 {
        let x = (i as f32 * 50.0) % 15000.0;
        let y = (i as f32 * 30.0) % 15000.0;
        let _ = store.query_slot_at_point(Point::new(x, y));
    }
    let elapsed = start.elapsed();

    assert_timing!(elapsed, thresholds::SLOT_HIT_100_QUERIES, "100 slot queries");
}

// ============================================================================
// Link Hit Testing Tests
// ============================================================================

#[test]
fn test_link_hit_1k_links_single_query() {
    let store = populate_chain(SCALE_SMALL);
    let target = SCALE_SMALL / 2;
    let point = link_midpoint(target, SCALE_SMALL);

    let start = Instant::now();
    let hit = store.query_link_at_point(point, 15.0);
    let elapsed = start.elapsed();

    assert_eq!(hit, Some(LinkId(target as i32 + 1)));
    assert_timing!(elapsed, thresholds::LINK_HIT_SINGLE, "Link hit test (1K)");
}

#[test]
fn test_link_hit_5k_links_single_query() {
    let store = populate_chain(SCALE_MEDIUM);
    let target = SCALE_MEDIUM / 2;
    let point = link_midpoint(target, SCALE_MEDIUM);

    let start = Instant::now();
    let hit = store.query_link_at_point(point, 15.0);
    let elapsed = start.elapsed();

    assert_eq!(hit, Some(LinkId(target as i32 + 1)));
    assert_timing!(elapsed, thresholds::LINK_HIT_SINGLE, "Link hit test (5K)");
}

#[test]
fn test_link_hit_simulated_pointer_tracking() {
    let store = populate_chain(SCALE_MEDIUM);

    let start = Instant::now();
    for i in 0..100 {
        let x = (i as f32 * 70.0) % 10000.0;
        let y = (i as f32 * 45.0) % 10000.0;
        let _ = store.query_link_at_point_default(Point::new(x, y));
    }
    let elapsed = start.elapsed();

    assert_timing!(elapsed, thresholds::LINK_HIT_100_QUERIES, "100 link queries");
}

#[test]
fn test_link_sync_1k_links() {
    let store = populate_store(SCALE_SMALL);
    for i in (0..SCALE_SMALL).filter(|i| !is_row_end(*i, SCALE_SMALL)) {
        let id = i as i32 + 1;
        store
            .create_link(LinkLayout::new(LinkId(id), NodeId(id), 0, NodeId(id + 1), 0))
            .unwrap();
    }
    let links = store.all_links().len();

    let start = Instant::now();
    let changed = LinkLayoutSync::new(store.clone()).recompute_all().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(changed, links);
    assert!(store.all_links().iter().all(|link| link.path.is_some()));
    assert_timing!(elapsed, thresholds::LINK_SYNC_1K, "Link sync (1K)");
}

// ============================================================================
// Box Selection Tests
// ============================================================================

#[test]
fn test_box_selection_10k_nodes_small_box() {
    let store = populate_chain(SCALE_LARGE);

    let start = Instant::now();
    let items = store.query_items_in_bounds(Bounds::new(-10.0, -10.0, 2.0 * SPACING, SPACING));
    let elapsed = start.elapsed();

    assert_eq!(items.nodes, vec![NodeId(1), NodeId(2)]);
    assert_eq!(items.links, vec![LinkId(1), LinkId(2)]);
    assert_timing!(elapsed, thresholds::BOX_SELECT_SMALL, "Box selection (small)");
}

#[test]
fn test_box_selection_10k_nodes_full_canvas() {
    let store = populate_store(SCALE_LARGE);

    let start = Instant::now();
    let nodes = store.query_nodes_in_bounds(Bounds::new(-100.0, -100.0, 20000.0, 20000.0));
    let elapsed = start.elapsed();

    assert_eq!(nodes.len(), SCALE_LARGE);
    assert_timing!(elapsed, thresholds::BOX_SELECT_FULL_10K, "Box selection (full canvas)");
}

#[test]
fn test_box_selection_10k_nodes_empty_area() {
    let store = populate_store(SCALE_LARGE);

    let start = Instant::now();
    let items = store.query_items_in_bounds(Bounds::new(-5000.0, -5000.0, 1000.0, 1000.0));
    let elapsed = start.elapsed();

    assert!(items.is_empty());
    assert_timing!(elapsed, thresholds::BOX_SELECT_SMALL, "Box selection (empty)");
}

// ============================================================================
// Editing Tests
// ============================================================================

#[test]
fn test_dragging_nodes_with_attached_sync() {
    let store = populate_chain(SCALE_SMALL);
    let sync = LinkLayoutSync::new(store.clone());
    let _subscription = sync.attach();

    let start = Instant::now();
    for i in 0..SCALE_SMALL {
        let id = NodeId(i as i32 + 1);
        let p = grid_position(i, SCALE_SMALL);
        store.move_node(id, Point::new(p.x + 5.0, p.y + 5.0)).unwrap();
    }
    let elapsed = start.elapsed();

    assert_eq!(store.operations().len(), SCALE_SMALL + store.all_links().len());
    assert_timing!(elapsed, thresholds::DRAG_1K_MOVES, "1K node moves with link sync");
}

#[test]
fn test_moving_1k_fanned_out_links() {
    init_logging();
    let store = LayoutStore::new();
    let mut graph = Graph::new(store.clone());
    let size = Size::new(100.0, 60.0);
    graph
        .add_node(GraphNode::new(NodeId(1)).with_output("out", "INT"), Point::new(0.0, 0.0), size)
        .unwrap();
    graph
        .add_node(GraphNode::new(NodeId(2)).with_output("out", "INT"), Point::new(0.0, 200.0), size)
        .unwrap();
    for i in 0..SCALE_SMALL {
        let id = NodeId(i as i32 + 10);
        let p = grid_position(i, SCALE_SMALL);
        graph
            .add_node(GraphNode::new(id).with_input("in", "INT"), Point::new(p.x + 1000.0, p.y), size)
            .unwrap();
        graph
            .connect_slots(SlotKey::output(NodeId(1), 0), SlotKey::input(id, 0), None)
            .unwrap();
    }
    store.update_slot_layout(SlotLayout::new(SlotKey::output(NodeId(2), 0), Point::new(-500.0, -500.0), 10.0));

    let mut connector = LinkConnector::new(store.clone());
    connector.move_output_link(&graph, NodeId(1), 0).unwrap();
    assert_eq!(connector.render_links().len(), SCALE_SMALL);

    let start = Instant::now();
    let outcome = connector.drop_links(&mut graph, Point::new(-500.0, -500.0)).unwrap();
    let elapsed = start.elapsed();
    connector.reset();

    assert_eq!(outcome.created.len(), SCALE_SMALL);
    assert!(graph.output_links(SlotKey::output(NodeId(1), 0)).is_empty());
    assert_eq!(graph.output_links(SlotKey::output(NodeId(2), 0)).len(), SCALE_SMALL);
    assert_eq!(store.all_links().len(), SCALE_SMALL);
    assert_timing!(elapsed, thresholds::FAN_OUT_DROP_1K, "Moving 1K links in one drop");
}
