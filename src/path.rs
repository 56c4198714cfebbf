//! Link path descriptors and the distance math used to hit-test them.
//!
//! A [`LinkPath`] is what the store keeps for every link and link segment: a
//! renderer can turn it into SVG path commands with [`LinkPath::to_svg`], and
//! the query engine measures pointer distance against it with
//! [`LinkPath::distance_to`].

use crate::geometry::{distance_to_line_segment_sq, Bounds, Point};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Endpoints closer than this (scaled by zoom) are drawn as a straight line to
/// avoid zig-zag control points.
const STRAIGHT_LINE_THRESHOLD: f32 = 10.0;

/// Fallback when a caller asks for zero samples
const DEFAULT_HIT_SAMPLES: usize = 20;

/// Generate SVG path commands for a bezier link between two points
///
/// Creates a horizontal-biased cubic bezier curve suitable for slot to slot
/// connections. Control points extend horizontally from start and end points.
///
/// # Arguments
/// * `start`, `end` - Slot centres
/// * `zoom` - Current zoom level (affects control point offset)
/// * `min_offset` - Minimum control point offset (default: 50.0)
///
/// # Returns
/// SVG path command string (e.g., "M 10 20 C 60 20 90 80 140 80")
pub fn generate_bezier_path(start: Point, end: Point, zoom: f32, min_offset: f32) -> String {
    LinkPath::between_slots(start, end, zoom, min_offset).to_svg()
}

/// Cubic bezier curve for distance calculations
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CubicBezier {
    pub p0: Point, // Start point
    pub p1: Point, // Control point 1
    pub p2: Point, // Control point 2
    pub p3: Point, // End point
}

impl CubicBezier {
    /// Horizontal-biased bezier, the shape used between an output and an input slot
    pub fn from_endpoints(start: Point, end: Point, zoom: f32, min_offset: f32) -> Self {
        let dx_abs = (end.x - start.x).abs();
        let offset = (dx_abs * 0.5).max(min_offset * zoom);

        CubicBezier {
            p0: start,
            p1: Point::new(start.x + offset, start.y),
            p2: Point::new(end.x - offset, end.y),
            p3: end,
        }
    }

    /// Bezier that leaves or enters a reroute along the chord.
    ///
    /// Control points sit a quarter of the chord length along it, capped at
    /// `max_offset`.
    pub fn along_chord(start: Point, end: Point, max_offset: f32) -> Self {
        let length = start.distance(end);
        if length < f32::EPSILON {
            return CubicBezier {
                p0: start,
                p1: start,
                p2: end,
                p3: end,
            };
        }
        let offset = (length * 0.25).min(max_offset);
        let (ux, uy) = ((end.x - start.x) / length, (end.y - start.y) / length);

        CubicBezier {
            p0: start,
            p1: Point::new(start.x + ux * offset, start.y + uy * offset),
            p2: Point::new(end.x - ux * offset, end.y - uy * offset),
            p3: end,
        }
    }

    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.x + 3.0 * mt2 * t * self.p1.x + 3.0 * mt * t2 * self.p2.x + t3 * self.p3.x;
        let y = mt3 * self.p0.y + 3.0 * mt2 * t * self.p1.y + 3.0 * mt * t2 * self.p2.y + t3 * self.p3.y;

        Point::new(x, y)
    }

    /// Bounding box of the control polygon. The curve lies inside its convex
    /// hull, so this always contains the whole curve.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points([self.p0, self.p1, self.p2, self.p3]).unwrap_or_default()
    }
}

/// Minimum distance from a point to a cubic bezier curve
///
/// Uses subdivision: the curve is flattened into `num_samples` line segments
/// and the closest one wins.
pub fn distance_to_bezier(point: Point, bezier: &CubicBezier, num_samples: usize) -> f32 {
    let num_samples = if num_samples == 0 {
        DEFAULT_HIT_SAMPLES
    } else {
        num_samples
    };

    let mut min_dist_sq = f32::MAX;
    let mut prev_point = bezier.eval(0.0);

    for i in 1..=num_samples {
        let t = i as f32 / num_samples as f32;
        let curr_point = bezier.eval(t);

        let dist_sq = distance_to_line_segment_sq(point, prev_point, curr_point);
        if dist_sq < min_dist_sq {
            min_dist_sq = dist_sq;
        }

        prev_point = curr_point;
    }

    min_dist_sq.sqrt()
}

/// Renderable path of a link or link segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinkPath {
    Straight { start: Point, end: Point },
    Bezier(CubicBezier),
}

impl LinkPath {
    /// Path between two slots, matching the editor's default spline rendering.
    /// Very short links degrade to a straight line.
    pub fn between_slots(start: Point, end: Point, zoom: f32, min_offset: f32) -> Self {
        let threshold = STRAIGHT_LINE_THRESHOLD * zoom;
        if start.distance_sq(end) < threshold * threshold {
            return LinkPath::Straight { start, end };
        }
        LinkPath::Bezier(CubicBezier::from_endpoints(start, end, zoom, min_offset))
    }

    /// Path for a segment that starts or ends at a reroute
    pub fn through_reroute(start: Point, end: Point, max_offset: f32) -> Self {
        if start.distance_sq(end) < STRAIGHT_LINE_THRESHOLD * STRAIGHT_LINE_THRESHOLD {
            return LinkPath::Straight { start, end };
        }
        LinkPath::Bezier(CubicBezier::along_chord(start, end, max_offset))
    }

    pub fn start(&self) -> Point {
        match self {
            LinkPath::Straight { start, .. } => *start,
            LinkPath::Bezier(b) => b.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            LinkPath::Straight { end, .. } => *end,
            LinkPath::Bezier(b) => b.p3,
        }
    }

    /// Point half way along the curve parameter, used for link centre markers
    pub fn center(&self) -> Point {
        match self {
            LinkPath::Straight { start, end } => start.lerp(*end, 0.5),
            LinkPath::Bezier(b) => b.eval(0.5),
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            LinkPath::Straight { start, end } => {
                Bounds::from_points([*start, *end]).unwrap_or_default()
            }
            LinkPath::Bezier(b) => b.bounds(),
        }
    }

    /// Distance from `point` to the stroke centre line
    pub fn distance_to(&self, point: Point, hit_samples: usize) -> f32 {
        match self {
            LinkPath::Straight { start, end } => {
                distance_to_line_segment_sq(point, *start, *end).sqrt()
            }
            LinkPath::Bezier(b) => distance_to_bezier(point, b, hit_samples),
        }
    }

    /// SVG path commands
    pub fn to_svg(&self) -> String {
        match self {
            LinkPath::Straight { start, end } => {
                format!("M {} {} L {} {}", start.x, start.y, end.x, end.y)
            }
            LinkPath::Bezier(b) => format!(
                "M {} {} C {} {} {} {} {} {}",
                b.p0.x, b.p0.y, b.p1.x, b.p1.y, b.p2.x, b.p2.y, b.p3.x, b.p3.y
            ),
        }
    }
}
