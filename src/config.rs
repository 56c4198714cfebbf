//! Tunable distances and rendering parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration shared by the store, the query engine, link geometry sync
/// and the connector.
///
/// All distances are canvas units.
///
/// # Example
///
/// ```
/// use node_editor_layout::LayoutConfig;
///
/// let config = LayoutConfig::default()
///     .with_slot_hit_radius(14.0)
///     .with_zoom(2.0);
/// assert_eq!(config.slot_hit_radius, 14.0);
/// assert_eq!(config.reroute_radius, 8.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    /// Side length of one spatial index cell
    pub spatial_cell_size: f32,
    /// Maximum distance from a slot centre that still counts as a hit
    pub slot_hit_radius: f32,
    /// Radius given to reroutes created without an explicit one
    pub reroute_radius: f32,
    /// Half size of the box used to gather reroute candidates
    pub reroute_search_radius: f32,
    /// Default tolerance for link hit tests
    pub link_hit_tolerance: f32,
    /// Lower bound for the half size of the link candidate search box
    pub min_link_search_half_size: f32,
    /// Minimum horizontal control point offset of slot to slot beziers
    pub bezier_min_offset: f32,
    pub zoom: f32,
    /// Line segments used to flatten a bezier for distance tests
    pub hit_samples: usize,
    /// Cap on the control point offset of segments touching a reroute
    pub max_spline_offset: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spatial_cell_size: 256.0,
            slot_hit_radius: 10.0,
            reroute_radius: 8.0,
            reroute_search_radius: 20.0,
            link_hit_tolerance: 10.0,
            min_link_search_half_size: 10.0,
            bezier_min_offset: 50.0,
            zoom: 1.0,
            hit_samples: 20,
            max_spline_offset: 80.0,
        }
    }
}

impl LayoutConfig {
    pub fn with_spatial_cell_size(mut self, size: f32) -> Self {
        self.spatial_cell_size = size;
        self
    }

    pub fn with_slot_hit_radius(mut self, radius: f32) -> Self {
        self.slot_hit_radius = radius;
        self
    }

    pub fn with_reroute_radius(mut self, radius: f32) -> Self {
        self.reroute_radius = radius;
        self
    }

    pub fn with_reroute_search_radius(mut self, radius: f32) -> Self {
        self.reroute_search_radius = radius;
        self
    }

    pub fn with_link_hit_tolerance(mut self, tolerance: f32) -> Self {
        self.link_hit_tolerance = tolerance;
        self
    }

    pub fn with_min_link_search_half_size(mut self, half_size: f32) -> Self {
        self.min_link_search_half_size = half_size;
        self
    }

    pub fn with_bezier_min_offset(mut self, offset: f32) -> Self {
        self.bezier_min_offset = offset;
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_hit_samples(mut self, samples: usize) -> Self {
        self.hit_samples = samples;
        self
    }

    pub fn with_max_spline_offset(mut self, offset: f32) -> Self {
        self.max_spline_offset = offset;
        self
    }

    /// Cell size actually used by the spatial indices. Non-positive or
    /// non-finite values fall back to the default.
    pub(crate) fn effective_cell_size(&self) -> f32 {
        if self.spatial_cell_size.is_finite() && self.spatial_cell_size > 0.0 {
            self.spatial_cell_size
        } else {
            LayoutConfig::default().spatial_cell_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.spatial_cell_size, 256.0);
        assert_eq!(config.slot_hit_radius, 10.0);
        assert_eq!(config.reroute_radius, 8.0);
        assert_eq!(config.reroute_search_radius, 20.0);
        assert_eq!(config.link_hit_tolerance, 10.0);
        assert_eq!(config.min_link_search_half_size, 10.0);
        assert_eq!(config.bezier_min_offset, 50.0);
        assert_eq!(config.zoom, 1.0);
        assert_eq!(config.hit_samples, 20);
        assert_eq!(config.max_spline_offset, 80.0);
    }

    #[test]
    fn test_builders_chain() {
        let config = LayoutConfig::default()
            .with_spatial_cell_size(64.0)
            .with_link_hit_tolerance(4.0)
            .with_hit_samples(8);
        assert_eq!(config.spatial_cell_size, 64.0);
        assert_eq!(config.link_hit_tolerance, 4.0);
        assert_eq!(config.hit_samples, 8);
    }

    #[test]
    fn test_effective_cell_size_rejects_nonsense() {
        assert_eq!(LayoutConfig::default().with_spatial_cell_size(0.0).effective_cell_size(), 256.0);
        assert_eq!(
            LayoutConfig::default().with_spatial_cell_size(f32::NAN).effective_cell_size(),
            256.0
        );
        assert_eq!(LayoutConfig::default().with_spatial_cell_size(32.0).effective_cell_size(), 32.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: LayoutConfig = serde_json::from_str(r#"{"zoom": 1.5}"#).expect("valid json");
        assert_eq!(config.zoom, 1.5);
        assert_eq!(config.slot_hit_radius, 10.0);
    }
}
