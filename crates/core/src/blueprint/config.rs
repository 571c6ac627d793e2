//! Tunables for room placement and passage routing.

use serde::{Deserialize, Serialize};

use super::LayoutError;

/// Largest distance, in cells, placement may leave between a room and its
/// anchor once every backoff round has been added.
pub const MAX_PLACEMENT_GAP: i32 = 1 << 12;

/// Largest half extent accepted for `bound` and for `detour_margin`.
pub const MAX_LAYOUT_EXTENT: i32 = 1 << 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum number of empty cells kept between any two rooms.
    pub clearance: i32,
    /// Distance range, in cells, between a room and the room it is placed against.
    pub min_gap: i32,
    pub max_gap: i32,
    /// Candidate positions tried per anchor room in each round.
    pub placement_attempts: u32,
    /// Extra rounds after the first one, each pushing candidates further out.
    pub backoff_rounds: u32,
    pub backoff_gap_step: i32,
    /// Relative likelihood of placing toward north, east, south and west.
    pub direction_weights: [u32; 4],
    /// Half-extent around the origin that every room must stay inside.
    pub bound: Option<i32>,
    /// Random samples per one-joint route shape before falling back to search.
    pub route_attempts: u32,
    /// How far a detour search may stray outside the two rooms' bounding box.
    pub detour_margin: i32,
    /// Cells a single detour search may visit.
    pub route_cell_budget: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            clearance: 1,
            min_gap: 2,
            max_gap: 5,
            placement_attempts: 12,
            backoff_rounds: 3,
            backoff_gap_step: 3,
            direction_weights: [1, 1, 1, 1],
            bound: None,
            route_attempts: 6,
            detour_margin: 8,
            route_cell_budget: 20_000,
        }
    }
}

impl LayoutConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, LayoutError> {
        let config: Self = toml::from_str(source)
            .map_err(|error| LayoutError::InvalidConfig(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let reason = if self.clearance < 1 {
            "clearance must leave at least one cell for passages"
        } else if self.min_gap < self.clearance {
            "min_gap must be at least the clearance"
        } else if self.max_gap < self.min_gap {
            "max_gap must not be below min_gap"
        } else if self.placement_attempts == 0 {
            "placement_attempts must be positive"
        } else if self.backoff_gap_step < 0 {
            "backoff_gap_step must not be negative"
        } else if self.direction_weights.iter().all(|&weight| weight == 0) {
            "at least one direction weight must be positive"
        } else if self.bound.is_some_and(|bound| bound <= 0) {
            "bound must be positive"
        } else if self.bound.is_some_and(|bound| bound > MAX_LAYOUT_EXTENT) {
            "bound exceeds MAX_LAYOUT_EXTENT"
        } else if self.detour_margin < 0 {
            "detour_margin must not be negative"
        } else if self.detour_margin > MAX_PLACEMENT_GAP {
            "detour_margin exceeds MAX_PLACEMENT_GAP"
        } else if self.widest_gap() > i64::from(MAX_PLACEMENT_GAP) {
            "max_gap plus every backoff step exceeds MAX_PLACEMENT_GAP"
        } else {
            return Ok(());
        };
        Err(LayoutError::InvalidConfig(reason.to_string()))
    }

    /// Gap used by the last backoff round at its widest.
    fn widest_gap(&self) -> i64 {
        i64::from(self.max_gap)
            + i64::from(self.backoff_rounds) * i64::from(self.backoff_gap_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(LayoutConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let config = LayoutConfig::from_toml_str("clearance = 2\nmin_gap = 3\nbound = 60\n")
            .expect("valid config");
        assert_eq!(config.clearance, 2);
        assert_eq!(config.bound, Some(60));
        assert_eq!(config.max_gap, LayoutConfig::default().max_gap);
    }

    #[test]
    fn inconsistent_gaps_are_rejected() {
        let config = LayoutConfig { min_gap: 0, ..LayoutConfig::default() };
        assert!(matches!(config.validate(), Err(LayoutError::InvalidConfig(_))));

        let config = LayoutConfig { direction_weights: [0; 4], ..LayoutConfig::default() };
        assert!(config.validate().is_err());

        assert!(LayoutConfig::from_toml_str("clearance = \"wide\"").is_err());
    }

    #[test]
    fn oversized_distances_are_rejected() {
        let huge_gap = LayoutConfig { max_gap: 60_000_000, ..LayoutConfig::default() };
        assert!(matches!(huge_gap.validate(), Err(LayoutError::InvalidConfig(_))));

        let runaway_backoff = LayoutConfig {
            backoff_rounds: u32::MAX,
            backoff_gap_step: i32::MAX,
            ..LayoutConfig::default()
        };
        assert!(runaway_backoff.validate().is_err());

        let widest = LayoutConfig {
            max_gap: MAX_PLACEMENT_GAP - 30,
            backoff_rounds: 3,
            backoff_gap_step: 10,
            ..LayoutConfig::default()
        };
        assert_eq!(widest.validate(), Ok(()));
        let past_widest = LayoutConfig { backoff_gap_step: 11, ..widest };
        assert!(past_widest.validate().is_err());

        let huge_bound = LayoutConfig { bound: Some(i32::MAX), ..LayoutConfig::default() };
        assert!(huge_bound.validate().is_err());
        let huge_margin = LayoutConfig { detour_margin: i32::MAX, ..LayoutConfig::default() };
        assert!(huge_margin.validate().is_err());
        assert!(LayoutConfig::from_toml_str("max_gap = 2147483647").is_err());
    }
}
