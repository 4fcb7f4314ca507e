//! Layout engine: fills in positions for elements that have none. It never
//! moves an element that already holds a valid position from a higher
//! precedence source.

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::LayoutConfig;
use crate::model::{Position, TopologyState};

/// Hand-tuned canonical offsets for the built-in groups, so the map reads
/// the same across sessions: core centered, perimeter tiers stacked above
/// it, infrastructure groups fanned out to the sides.
pub const BUILTIN_SLOTS: &[(&str, f64, f64)] = &[
    // core sits just off the origin: exactly (0,0) is the unplaced sentinel
    ("core", 0.0, 150.0),
    ("dmz", 0.0, -900.0),
    ("internet", 0.0, -1800.0),
    ("external", 1200.0, -1800.0),
    ("ips", -1200.0, -900.0),
    ("wan", -1500.0, -600.0),
    ("visibility", 1500.0, -600.0),
    ("extranet", -1500.0, 600.0),
    ("datacenter", 1500.0, 600.0),
    ("oob", -1500.0, 1500.0),
    ("replication", 1500.0, 1500.0),
];

pub fn builtin_slot(name: &str) -> Option<Position> {
    BUILTIN_SLOTS
        .iter()
        .find(|(slot, _, _)| *slot == name)
        .map(|(_, x, y)| Position::new(*x, *y))
}

pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Position for a group. Built-in names take their canonical slot;
    /// unknown groups share a circle of fixed radius, evenly divided by
    /// the unknown-group count.
    pub fn group_position(&self, name: &str, unknown_index: usize, unknown_count: usize) -> Position {
        if let Some(slot) = builtin_slot(name) {
            return slot;
        }
        let count = unknown_count.max(1) as f64;
        let angle = unknown_index as f64 * std::f64::consts::TAU / count;
        Position::new(
            self.config.radial_radius * angle.cos(),
            self.config.radial_radius * angle.sin(),
        )
    }

    /// Fixed-width grid around the group center; `placed` is the count of
    /// member devices already holding a position (the group node itself
    /// never counts).
    pub fn device_in_group(&self, center: Position, placed: usize) -> Position {
        let per_row = self.config.devices_per_row.max(1);
        let col = placed % per_row;
        let row = placed / per_row;
        let row_width = (per_row - 1) as f64 * self.config.device_spacing_x;
        Position::new(
            center.x - row_width / 2.0 + col as f64 * self.config.device_spacing_x,
            center.y + row as f64 * self.config.device_spacing_y,
        )
    }

    /// Collision-avoiding placement for a device with no group: random
    /// candidates inside the viewport, rejected near the origin or near any
    /// placed element; then a coarse grid scan; finally a randomized spot
    /// near a fixed anchor.
    pub fn orphan_position(&self, state: &TopologyState, rng: &mut StdRng) -> Position {
        let half_w = self.config.viewport_width / 2.0;
        let half_h = self.config.viewport_height / 2.0;

        for _ in 0..self.config.scatter_attempts {
            let candidate = Position::new(
                rng.random_range(-half_w..half_w),
                rng.random_range(-half_h..half_h),
            );
            if self.is_clear(state, candidate) {
                return candidate;
            }
        }

        // Coarse scan of the viewport for the first clear cell.
        let step = self.config.fallback_cell.max(1.0);
        let mut y = -half_h;
        while y <= half_h {
            let mut x = -half_w;
            while x <= half_w {
                let candidate = Position::new(x, y);
                if self.is_clear(state, candidate) {
                    return candidate;
                }
                x += step;
            }
            y += step;
        }

        // Last resort: jitter near a fixed off-canvas anchor.
        Position::new(
            self.config.fallback_anchor_x + rng.random_range(0.0..step),
            self.config.fallback_anchor_y + rng.random_range(0.0..step),
        )
    }

    fn is_clear(&self, state: &TopologyState, candidate: Position) -> bool {
        if !candidate.is_valid() {
            return false;
        }
        if candidate.distance_to(Position::new(0.0, 0.0)) < self.config.min_origin_distance {
            return false;
        }
        state
            .positions
            .values()
            .filter(|position| position.is_valid())
            .all(|position| candidate.distance_to(*position) >= self.config.min_node_distance)
    }

    /// Computes a position for an element that has no valid one. Groups get
    /// slot/radial placement, grouped devices the in-group grid, orphans the
    /// scatter search.
    pub fn position_for(&self, state: &TopologyState, id: &str, rng: &mut StdRng) -> Position {
        if state.groups.contains_key(id) {
            let unknowns: Vec<&str> = state
                .groups
                .keys()
                .filter(|name| builtin_slot(name).is_none())
                .map(String::as_str)
                .collect();
            let index = unknowns.iter().position(|name| *name == id).unwrap_or(0);
            return self.group_position(id, index, unknowns.len());
        }

        let group = state
            .devices
            .get(id)
            .and_then(|device| device.group.clone());
        match group {
            Some(group) => {
                let center = state
                    .valid_position(&group)
                    .unwrap_or_else(|| self.position_for_group(state, &group));
                self.device_in_group(center, state.placed_member_count(&group))
            }
            None => self.orphan_position(state, rng),
        }
    }

    fn position_for_group(&self, state: &TopologyState, name: &str) -> Position {
        let unknowns: Vec<&str> = state
            .groups
            .keys()
            .filter(|candidate| builtin_slot(candidate).is_none())
            .map(String::as_str)
            .collect();
        let index = unknowns.iter().position(|candidate| *candidate == name).unwrap_or(0);
        self.group_position(name, index, unknowns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::model::Device;

    fn engine_fixture() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn builtin_groups_take_fixed_slots() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let core = engine.group_position("core", 0, 5);
        assert_eq!(core, Position::new(0.0, 150.0));
        assert!(core.is_valid());
        let internet = engine.group_position("internet", 3, 5);
        assert_eq!(internet, Position::new(0.0, -1800.0));
    }

    #[test]
    fn unknown_groups_divide_the_circle_evenly() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let first = engine.group_position("lab-east", 0, 4);
        let second = engine.group_position("lab-west", 1, 4);
        let radius = config.radial_radius;
        assert!((first.distance_to(Position::new(0.0, 0.0)) - radius).abs() < 1e-6);
        assert!((second.distance_to(Position::new(0.0, 0.0)) - radius).abs() < 1e-6);
        assert!((second.y - radius).abs() < 1e-6, "quarter turn lands on +y");
    }

    #[test]
    fn in_group_grid_wraps_after_four_columns() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let center = Position::new(1000.0, 500.0);
        let first = engine.device_in_group(center, 0);
        let fifth = engine.device_in_group(center, 4);
        assert_eq!(first.y, center.y);
        assert_eq!(fifth.y, center.y + config.device_spacing_y);
        assert_eq!(first.x, fifth.x, "row wrap returns to the first column");
    }

    #[test]
    fn grid_row_is_centered_on_group() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let center = Position::new(0.0, 100.0);
        let xs: Vec<f64> = (0..4)
            .map(|idx| engine.device_in_group(center, idx).x)
            .collect();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn scatter_avoids_origin_and_existing_devices() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let mut state = TopologyState::new();
        state.set_position("existing", Position::new(800.0, 800.0));
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..32 {
            let position = engine.orphan_position(&state, &mut rng);
            assert!(position.is_valid());
            assert!(
                position.distance_to(Position::new(0.0, 0.0)) >= config.min_origin_distance
            );
            assert!(
                position.distance_to(Position::new(800.0, 800.0)) >= config.min_node_distance
            );
        }
    }

    #[test]
    fn scatter_is_deterministic_for_a_seed() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let state = TopologyState::new();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        assert_eq!(
            engine.orphan_position(&state, &mut rng_a),
            engine.orphan_position(&state, &mut rng_b)
        );
    }

    #[test]
    fn grid_scan_finds_a_cell_when_scatter_is_exhausted() {
        let mut config = engine_fixture();
        config.scatter_attempts = 0;
        let engine = LayoutEngine::new(&config);
        let state = TopologyState::new();
        let mut rng = StdRng::seed_from_u64(1);
        let position = engine.orphan_position(&state, &mut rng);
        assert!(position.is_valid());
        assert!(position.distance_to(Position::new(0.0, 0.0)) >= config.min_origin_distance);
    }

    #[test]
    fn position_for_grouped_device_uses_group_center() {
        let config = engine_fixture();
        let engine = LayoutEngine::new(&config);
        let mut state = TopologyState::new();
        state.ensure_group("core");
        state.set_position("core", Position::new(100.0, 200.0));
        state.devices.insert(
            "10.0.0.1".to_string(),
            Device {
                id: "10.0.0.1".to_string(),
                label: "sw".to_string(),
                group: Some("core".to_string()),
            },
        );
        let mut rng = StdRng::seed_from_u64(1);
        let position = engine.position_for(&state, "10.0.0.1", &mut rng);
        assert_eq!(position.y, 200.0);
        assert!((position.x - 100.0).abs() <= 1.5 * config.device_spacing_x);
    }
}
