use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::theme::Theme;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Grid width for devices placed inside a group.
    pub devices_per_row: usize,
    /// Column pitch of the in-group grid.
    pub device_spacing_x: f64,
    /// Row pitch of the in-group grid.
    pub device_spacing_y: f64,
    /// Radius of the circle unknown groups are spread around.
    pub radial_radius: f64,
    /// Extent searched for orphan placement, centered on the origin.
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Scatter candidates closer than this to the origin are rejected.
    pub min_origin_distance: f64,
    /// Scatter candidates closer than this to any placed element are
    /// rejected.
    pub min_node_distance: f64,
    /// Random candidates tried before falling back to the grid scan.
    pub scatter_attempts: u32,
    /// Cell pitch of the fallback grid scan.
    pub fallback_cell: f64,
    /// Anchor of the last-resort randomized placement.
    pub fallback_anchor_x: f64,
    pub fallback_anchor_y: f64,
    /// Positions differing by at most this many pixels per axis count as
    /// the same placement.
    pub position_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            devices_per_row: 4,
            device_spacing_x: 200.0,
            device_spacing_y: 150.0,
            radial_radius: 2400.0,
            viewport_width: 3600.0,
            viewport_height: 2400.0,
            min_origin_distance: 400.0,
            min_node_distance: 160.0,
            scatter_attempts: 64,
            fallback_cell: 240.0,
            fallback_anchor_x: 2600.0,
            fallback_anchor_y: -2000.0,
            position_tolerance: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// How long the transitioning overlay runs after a status change.
    pub transition_ms: u64,
    /// Transition events older than this are pruned lazily.
    pub horizon_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            transition_ms: 1500,
            horizon_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub animation: AnimationConfig,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    theme: Option<String>,
    layout: Option<LayoutConfig>,
    animation: Option<AnimationConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "dark" {
            config.theme = Theme::dark();
        } else if theme_name == "standard" || theme_name == "default" {
            config.theme = Theme::standard();
        }
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(animation) = parsed.animation {
        config.animation = animation;
    }

    Ok(config)
}
