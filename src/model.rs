use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::registry::LinkRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Firewall,
    Switch,
    Router,
    Server,
    Internet,
    ExtSwitch,
    CoreSwitch,
    Isp,
    Ips,
    Proxy,
}

impl DeviceKind {
    /// Maps a raw type token to a kind. Unrecognized tokens render as a
    /// plain switch, matching the original data feed.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "firewall" => Self::Firewall,
            "switch" => Self::Switch,
            "router" => Self::Router,
            "server" => Self::Server,
            "internet" => Self::Internet,
            "ext_switch" | "external_switch" => Self::ExtSwitch,
            "core_switch" => Self::CoreSwitch,
            "isp" => Self::Isp,
            "ips" => Self::Ips,
            "proxy" => Self::Proxy,
            _ => Self::Switch,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firewall => "firewall",
            Self::Switch => "switch",
            Self::Router => "router",
            Self::Server => "server",
            Self::Internet => "internet",
            Self::ExtSwitch => "ext_switch",
            Self::CoreSwitch => "core_switch",
            Self::Isp => "isp",
            Self::Ips => "ips",
            Self::Proxy => "proxy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    On,
    Off,
}

impl DeviceStatus {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "on" | "up" | "active" => Self::On,
            _ => Self::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Exactly (0,0) is the backend's "never placed" sentinel and is never
    /// a usable coordinate; neither are NaN or infinite values.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && !(self.x == 0.0 && self.y == 0.0)
    }

    /// True when the two coordinates agree within the pixel tolerance on
    /// both axes.
    pub fn within(&self, other: Position, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    pub fn distance_to(&self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub label: String,
    pub group: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub label: String,
}

impl Group {
    /// Derives a display label from the group name: `out-of-band` becomes
    /// `Out Of Band`.
    pub fn titled(name: &str) -> Self {
        let label = name
            .split(['-', '_', ' '])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            name: name.to_string(),
            label,
        }
    }
}

/// The canonical in-memory model. Every table is an explicit field; status
/// and kind live in side maps keyed by device identity so churn on either
/// never rewrites a device record.
#[derive(Debug, Clone, Default)]
pub struct TopologyState {
    pub groups: BTreeMap<String, Group>,
    pub devices: BTreeMap<String, Device>,
    pub links: BTreeMap<String, LinkRecord>,
    pub positions: BTreeMap<String, Position>,
    pub status: BTreeMap<String, DeviceStatus>,
    pub kinds: BTreeMap<String, DeviceKind>,
    /// Identities the user has dragged this session.
    pub user_moved: BTreeSet<String>,
}

impl TopologyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_group(&mut self, name: &str) -> &mut Group {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::titled(name))
    }

    /// The held position for an identity, if one exists and passes the
    /// validity check.
    pub fn valid_position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied().filter(Position::is_valid)
    }

    pub fn group_members(&self, name: &str) -> impl Iterator<Item = &Device> {
        self.devices
            .values()
            .filter(move |device| device.group.as_deref() == Some(name))
    }

    /// Count of member devices that already hold a valid position; the
    /// group node itself never counts.
    pub fn placed_member_count(&self, name: &str) -> usize {
        self.group_members(name)
            .filter(|device| self.valid_position(&device.id).is_some())
            .count()
    }

    pub fn set_position(&mut self, id: &str, position: Position) {
        self.positions.insert(id.to_string(), position);
    }

    /// Records a position as user-placed; user-placed positions win over
    /// backend values during reconciliation.
    pub fn record_user_position(&mut self, id: &str, position: Position) {
        self.positions.insert(id.to_string(), position);
        self.user_moved.insert(id.to_string());
    }

    /// Only valid positions may be submitted to the backend.
    pub fn positions_for_save(&self) -> BTreeMap<String, Position> {
        self.positions
            .iter()
            .filter(|(_, position)| position.is_valid())
            .map(|(id, position)| (id.clone(), *position))
            .collect()
    }

    /// Empties every table atomically.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.devices.clear();
        self.links.clear();
        self.positions.clear();
        self.status.clear();
        self.kinds.clear();
        self.user_moved.clear();
    }
}
