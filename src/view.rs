//! The flat element list handed to the external rendering engine, and the
//! trait seam the reconciler talks to it through.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::model::{DeviceStatus, Position, TopologyState};
use crate::reconcile::ChangeSet;
use crate::registry::Severity;
use crate::theme::Theme;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Group {
        id: String,
        label: String,
        color: String,
        position: Option<Position>,
    },
    Device {
        id: String,
        label: String,
        kind: String,
        parent: Option<String>,
        status: String,
        color: String,
        position: Option<Position>,
    },
    Edge {
        id: String,
        source: String,
        target: String,
        severity: String,
        color: String,
        utilization: f64,
        inbound: f64,
        outbound: f64,
        capacity: f64,
        note: String,
    },
}

/// One atomic batch of render updates; the reconciler issues at most one
/// per cycle so the engine never paints a half-applied change-set.
#[derive(Debug, Clone, Default)]
pub struct RenderPatch {
    pub changes: ChangeSet,
    /// Severity refreshed by link merges, including merges into existing
    /// links that produced no new identity.
    pub edge_styles: Vec<(String, Severity)>,
}

pub trait Renderer {
    /// False when no drawing surface exists; the reconciler then falls back
    /// to full reinitialization instead of incremental patching.
    fn is_active(&self) -> bool;
    fn initialize(&mut self, state: &TopologyState);
    fn apply(&mut self, state: &TopologyState, patch: &RenderPatch);
}

/// Test/offline renderer that records what it was told.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub active: bool,
    pub initializations: usize,
    pub patches: Vec<RenderPatch>,
}

impl Renderer for RecordingRenderer {
    fn is_active(&self) -> bool {
        self.active
    }

    fn initialize(&mut self, _state: &TopologyState) {
        self.initializations += 1;
        self.active = true;
    }

    fn apply(&mut self, _state: &TopologyState, patch: &RenderPatch) {
        self.patches.push(patch.clone());
    }
}

/// Builds the full element list: groups first (empty ones pruned), then
/// devices with parent references, then edges with the style overlay.
pub fn build_elements(state: &TopologyState, theme: &Theme) -> Vec<Element> {
    let mut member_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for device in state.devices.values() {
        if let Some(group) = device.group.as_deref() {
            *member_counts.entry(group).or_default() += 1;
        }
    }

    let mut elements = Vec::new();
    for group in state.groups.values() {
        if member_counts.get(group.name.as_str()).copied().unwrap_or(0) == 0 {
            continue;
        }
        elements.push(Element::Group {
            id: group.name.clone(),
            label: group.label.clone(),
            color: theme.group_color(&group.name).to_string(),
            position: state.valid_position(&group.name),
        });
    }

    for device in state.devices.values() {
        let status = state
            .status
            .get(&device.id)
            .copied()
            .unwrap_or(DeviceStatus::Off);
        let kind = state
            .kinds
            .get(&device.id)
            .map(|kind| kind.as_str())
            .unwrap_or("switch");
        elements.push(Element::Device {
            id: device.id.clone(),
            label: device.label.clone(),
            kind: kind.to_string(),
            parent: device.group.clone(),
            status: status.as_str().to_string(),
            color: theme.status_color(status).to_string(),
            position: state.valid_position(&device.id),
        });
    }

    for link in state.links.values() {
        elements.push(Element::Edge {
            id: link.id.clone(),
            source: link.device_a.clone(),
            target: link.device_b.clone(),
            severity: link.severity.as_str().to_string(),
            color: theme.severity_color(link.severity).to_string(),
            utilization: link.utilization,
            inbound: link.inbound,
            outbound: link.outbound,
            capacity: link.capacity,
            note: link.note.clone(),
        });
    }

    elements
}

pub fn write_element_dump(path: &Path, state: &TopologyState, theme: &Theme) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &build_elements(state, theme))?;
    Ok(())
}
