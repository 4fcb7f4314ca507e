//! Reconciler: diffs an incoming snapshot against the canonical state and
//! applies the change-set without discarding user-placed layout.

use std::collections::btree_map::Entry;

use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::config::LayoutConfig;
use crate::layout::LayoutEngine;
use crate::model::{Device, DeviceKind, DeviceStatus, Position, TopologyState};
use crate::registry::{LinkRecord, Severity, canonical_link_id};
use crate::snapshot::{FetchError, Snapshot};
use crate::view::{RenderPatch, Renderer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub new_devices: Vec<String>,
    pub new_links: Vec<String>,
    pub status_updates: Vec<(String, DeviceStatus)>,
    pub kind_updates: Vec<(String, DeviceKind)>,
    pub position_updates: Vec<(String, Position)>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new_devices.is_empty()
            && self.new_links.is_empty()
            && self.status_updates.is_empty()
            && self.kind_updates.is_empty()
            && self.position_updates.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("a reconciliation cycle is already running")]
    Busy,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub struct Reconciler {
    layout: LayoutConfig,
    rng: StdRng,
    in_progress: bool,
    drag: Option<String>,
}

impl Reconciler {
    pub fn new(layout: &LayoutConfig, seed: u64) -> Self {
        Self {
            layout: layout.clone(),
            rng: StdRng::seed_from_u64(seed),
            in_progress: false,
            drag: None,
        }
    }

    pub fn drag_active(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_drag(&mut self, id: &str) {
        self.drag = Some(id.to_string());
    }

    /// Live drag coordinate; significance is decided at `end_drag`.
    pub fn drag_to(&self, state: &mut TopologyState, id: &str, position: Position) {
        if position.is_valid() {
            state.set_position(id, position);
        }
    }

    pub fn end_drag(&mut self, state: &mut TopologyState, id: &str, position: Position) {
        if self.drag.as_deref() == Some(id) {
            self.drag = None;
        }
        if !position.is_valid() {
            return;
        }
        let moved = state
            .valid_position(id)
            .is_none_or(|held| !held.within(position, self.layout.position_tolerance));
        if moved {
            state.record_user_position(id, position);
        } else {
            state.set_position(id, position);
        }
    }

    /// Runs one reconciliation cycle. Non-reentrant: a call arriving while
    /// another cycle is in flight fails with `Busy` and touches nothing.
    pub fn reconcile(
        &mut self,
        state: &mut TopologyState,
        snapshot: &Snapshot,
        renderer: &mut dyn Renderer,
    ) -> Result<ChangeSet, ReconcileError> {
        if self.in_progress {
            return Err(ReconcileError::Busy);
        }
        self.in_progress = true;
        let result = self.run_cycle(state, snapshot, renderer);
        self.in_progress = false;
        Ok(result)
    }

    fn run_cycle(
        &mut self,
        state: &mut TopologyState,
        snapshot: &Snapshot,
        renderer: &mut dyn Renderer,
    ) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut edge_styles: Vec<(String, Severity)> = Vec::new();

        for entry in &snapshot.groups {
            let group = state.ensure_group(&entry.name);
            if let Some(label) = &entry.label {
                group.label = label.clone();
            }
        }

        for entry in &snapshot.devices {
            if entry.id.is_empty() {
                continue;
            }
            if let Some(group) = &entry.group {
                state.ensure_group(group);
            }
            let kind = entry.kind.as_deref().map(DeviceKind::from_token);
            if !state.devices.contains_key(&entry.id) {
                state.devices.insert(
                    entry.id.clone(),
                    Device {
                        id: entry.id.clone(),
                        label: entry.label.clone().unwrap_or_else(|| entry.id.clone()),
                        group: entry.group.clone(),
                    },
                );
                state
                    .kinds
                    .insert(entry.id.clone(), kind.unwrap_or(DeviceKind::Switch));
                if let Some(raw) = &entry.status {
                    state
                        .status
                        .insert(entry.id.clone(), DeviceStatus::from_token(raw));
                }
                changes.new_devices.push(entry.id.clone());
                continue;
            }

            // Existing device: accretive update of the fields present.
            if let Some(device) = state.devices.get_mut(&entry.id) {
                if let Some(label) = &entry.label {
                    device.label = label.clone();
                }
                if entry.group.is_some() && device.group != entry.group {
                    device.group = entry.group.clone();
                }
            }
            if let Some(kind) = kind {
                if state.kinds.get(&entry.id) != Some(&kind) {
                    state.kinds.insert(entry.id.clone(), kind);
                    changes.kind_updates.push((entry.id.clone(), kind));
                }
            }
            if let Some(raw) = &entry.status {
                Self::set_status(state, &mut changes, &entry.id, DeviceStatus::from_token(raw));
            }
        }

        for (id, raw) in &snapshot.status {
            if !state.devices.contains_key(id) {
                continue;
            }
            Self::set_status(state, &mut changes, id, DeviceStatus::from_token(raw));
        }

        for entry in &snapshot.links {
            if !state.devices.contains_key(&entry.device_a)
                || !state.devices.contains_key(&entry.device_b)
            {
                debug!(
                    "dropping link {} <-> {}: endpoint not registered",
                    entry.device_a, entry.device_b
                );
                continue;
            }
            let id = canonical_link_id(
                &entry.device_a,
                &entry.interface_a,
                &entry.device_b,
                &entry.interface_b,
            );
            let incoming = LinkRecord::new(
                &entry.device_a,
                &entry.interface_a,
                &entry.device_b,
                &entry.interface_b,
                entry.inbound,
                entry.outbound,
                entry.capacity,
                &entry.note,
            );
            match state.links.entry(id) {
                Entry::Occupied(mut slot) => {
                    slot.get_mut().merge(&incoming);
                    edge_styles.push((slot.key().clone(), slot.get().severity));
                }
                Entry::Vacant(slot) => {
                    changes.new_links.push(slot.key().clone());
                    slot.insert(incoming);
                }
            }
        }

        // A drag in progress suspends every position move; the snapshot's
        // other fields still land.
        if self.drag.is_none() {
            self.reconcile_positions(state, snapshot, &mut changes);
            self.fill_missing_positions(state, &mut changes);
        }

        let patch = RenderPatch {
            changes: changes.clone(),
            edge_styles,
        };
        if renderer.is_active() {
            renderer.apply(state, &patch);
        } else {
            // No render target: incremental patching against nothing is not
            // a supported state.
            renderer.initialize(state);
        }

        debug!(
            "reconcile: +{} devices, +{} links, {} status, {} kind, {} position updates",
            changes.new_devices.len(),
            changes.new_links.len(),
            changes.status_updates.len(),
            changes.kind_updates.len(),
            changes.position_updates.len(),
        );
        changes
    }

    fn set_status(
        state: &mut TopologyState,
        changes: &mut ChangeSet,
        id: &str,
        status: DeviceStatus,
    ) {
        if state.status.get(id) == Some(&status) {
            return;
        }
        state.status.insert(id.to_string(), status);
        changes.status_updates.push((id.to_string(), status));
    }

    /// Backend positions land only where nothing better is held: a held
    /// position that differs by more than the tolerance is treated as
    /// user-modified and wins. Invalid backend values are ignored here and
    /// repaired by the layout fill.
    fn reconcile_positions(
        &self,
        state: &mut TopologyState,
        snapshot: &Snapshot,
        changes: &mut ChangeSet,
    ) {
        for (id, backend) in &snapshot.positions {
            if !state.devices.contains_key(id) && !state.groups.contains_key(id) {
                continue;
            }
            if !backend.is_valid() {
                warn!("ignoring invalid backend position for {id}");
                continue;
            }
            match state.valid_position(id) {
                None => {
                    state.set_position(id, *backend);
                    changes.position_updates.push((id.clone(), *backend));
                }
                Some(held) => {
                    if held.within(*backend, self.layout.position_tolerance) {
                        continue;
                    }
                    debug!("keeping user-modified position for {id}");
                }
            }
        }
    }

    /// Groups first, then devices, so a freshly slotted group has a center
    /// before its members take grid cells.
    fn fill_missing_positions(&mut self, state: &mut TopologyState, changes: &mut ChangeSet) {
        let engine = LayoutEngine::new(&self.layout);

        let unplaced_groups: Vec<String> = state
            .groups
            .keys()
            .filter(|name| state.valid_position(name).is_none())
            .cloned()
            .collect();
        for name in unplaced_groups {
            let position = engine.position_for(state, &name, &mut self.rng);
            state.set_position(&name, position);
            changes.position_updates.push((name, position));
        }

        let unplaced_devices: Vec<String> = state
            .devices
            .keys()
            .filter(|id| state.valid_position(id).is_none())
            .cloned()
            .collect();
        for id in unplaced_devices {
            let position = engine.position_for(state, &id, &mut self.rng);
            state.set_position(&id, position);
            changes.position_updates.push((id, position));
        }
    }
}

/// Generation ticket for in-flight polls.
#[derive(Debug)]
pub struct Ticket(u64);

/// Implements the stale-response rule: a poll completing after a newer one
/// began is ignored outright; the newer cycle re-runs the full diff anyway.
#[derive(Debug, Default)]
pub struct Poller {
    latest: u64,
}

impl Poller {
    pub fn begin(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Completes a poll. Stale tickets return `Ok(None)`; fetch failures
    /// abandon the cycle with prior state retained unchanged.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Snapshot, FetchError>,
        reconciler: &mut Reconciler,
        state: &mut TopologyState,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<ChangeSet>, PollError> {
        if !self.is_current(&ticket) {
            debug!("ignoring stale poll response (generation {})", ticket.0);
            return Ok(None);
        }
        let snapshot = result?;
        Ok(Some(reconciler.reconcile(state, &snapshot, renderer)?))
    }
}
