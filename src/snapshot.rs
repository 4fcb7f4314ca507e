//! Typed snapshot intermediate representation. Raw backend payloads and
//! spreadsheet import rows are validated here and never reach the
//! reconciler untyped.

use std::collections::BTreeMap;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{DeviceKind, Position};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    /// Backend-held positions keyed by device address or group name.
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
    /// Status overlay keyed by device address; raw tokens, normalized on
    /// application.
    #[serde(default)]
    pub status: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Optional fields stay optional so import rows can be accretive: only
/// fields actually present in a row are carried forward.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    pub device_a: String,
    #[serde(default)]
    pub interface_a: String,
    pub device_b: String,
    #[serde(default)]
    pub interface_b: String,
    #[serde(default)]
    pub inbound: f64,
    #[serde(default)]
    pub outbound: f64,
    #[serde(default)]
    pub capacity: f64,
    #[serde(default)]
    pub note: String,
}

pub fn parse_snapshot(input: &str) -> Result<Snapshot, SnapshotError> {
    Ok(serde_json::from_str(input)?)
}

/// A raw spreadsheet row: free-form header -> cell value.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based row index in the import batch.
    pub row: usize,
    pub reason: String,
}

static KEY_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 _]+").unwrap());
static NAME_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// Normalized header -> canonical field. Spreadsheets in the wild name the
/// same column a dozen ways; this table is the union seen so far.
static FIELD_ALIASES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    let pairs: &[(&str, &str)] = &[
        // device A
        ("device_a_ip", "device_a_address"),
        ("devicea_ip", "device_a_address"),
        ("device_a_address", "device_a_address"),
        ("ip_a", "device_a_address"),
        ("ip_device_a", "device_a_address"),
        ("address_a", "device_a_address"),
        ("device_a_hostname", "device_a_name"),
        ("devicea_hostname", "device_a_name"),
        ("device_a_host_name", "device_a_name"),
        ("host_a", "device_a_name"),
        ("hostname_a", "device_a_name"),
        ("device_a_name", "device_a_name"),
        ("name_a", "device_a_name"),
        ("device_a_interface", "device_a_interface"),
        ("devicea_interface", "device_a_interface"),
        ("intf_a", "device_a_interface"),
        ("interface_a", "device_a_interface"),
        ("device_a_type", "device_a_kind"),
        ("devicea_type", "device_a_kind"),
        ("type_a", "device_a_kind"),
        ("device_a_status", "device_a_status"),
        ("status_a", "device_a_status"),
        ("device_a_group", "device_a_group"),
        ("device_a_block", "device_a_group"),
        ("group_a", "device_a_group"),
        ("block_a", "device_a_group"),
        // device B
        ("device_b_ip", "device_b_address"),
        ("deviceb_ip", "device_b_address"),
        ("device_b_address", "device_b_address"),
        ("ip_b", "device_b_address"),
        ("ip_device_b", "device_b_address"),
        ("address_b", "device_b_address"),
        ("device_b_hostname", "device_b_name"),
        ("deviceb_hostname", "device_b_name"),
        ("device_b_host_name", "device_b_name"),
        ("host_b", "device_b_name"),
        ("hostname_b", "device_b_name"),
        ("device_b_name", "device_b_name"),
        ("name_b", "device_b_name"),
        ("device_b_interface", "device_b_interface"),
        ("deviceb_interface", "device_b_interface"),
        ("intf_b", "device_b_interface"),
        ("interface_b", "device_b_interface"),
        ("device_b_type", "device_b_kind"),
        ("deviceb_type", "device_b_kind"),
        ("type_b", "device_b_kind"),
        ("device_b_status", "device_b_status"),
        ("status_b", "device_b_status"),
        ("device_b_group", "device_b_group"),
        ("device_b_block", "device_b_group"),
        ("group_b", "device_b_group"),
        ("block_b", "device_b_group"),
        // throughput
        ("inbound", "inbound"),
        ("in_speed", "inbound"),
        ("speed_in", "inbound"),
        ("outbound", "outbound"),
        ("out_speed", "outbound"),
        ("speed_out", "outbound"),
        ("capacity", "capacity"),
        ("bandwidth", "capacity"),
        // annotation
        ("comments", "note"),
        ("comment", "note"),
        ("remark", "note"),
        ("remarks", "note"),
        ("description", "note"),
        ("note", "note"),
    ];
    for (alias, field) in pairs {
        map.insert(*alias, *field);
    }
    map
});

fn normalize_key(raw: &str) -> String {
    let cleaned = KEY_JUNK_RE.replace_all(raw, " ");
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

/// Trims a cell value and maps the usual placeholder tokens to empty.
pub fn clean_field(value: &str) -> String {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();
    match lowered.as_str() {
        "-" | "" | "none" | "null" | "undefined" | "n/a" | "na" => String::new(),
        _ => trimmed.to_string(),
    }
}

fn map_headers(raw: &RawRow) -> BTreeMap<&'static str, String> {
    let mut record = BTreeMap::new();
    for (key, value) in raw {
        if let Some(field) = FIELD_ALIASES.get(normalize_key(key).as_str()) {
            let cleaned = clean_field(value);
            if !cleaned.is_empty() {
                record.insert(*field, cleaned);
            }
        }
    }
    record
}

/// Heuristic group assignment by address, kind and whole-word hostname
/// keywords. The address pins come first so the two core gateways always
/// land in `core` no matter what type the row declares; ISP devices are
/// deliberately never grouped.
pub fn assign_group(name: &str, address: &str, kind: DeviceKind) -> Option<&'static str> {
    if address == "10.99.18.253" || address == "10.99.18.254" {
        return Some("core");
    }
    if kind == DeviceKind::Isp {
        return None;
    }
    if kind == DeviceKind::CoreSwitch {
        return Some("core");
    }

    let sanitized = NAME_JUNK_RE
        .replace_all(name, " ")
        .trim()
        .to_ascii_uppercase();
    let padded = format!(" {sanitized} ");
    const KEYWORDS: &[(&[&str], &str)] = &[
        (&[" COR ", " CORE "], "core"),
        (&[" INT ", " INTERNET "], "internet"),
        (&[" OOB ", " OUT OF BAND "], "oob"),
        (&[" WAN ", " WIDE AREA "], "wan"),
        (&[" EXTNET ", " EXTRANET ", " PARTNER "], "extranet"),
        (&[" OTV ", " REPL ", " REPLICATION "], "replication"),
        (&[" DC ", " DATACENTER ", " ACI "], "datacenter"),
        (&[" VIS ", " VISIBILITY ", " MONITOR "], "visibility"),
        (&[" DMZ ", " PERIMETER ", " BORDER "], "dmz"),
        (&[" EXT ", " EXTERNAL ", " EDGE "], "external"),
    ];
    for (tokens, group) in KEYWORDS {
        if tokens.iter().any(|token| padded.contains(token)) {
            return Some(group);
        }
    }

    match kind {
        DeviceKind::Firewall | DeviceKind::Ips | DeviceKind::Proxy => Some("dmz"),
        _ => None,
    }
}

struct RowSide {
    address: String,
    name: String,
    interface: String,
    kind: Option<String>,
    status: Option<String>,
    group: Option<String>,
}

fn extract_side(
    record: &BTreeMap<&'static str, String>,
    side: char,
) -> Result<RowSide, String> {
    let field = |suffix: &str| -> Option<&String> {
        let key: &str = match (side, suffix) {
            ('a', "address") => "device_a_address",
            ('a', "name") => "device_a_name",
            ('a', "interface") => "device_a_interface",
            ('a', "kind") => "device_a_kind",
            ('a', "status") => "device_a_status",
            ('a', "group") => "device_a_group",
            ('b', "address") => "device_b_address",
            ('b', "name") => "device_b_name",
            ('b', "interface") => "device_b_interface",
            ('b', "kind") => "device_b_kind",
            ('b', "status") => "device_b_status",
            ('b', "group") => "device_b_group",
            _ => return None,
        };
        record.get(key)
    };

    let address = field("address").cloned().unwrap_or_default();
    let name = field("name").cloned().unwrap_or_default();
    if address.is_empty() {
        return Err(format!("device {side} is missing an address"));
    }
    if name.is_empty() {
        return Err(format!("device {side} is missing a name"));
    }
    Ok(RowSide {
        address,
        name,
        interface: field("interface").cloned().unwrap_or_default(),
        kind: field("kind").cloned(),
        status: field("status").cloned(),
        group: field("group").cloned(),
    })
}

fn parse_metric(record: &BTreeMap<&'static str, String>, field: &str, row: usize) -> f64 {
    match record.get(field) {
        None => 0.0,
        Some(raw) => raw.parse::<f64>().unwrap_or_else(|_| {
            warn!("row {row}: unparsable {field} value {raw:?}, using 0");
            0.0
        }),
    }
}

fn side_to_entry(side: &RowSide) -> DeviceEntry {
    let kind = side
        .kind
        .as_deref()
        .map(DeviceKind::from_token)
        .unwrap_or(DeviceKind::Switch);
    let group = side
        .group
        .clone()
        .or_else(|| assign_group(&side.name, &side.address, kind).map(str::to_string));
    DeviceEntry {
        id: side.address.clone(),
        label: Some(side.name.clone()),
        kind: side.kind.clone(),
        group,
        status: side.status.clone(),
    }
}

/// Converts a batch of raw import rows into an accretive snapshot.
/// Validation is per side: an invalid side produces no device and is
/// reported, while the other side of the same row may still be imported.
/// The row's link needs both sides.
pub fn rows_to_snapshot(rows: &[RawRow]) -> (Snapshot, Vec<RowError>) {
    let mut snapshot = Snapshot::default();
    let mut errors = Vec::new();

    for (idx, raw) in rows.iter().enumerate() {
        let row = idx + 1;
        let record = map_headers(raw);
        let side_a = extract_side(&record, 'a');
        let side_b = extract_side(&record, 'b');

        for side in [&side_a, &side_b] {
            match side {
                Ok(side) => snapshot.devices.push(side_to_entry(side)),
                Err(reason) => {
                    warn!("skipping row {row} side: {reason}");
                    errors.push(RowError {
                        row,
                        reason: reason.clone(),
                    });
                }
            }
        }

        if let (Ok(a), Ok(b)) = (&side_a, &side_b) {
            snapshot.links.push(LinkEntry {
                device_a: a.address.clone(),
                interface_a: a.interface.clone(),
                device_b: b.address.clone(),
                interface_b: b.interface.clone(),
                inbound: parse_metric(&record, "inbound", row),
                outbound: parse_metric(&record, "outbound", row),
                capacity: parse_metric(&record, "capacity", row),
                note: record.get("note").cloned().unwrap_or_default(),
            });
        }
    }

    (snapshot, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn header_normalization_handles_free_form_keys() {
        assert_eq!(normalize_key("Device A  IP"), "device_a_ip");
        assert_eq!(normalize_key("Intf-A"), "intf_a");
        assert_eq!(normalize_key("  HOST_B "), "host_b");
    }

    #[test]
    fn placeholder_values_clean_to_empty() {
        for token in ["-", "none", "NULL", "n/a", "NA", "  "] {
            assert_eq!(clean_field(token), "");
        }
        assert_eq!(clean_field(" fw-1 "), "fw-1");
    }

    #[test]
    fn empty_side_a_name_skips_only_side_a() {
        let rows = vec![row(&[
            ("Device A IP", "10.0.0.1"),
            ("Device A Hostname", ""),
            ("Intf A", "eth0"),
            ("Device B IP", "10.0.0.2"),
            ("Device B Hostname", "sw-2"),
            ("Intf B", "eth1"),
        ])];
        let (snapshot, errors) = rows_to_snapshot(&rows);
        assert_eq!(errors.len(), 1);
        assert_eq!(snapshot.devices.len(), 1);
        assert_eq!(snapshot.devices[0].id, "10.0.0.2");
        // no link without both endpoints
        assert!(snapshot.links.is_empty());
    }

    #[test]
    fn complete_row_yields_two_devices_and_a_link() {
        let rows = vec![row(&[
            ("ip_a", "10.0.0.1"),
            ("hostname_a", "fw-1"),
            ("intf_a", "eth0"),
            ("type_a", "firewall"),
            ("ip_b", "10.0.0.2"),
            ("hostname_b", "sw-2"),
            ("intf_b", "eth1"),
            ("in_speed", "5"),
            ("out_speed", "5"),
            ("capacity", "10"),
        ])];
        let (snapshot, errors) = rows_to_snapshot(&rows);
        assert!(errors.is_empty());
        assert_eq!(snapshot.devices.len(), 2);
        assert_eq!(snapshot.links.len(), 1);
        assert_eq!(snapshot.links[0].inbound, 5.0);
        assert_eq!(snapshot.devices[0].group.as_deref(), Some("dmz"));
    }

    #[test]
    fn core_gateway_address_always_maps_to_core() {
        assert_eq!(
            assign_group("random name", "10.99.18.253", DeviceKind::Isp),
            Some("core")
        );
        assert_eq!(
            assign_group("whatever", "10.99.18.254", DeviceKind::Server),
            Some("core")
        );
    }

    #[test]
    fn isp_devices_are_never_grouped() {
        assert_eq!(assign_group("SOME DMZ HOST", "10.1.1.1", DeviceKind::Isp), None);
    }

    #[test]
    fn keyword_scan_uses_whole_words() {
        assert_eq!(
            assign_group("lhr-core-sw01", "10.1.1.1", DeviceKind::Switch),
            Some("core")
        );
        assert_eq!(
            assign_group("dmz fw east", "10.1.1.2", DeviceKind::Switch),
            Some("dmz")
        );
        // "INTERIOR" must not match " INT "
        assert_eq!(
            assign_group("interior switch", "10.1.1.3", DeviceKind::Switch),
            None
        );
    }

    #[test]
    fn kind_fallback_groups_perimeter_devices() {
        assert_eq!(assign_group("x", "10.1.1.1", DeviceKind::Firewall), Some("dmz"));
        assert_eq!(assign_group("x", "10.1.1.1", DeviceKind::Ips), Some("dmz"));
        assert_eq!(assign_group("x", "10.1.1.1", DeviceKind::Proxy), Some("dmz"));
        assert_eq!(assign_group("x", "10.1.1.1", DeviceKind::Server), None);
    }

    #[test]
    fn malformed_snapshot_is_a_structured_error() {
        let err = parse_snapshot("{not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Malformed(_)));
    }

    #[test]
    fn snapshot_fields_all_default() {
        let snapshot = parse_snapshot("{}").unwrap();
        assert!(snapshot.devices.is_empty());
        assert!(snapshot.positions.is_empty());
    }
}
