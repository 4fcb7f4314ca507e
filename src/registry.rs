//! Connection registry: canonical link identities and the take-the-maximum
//! merge policy for repeated observations of the same physical connection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Down,
    Critical,
    Warning,
    Normal,
    Good,
}

impl Severity {
    /// Classifies a link from its merged fields. The ladder is evaluated
    /// top-down: a link at exactly 90% is Critical, not Warning.
    pub fn classify(inbound: f64, capacity: f64, utilization: f64) -> Self {
        if capacity <= 0.0 || inbound <= 0.0 {
            Self::Down
        } else if utilization >= 90.0 {
            Self::Critical
        } else if utilization >= 70.0 {
            Self::Warning
        } else if utilization >= 50.0 {
            Self::Normal
        } else {
            Self::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Normal => "normal",
            Self::Good => "good",
        }
    }
}

fn clean_interface(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Canonical, order-independent identity for a pair of (device, interface)
/// endpoints. With interface information on both sides the identity is two
/// `device:IFACE` tokens, lexicographically sorted; if either interface is
/// blank, identity collapses to the sorted device pair so that repeated
/// interface-less rows between the same two devices dedupe to one link.
pub fn canonical_link_id(
    device_a: &str,
    interface_a: &str,
    device_b: &str,
    interface_b: &str,
) -> String {
    let iface_a = clean_interface(interface_a);
    let iface_b = clean_interface(interface_b);
    if iface_a.is_empty() || iface_b.is_empty() {
        let (lo, hi) = if device_a <= device_b {
            (device_a, device_b)
        } else {
            (device_b, device_a)
        };
        return format!("{lo}#{hi}");
    }
    let mut tokens = [
        format!("{device_a}:{iface_a}"),
        format!("{device_b}:{iface_b}"),
    ];
    tokens.sort();
    format!("{}#{}", tokens[0], tokens[1])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: String,
    pub device_a: String,
    pub device_b: String,
    pub interface_a: String,
    pub interface_b: String,
    /// Observed throughput and nominal capacity, all in the same unit.
    pub inbound: f64,
    pub outbound: f64,
    pub capacity: f64,
    /// Derived: inbound over capacity, in percent. 0 when capacity is 0.
    pub utilization: f64,
    pub severity: Severity,
    pub note: String,
}

impl LinkRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device_a: &str,
        interface_a: &str,
        device_b: &str,
        interface_b: &str,
        inbound: f64,
        outbound: f64,
        capacity: f64,
        note: &str,
    ) -> Self {
        let mut record = Self {
            id: canonical_link_id(device_a, interface_a, device_b, interface_b),
            device_a: device_a.to_string(),
            device_b: device_b.to_string(),
            interface_a: clean_interface(interface_a),
            interface_b: clean_interface(interface_b),
            inbound,
            outbound,
            capacity,
            utilization: 0.0,
            severity: Severity::Down,
            note: note.to_string(),
        };
        record.refresh();
        record
    }

    fn refresh(&mut self) {
        self.utilization = if self.capacity > 0.0 {
            self.inbound / self.capacity * 100.0
        } else {
            0.0
        };
        self.severity = Severity::classify(self.inbound, self.capacity, self.utilization);
    }

    /// Merges a duplicate observation: every numeric field becomes the max
    /// of the existing and incoming values, then utilization and severity
    /// are recomputed from the merged fields.
    pub fn merge(&mut self, incoming: &LinkRecord) {
        self.inbound = self.inbound.max(incoming.inbound);
        self.outbound = self.outbound.max(incoming.outbound);
        self.capacity = self.capacity.max(incoming.capacity);
        if !incoming.note.is_empty() {
            self.note = incoming.note.clone();
        }
        self.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_is_commutative() {
        let forward = canonical_link_id("10.0.0.1", "eth0", "10.0.0.2", "eth1");
        let reverse = canonical_link_id("10.0.0.2", "eth1", "10.0.0.1", "eth0");
        assert_eq!(forward, reverse);
    }

    #[test]
    fn canonical_id_upper_cases_and_trims_interfaces() {
        let a = canonical_link_id("10.0.0.1", " eth0 ", "10.0.0.2", "ETH1");
        let b = canonical_link_id("10.0.0.1", "ETH0", "10.0.0.2", " eth1");
        assert_eq!(a, b);
    }

    #[test]
    fn blank_interface_collapses_to_device_pair() {
        let a = canonical_link_id("10.0.0.2", "", "10.0.0.1", "eth9");
        let b = canonical_link_id("10.0.0.1", "eth3", "10.0.0.2", "  ");
        assert_eq!(a, b);
        assert_eq!(a, "10.0.0.1#10.0.0.2");
    }

    #[test]
    fn merge_is_idempotent() {
        let mut link = LinkRecord::new("a", "e0", "b", "e1", 5.0, 5.0, 10.0, "trunk");
        let copy = link.clone();
        link.merge(&copy);
        assert_eq!(link.inbound, copy.inbound);
        assert_eq!(link.outbound, copy.outbound);
        assert_eq!(link.capacity, copy.capacity);
        assert_eq!(link.utilization, copy.utilization);
        assert_eq!(link.severity, copy.severity);
    }

    #[test]
    fn merge_is_monotone_per_field() {
        let mut link = LinkRecord::new("a", "e0", "b", "e1", 5.0, 5.0, 10.0, "");
        let incoming = LinkRecord::new("b", "e1", "a", "e0", 8.0, 3.0, 10.0, "");
        link.merge(&incoming);
        assert_eq!(link.inbound, 8.0);
        assert_eq!(link.outbound, 5.0);
        assert_eq!(link.capacity, 10.0);
        assert_eq!(link.utilization, 80.0);
        assert_eq!(link.severity, Severity::Warning);
    }

    #[test]
    fn severity_ladder_boundaries() {
        assert_eq!(Severity::classify(9.0, 10.0, 90.0), Severity::Critical);
        assert_eq!(Severity::classify(7.0, 10.0, 70.0), Severity::Warning);
        assert_eq!(Severity::classify(5.0, 10.0, 50.0), Severity::Normal);
        assert_eq!(Severity::classify(4.99, 10.0, 49.9), Severity::Good);
    }

    #[test]
    fn zero_capacity_or_inbound_classifies_down() {
        assert_eq!(Severity::classify(5.0, 0.0, 0.0), Severity::Down);
        assert_eq!(Severity::classify(0.0, 10.0, 0.0), Severity::Down);
    }

    #[test]
    fn utilization_zero_when_capacity_zero() {
        let link = LinkRecord::new("a", "e0", "b", "e1", 5.0, 5.0, 0.0, "");
        assert_eq!(link.utilization, 0.0);
        assert_eq!(link.severity, Severity::Down);
    }
}
