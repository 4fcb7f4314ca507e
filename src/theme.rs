use serde::{Deserialize, Serialize};

use crate::model::DeviceStatus;
use crate::registry::Severity;

const GROUP_PALETTE: [&str; 12] = [
    "hsl(210, 70%, 55%)",
    "hsl(30, 80%, 55%)",
    "hsl(150, 60%, 45%)",
    "hsl(270, 60%, 60%)",
    "hsl(0, 70%, 58%)",
    "hsl(180, 55%, 45%)",
    "hsl(60, 70%, 48%)",
    "hsl(330, 65%, 58%)",
    "hsl(100, 55%, 45%)",
    "hsl(240, 60%, 62%)",
    "hsl(20, 65%, 50%)",
    "hsl(300, 50%, 55%)",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub severity_down: String,
    pub severity_critical: String,
    pub severity_warning: String,
    pub severity_normal: String,
    pub severity_good: String,
    pub status_on: String,
    pub status_off: String,
    pub status_transitioning: String,
    pub group_palette: Vec<String>,
    pub background: String,
}

impl Theme {
    pub fn standard() -> Self {
        Self {
            severity_down: "#ff0000".to_string(),
            severity_critical: "#ff4757".to_string(),
            severity_warning: "#ffa502".to_string(),
            severity_normal: "#ffdd59".to_string(),
            severity_good: "#2ed573".to_string(),
            status_on: "#2ed573".to_string(),
            status_off: "#747d8c".to_string(),
            status_transitioning: "#70a1ff".to_string(),
            group_palette: GROUP_PALETTE.iter().map(|value| value.to_string()).collect(),
            background: "#ffffff".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            severity_down: "#ff5252".to_string(),
            severity_critical: "#ff6b81".to_string(),
            severity_warning: "#ffb142".to_string(),
            severity_normal: "#fffa65".to_string(),
            severity_good: "#7bed9f".to_string(),
            status_on: "#7bed9f".to_string(),
            status_off: "#57606f".to_string(),
            status_transitioning: "#70a1ff".to_string(),
            group_palette: GROUP_PALETTE.iter().map(|value| value.to_string()).collect(),
            background: "#1e272e".to_string(),
        }
    }

    pub fn severity_color(&self, severity: Severity) -> &str {
        match severity {
            Severity::Down => &self.severity_down,
            Severity::Critical => &self.severity_critical,
            Severity::Warning => &self.severity_warning,
            Severity::Normal => &self.severity_normal,
            Severity::Good => &self.severity_good,
        }
    }

    pub fn status_color(&self, status: DeviceStatus) -> &str {
        match status {
            DeviceStatus::On => &self.status_on,
            DeviceStatus::Off => &self.status_off,
        }
    }

    /// Deterministic color for an arbitrary group name: the same name
    /// always picks the same palette slot, across sessions.
    pub fn group_color(&self, name: &str) -> &str {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in name.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        let idx = (hash % self.group_palette.len() as u64) as usize;
        &self.group_palette[idx]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_color_is_deterministic() {
        let theme = Theme::standard();
        assert_eq!(theme.group_color("lab-east"), theme.group_color("lab-east"));
    }

    #[test]
    fn severity_colors_are_distinct() {
        let theme = Theme::standard();
        assert_ne!(
            theme.severity_color(Severity::Critical),
            theme.severity_color(Severity::Good)
        );
        assert_eq!(theme.severity_color(Severity::Down), "#ff0000");
    }
}
