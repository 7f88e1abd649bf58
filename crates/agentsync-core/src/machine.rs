//! Stable machine identity used to key per-machine baselines.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the form `<hostname>-<8 hex chars>`
///
/// The suffix is derived from the hostname and primary hardware address, so
/// two hosts sharing a name still get distinct baselines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    /// Wrap an explicit identifier (tests, or a value read from state)
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Detect the identifier for the running host.
    ///
    /// Called once at process start and passed down explicitly.
    #[must_use]
    pub fn detect() -> Self {
        let hostname = sanitize(&gethostname::gethostname().to_string_lossy());
        let mac = hardware_address().unwrap_or(0);
        Self::derive(&hostname, mac)
    }

    fn derive(hostname: &str, mac: u64) -> Self {
        let seed = format!("{hostname}-{mac}");
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_DNS, seed.as_bytes());
        let suffix: String = uuid.simple().to_string().chars().take(8).collect();
        Self(format!("{hostname}-{suffix}"))
    }

    /// Borrow the identifier as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(hostname: &str) -> String {
    let cleaned: String = hostname
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(target_os = "linux")]
fn hardware_address() -> Option<u64> {
    let mut interfaces: Vec<_> = std::fs::read_dir("/sys/class/net")
        .ok()?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_name().to_str() != Some("lo"))
        .map(|entry| entry.path())
        .collect();
    interfaces.sort();

    interfaces.iter().find_map(|iface| {
        let raw = std::fs::read_to_string(iface.join("address")).ok()?;
        parse_mac(raw.trim())
    })
}

#[cfg(not(target_os = "linux"))]
fn hardware_address() -> Option<u64> {
    None
}

fn parse_mac(raw: &str) -> Option<u64> {
    let hex: String = raw.split(':').collect();
    if hex.len() != 12 {
        return None;
    }
    let value = u64::from_str_radix(&hex, 16).ok()?;
    (value != 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_stable() {
        let a = MachineId::derive("laptop", 0x0011_2233_4455);
        let b = MachineId::derive("laptop", 0x0011_2233_4455);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("laptop-"));
        assert_eq!(a.as_str().len(), "laptop-".len() + 8);
    }

    #[test]
    fn test_same_hostname_different_hardware() {
        let a = MachineId::derive("laptop", 1);
        let b = MachineId::derive("laptop", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(parse_mac("00:11:22:33:44:55"), Some(0x0011_2233_4455));
        assert_eq!(parse_mac("00:00:00:00:00:00"), None);
        assert_eq!(parse_mac("garbage"), None);
    }

    #[test]
    fn test_sanitize_hostname() {
        assert_eq!(sanitize("my host/1"), "my_host_1");
        assert_eq!(sanitize(""), "unknown");
    }
}
