//! Capability - Which fields exist on which FortiOS firmware
//!
//! Fields come and go between FortiOS releases. A device that predates a
//! field simply omits it from its responses. The capability table records
//! those ranges explicitly so the reconciler can tell "the device dropped this
//! setting" from "this device has never heard of it".

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// FortiOS firmware version (e.g., v7.2.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FirmwareVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid firmware version '{0}'")]
pub struct VersionParseError(pub String);

impl FromStr for FirmwareVersion {
    type Err = VersionParseError;

    /// Accepts "7.2.5", "v7.2.5" and "7.2" (patch defaults to 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(VersionParseError(s.to_string()));
        }
        let parse = |p: &str| p.parse::<u32>().map_err(|_| VersionParseError(s.to_string()));
        Ok(Self {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: match parts.get(2) {
                Some(p) => parse(p)?,
                None => 0,
            },
        })
    }
}

/// Firmware range a field exists in; `until` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionRange {
    pub since: Option<FirmwareVersion>,
    pub until: Option<FirmwareVersion>,
}

impl VersionRange {
    pub fn since(version: FirmwareVersion) -> Self {
        Self {
            since: Some(version),
            until: None,
        }
    }

    pub fn until(version: FirmwareVersion) -> Self {
        Self {
            since: None,
            until: Some(version),
        }
    }

    pub fn between(since: FirmwareVersion, until: FirmwareVersion) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
        }
    }

    pub fn contains(&self, version: FirmwareVersion) -> bool {
        self.since.is_none_or(|s| version >= s) && self.until.is_none_or(|u| version < u)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.since, self.until) {
            (Some(s), Some(u)) => write!(f, ">= {}, < {}", s, u),
            (Some(s), None) => write!(f, ">= {}", s),
            (None, Some(u)) => write!(f, "< {}", u),
            (None, None) => write!(f, "any"),
        }
    }
}

/// Versioned field capability table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    device: Option<FirmwareVersion>,
    fields: HashMap<(String, String), VersionRange>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_version(mut self, version: FirmwareVersion) -> Self {
        self.device = Some(version);
        self
    }

    pub fn set_device_version(&mut self, version: Option<FirmwareVersion>) {
        self.device = version;
    }

    pub fn device_version(&self) -> Option<FirmwareVersion> {
        self.device
    }

    /// Record the firmware range a field of a resource type exists in
    pub fn field(
        mut self,
        resource_type: impl Into<String>,
        field: impl Into<String>,
        range: VersionRange,
    ) -> Self {
        self.fields
            .insert((resource_type.into(), field.into()), range);
        self
    }

    pub fn range(&self, resource_type: &str, field: &str) -> Option<VersionRange> {
        self.fields
            .get(&(resource_type.to_string(), field.to_string()))
            .copied()
    }

    /// Every recorded (resource type, field, range) entry
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, VersionRange)> {
        self.fields
            .iter()
            .map(|((resource_type, field), range)| (resource_type.as_str(), field.as_str(), *range))
    }

    /// Whether the device supports a field.
    ///
    /// Unknown device version or a field without an entry counts as supported.
    pub fn supports(&self, resource_type: &str, field: &str) -> bool {
        match (self.device, self.range(resource_type, field)) {
            (Some(device), Some(range)) => range.contains(device),
            _ => true,
        }
    }
}
