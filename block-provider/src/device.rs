//! Status model shared by all providers.

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// Device information as reported by "dmsetup info".
/// dmsetup(8) provides more information on each of these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub block_device_name: String,
    pub table_live: bool,
    pub table_inactive: bool,
    pub suspended: bool,
    pub read_only: bool,
    pub major: u32,
    pub minor: u32,
    /// Open reference count.
    pub open_count: u32,
    /// Number of targets in the live table.
    pub target_count: u32,
    /// Last event sequence number (used by wait).
    pub event_number: u32,
}

impl DeviceInfo {
    /// Set the table state flags from a dmsetup attribute string such as
    /// "L--w". Each flag is looked up on its own, unknown characters are
    /// ignored.
    pub fn set_attributes(&mut self, attr: &str) {
        self.suspended = attr.contains('s');
        self.read_only = attr.contains('r');
        self.table_live = attr.contains('L');
        self.table_inactive = attr.contains('I');
    }
}

/// Status of a mapped device, only used to derive usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub offset: i64,
    pub length: i64,
    pub target: String,
    pub params: Vec<String>,
}

/// Options for removing a device (see "dmsetup remove").
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
pub enum DeactivateOpt {
    /// Replace the table with one that fails all I/O if the open device
    /// can't be removed.
    #[strum(serialize = "--force")]
    Force,
    /// Retry the removal for a few seconds before failing.
    #[strum(serialize = "--retry")]
    Retry,
    /// Remove an open device once its last user closes it.
    #[strum(serialize = "--deferred")]
    Deferred,
}

/// A value returned by a provider, tagged with how much of it reflects the
/// actual state of the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fidelity", content = "value", rename_all = "lowercase")]
pub enum Reported<T> {
    /// Queried from the backend.
    Live(T),
    /// Only partly queried, the remaining fields are defaults.
    Partial(T),
    /// A fixed stand-in, nothing was queried.
    Placeholder(T),
}

impl<T> Reported<T> {
    /// The value, whatever its fidelity.
    pub fn into_inner(self) -> T {
        match self {
            Reported::Live(value)
            | Reported::Partial(value)
            | Reported::Placeholder(value) => value,
        }
    }

    /// The value if it was fully queried from the backend.
    pub fn live(self) -> Option<T> {
        match self {
            Reported::Live(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Reported::Placeholder(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn attributes_map_independently() {
        let mut info = DeviceInfo::default();
        info.set_attributes("L--w");
        assert!(info.table_live);
        assert!(!info.table_inactive);
        assert!(!info.suspended);
        assert!(!info.read_only);

        info.set_attributes("-Isr");
        assert!(!info.table_live);
        assert!(info.table_inactive);
        assert!(info.suspended);
        assert!(info.read_only);

        info.set_attributes("xyz-");
        assert_eq!(info, DeviceInfo::default());
    }

    #[test]
    fn deactivate_flags() {
        assert_eq!(DeactivateOpt::Force.as_ref(), "--force");
        assert_eq!(DeactivateOpt::Retry.as_ref(), "--retry");
        assert_eq!(DeactivateOpt::Deferred.to_string(), "--deferred");
        assert_eq!(
            DeactivateOpt::from_str("--deferred").unwrap(),
            DeactivateOpt::Deferred
        );
    }

    #[test]
    fn reported_fidelity() {
        assert_eq!(Reported::Live(3).live(), Some(3));
        assert_eq!(Reported::Partial(3).live(), None);
        assert!(Reported::Placeholder(3).is_placeholder());
        assert_eq!(Reported::Placeholder("x").into_inner(), "x");
    }
}
