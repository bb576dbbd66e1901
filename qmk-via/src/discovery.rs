//! Module discovery
//!
//! Enumerates HID nodes, keeps the ones that match a configured
//! vendor/product pair *and* expose the via raw endpoint, and returns them
//! as [`Target`]s. Absent devices are skipped silently; that is the normal
//! state for unpopulated deck slots, not an error.

use std::ffi::CString;
use std::fmt;

use hidapi::HidApi;
use tracing::{debug, warn};

use crate::protocol;

/// Upper bound on simultaneously tracked targets.
pub const MAX_TARGETS: usize = 16;

/// One physical backlight-capable module.
///
/// Equality is on (vid, pid) only: the hidraw path can change across
/// reconnects while it is still the same module.
#[derive(Debug, Clone)]
pub struct Target {
    pub vid: u16,
    pub pid: u16,
    /// hidraw node of the via endpoint
    pub path: CString,
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.vid == other.vid && self.pid == other.pid
    }
}

impl Eq for Target {}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vid, self.pid)
    }
}

/// A vendor id plus the priority-ordered product ids to probe for it.
#[derive(Debug, Clone)]
pub struct DeviceSelector {
    pub vid: u16,
    pub pids: Vec<u16>,
}

/// Report-descriptor marker check for the via raw endpoint.
pub fn is_via_interface(usage_page: u16, usage: u16) -> bool {
    usage_page == protocol::USAGE_PAGE && usage == protocol::USAGE
}

/// Scan for live targets matching the selectors.
///
/// Result order follows selector/probe order. Duplicate (vid, pid) pairs
/// are dropped, and targets beyond [`MAX_TARGETS`] are ignored with a
/// warning.
pub fn discover(api: &HidApi, selectors: &[DeviceSelector]) -> Vec<Target> {
    let mut found: Vec<Target> = Vec::new();

    for selector in selectors {
        for &pid in &selector.pids {
            let Some(info) = api.device_list().find(|d| {
                d.vendor_id() == selector.vid
                    && d.product_id() == pid
                    && is_via_interface(d.usage_page(), d.usage())
            }) else {
                continue;
            };

            let target = Target {
                vid: selector.vid,
                pid,
                path: info.path().to_owned(),
            };
            if found.contains(&target) {
                continue;
            }
            if found.len() >= MAX_TARGETS {
                warn!("target capacity ({MAX_TARGETS}) reached, ignoring {target}");
                continue;
            }

            debug!("found via endpoint {target} at {:?}", target.path);
            found.push(target);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(vid: u16, pid: u16, path: &str) -> Target {
        Target {
            vid,
            pid,
            path: CString::new(path).unwrap(),
        }
    }

    #[test]
    fn equality_ignores_path() {
        let a = target(0x32ac, 0x0012, "/dev/hidraw0");
        let b = target(0x32ac, 0x0012, "/dev/hidraw5");
        assert_eq!(a, b);
        assert_ne!(a, target(0x32ac, 0x0014, "/dev/hidraw0"));
    }

    #[test]
    fn via_marker() {
        assert!(is_via_interface(0xFF60, 0x61));
        assert!(!is_via_interface(0xFF60, 0x62));
        assert!(!is_via_interface(0x0001, 0x06)); // plain keyboard endpoint
    }
}
