//! udev hotplug monitoring and membership reconciliation
//!
//! The monitor socket yields kernel uevents; a cheap relevance check keeps
//! unrelated device churn from triggering full HID rescans. On a relevant
//! event the daemon rediscovers targets and diffs them into each group
//! here.

use tokio_udev::{AsyncMonitorSocket, MonitorBuilder};
use tracing::{debug, info};

use qmk_via::{Channel, Target};

use crate::devices::category_of;
use crate::group::Group;

/// Open the kernel uevent monitor, filtered to the HID subsystems.
pub fn monitor() -> std::io::Result<AsyncMonitorSocket> {
    let socket = MonitorBuilder::new()?
        .match_subsystem("hid")?
        .match_subsystem("hidraw")?
        .listen()?;
    AsyncMonitorSocket::new(socket)
}

/// Cheap filter before a rescan: the event must reference a HID subsystem
/// or carry a HID identifier property.
pub fn is_hid_related(subsystem: Option<&str>, hid_id: Option<&str>) -> bool {
    matches!(subsystem, Some("hid") | Some("hidraw")) || hid_id.is_some()
}

/// Diff freshly discovered targets against a group's membership. Returns
/// whether anything changed.
///
/// Added modules get the group's current level applied *before* insertion
/// so new hardware never comes up out of sync; removed modules are simply
/// dropped (they are gone, no hardware action is possible). Neither
/// partition is an error.
pub fn reconcile(group: &mut Group, discovered: &[Target], chan: &dyn Channel) -> bool {
    let routed: Vec<Target> = discovered
        .iter()
        .filter(|t| group.routes(category_of(t.pid)))
        .cloned()
        .collect();

    let added: Vec<Target> = routed
        .iter()
        .filter(|t| !group.members().contains(t))
        .cloned()
        .collect();
    let removed: Vec<Target> = group
        .members()
        .iter()
        .filter(|t| !routed.contains(t))
        .cloned()
        .collect();

    if added.is_empty() && removed.is_empty() {
        return false;
    }

    let pct = group.last_level().hardware_percent();
    for target in &added {
        info!("{}: module connected: {target}", group.name());
        if let Err(e) = chan.set_percent(target, pct) {
            debug!("{}: sync of new module {target} failed: {e}", group.name());
        }
    }
    for target in &removed {
        info!("{}: module removed: {target}", group.name());
    }

    group.set_members(routed);
    true
}
