//! Desktop notification fan-out
//!
//! Two independent sinks learn about level changes: systemd-logind on the
//! system bus (enumerate sessions, set the LED through each) and the power
//! management service on every user session bus found under /run/user.
//! Each unit runs as its own detached task, so a hung or absent endpoint
//! degrades to a logged no-op and never stalls the event loop or the
//! other units.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zbus::zvariant::OwnedObjectPath;

use crate::level::Level;

const POWERDEVIL_SERVICE: &str = "org.kde.Solid.PowerManagement";
const POWERDEVIL_PATH: &str = "/org/kde/Solid/PowerManagement/Actions/KeyboardBrightnessControl";
const POWERDEVIL_IFACE: &str = "org.kde.Solid.PowerManagement.Actions.KeyboardBrightnessControl";

#[derive(Debug, Clone)]
pub struct Notifier {
    led_name: String,
    max_brightness: u32,
}

impl Notifier {
    pub fn new(led_name: &str, max_brightness: u32) -> Self {
        Self {
            led_name: led_name.to_string(),
            max_brightness,
        }
    }

    /// Fan a new level out to every consumer. Fire-and-forget: the caller
    /// only pays for spawning the tasks.
    pub fn notify(&self, level: Level) {
        let value = level.ui_value(self.max_brightness);

        let led = self.led_name.clone();
        tokio::spawn(async move {
            if let Err(e) = notify_logind(&led, value).await {
                warn!("logind notification failed: {e}");
            }
        });

        for (uid, bus) in session_buses() {
            tokio::spawn(async move {
                if let Err(e) = notify_session(&bus, value as i32).await {
                    debug!("session {uid} notification failed: {e}");
                }
            });
        }
    }
}

/// Tell logind about the new level: enumerate the registered sessions and
/// set the LED brightness through each one.
async fn notify_logind(led: &str, value: u32) -> zbus::Result<()> {
    let conn = zbus::Connection::system().await?;
    let manager = zbus::Proxy::new(
        &conn,
        "org.freedesktop.login1",
        "/org/freedesktop/login1",
        "org.freedesktop.login1.Manager",
    )
    .await?;

    let sessions: Vec<(String, u32, String, String, OwnedObjectPath)> =
        manager.call("ListSessions", &()).await?;

    for (id, _uid, _user, _seat, path) in sessions {
        let session = zbus::Proxy::new(
            &conn,
            "org.freedesktop.login1",
            path,
            "org.freedesktop.login1.Session",
        )
        .await?;
        if let Err(e) = session
            .call::<_, _, ()>("SetBrightness", &("leds", led, value))
            .await
        {
            debug!("SetBrightness rejected for session {id}: {e}");
        }
    }
    Ok(())
}

/// Tell one desktop session's power management about the new level.
async fn notify_session(bus: &Path, value: i32) -> zbus::Result<()> {
    let conn = zbus::connection::Builder::address(bus_address(bus).as_str())?
        .build()
        .await?;
    let proxy = zbus::Proxy::new(&conn, POWERDEVIL_SERVICE, POWERDEVIL_PATH, POWERDEVIL_IFACE)
        .await?;
    proxy
        .call::<_, _, ()>("setKeyboardBrightnessSilent", &(value,))
        .await?;
    Ok(())
}

/// Active user session buses, found by socket presence under /run/user.
fn session_buses() -> Vec<(u32, PathBuf)> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir("/run/user") else {
        return found;
    };
    for entry in entries.flatten() {
        let Some(uid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let bus = entry.path().join("bus");
        if bus.exists() {
            found.push((uid, bus));
        }
    }
    found
}

fn bus_address(path: &Path) -> String {
    format!("unix:path={}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_address_format() {
        assert_eq!(
            bus_address(Path::new("/run/user/1000/bus")),
            "unix:path=/run/user/1000/bus"
        );
    }
}
