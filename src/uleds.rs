//! Kernel uleds virtual LED
//!
//! Registering writes one fixed-layout record to /dev/uleds (see
//! linux/uleds.h): a 64-byte NUL-padded name followed by a little-endian
//! u32 max_brightness. The fd then yields a read every time userspace
//! writes the LED's brightness file.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::level::decode_raw;

const ULEDS_DEV: &str = "/dev/uleds";
const LED_MAX_NAME_SIZE: usize = 64;

/// One brightness change read from a group's virtual LED.
#[derive(Debug, Clone, Copy)]
pub struct UledsEvent {
    pub group: usize,
    pub raw: u32,
}

/// A registered virtual LED and its sysfs files.
pub struct Uleds {
    name: String,
    // Taken by spawn_reader; dropping it unregisters the LED.
    file: Option<File>,
    sysfs: PathBuf,
}

/// The uleds_user_dev registration record.
fn registration_record(name: &str, max_brightness: u32) -> [u8; LED_MAX_NAME_SIZE + 4] {
    let mut record = [0u8; LED_MAX_NAME_SIZE + 4];
    record[..name.len()].copy_from_slice(name.as_bytes());
    record[LED_MAX_NAME_SIZE..].copy_from_slice(&max_brightness.to_le_bytes());
    record
}

impl Uleds {
    /// Register a new virtual LED. Failure means the uleds facility is
    /// unavailable, which is fatal for the owning group at startup.
    pub async fn create(name: &str, max_brightness: u32) -> Result<Self> {
        ensure!(
            name.len() < LED_MAX_NAME_SIZE,
            "LED name too long: {name}"
        );

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(ULEDS_DEV)
            .await
            .with_context(|| format!("open {ULEDS_DEV} (is the uleds module loaded?)"))?;

        file.write_all(&registration_record(name, max_brightness))
            .await
            .context("register uleds device")?;
        file.flush().await?;

        debug!("registered virtual LED {name} (max_brightness {max_brightness})");
        Ok(Self {
            name: name.to_string(),
            file: Some(file),
            sysfs: PathBuf::from(format!("/sys/class/leds/{name}")),
        })
    }

    /// Spawn the task that reads brightness events off the uleds fd and
    /// forwards them to the daemon loop. Each read blocks until the next
    /// userspace write to the LED.
    pub fn spawn_reader(&mut self, group: usize, tx: mpsc::Sender<UledsEvent>) -> JoinHandle<()> {
        let mut file = self.file.take().expect("uleds reader already spawned");
        let name = self.name.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 8];
            loop {
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let raw = decode_raw(&buf[..n]);
                        if tx.send(UledsEvent { group, raw }).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("uleds read on {name} failed: {e}");
                        break;
                    }
                }
            }
        })
    }

    /// Write the LED's UI-scale brightness file. The kernel echoes this
    /// back as a read event on the uleds fd; the level-equality check in
    /// the group turns that echo into a no-op.
    pub async fn set_ui_value(&self, value: u32) -> Result<()> {
        let path = self.sysfs.join("brightness");
        tokio::fs::write(&path, value.to_string())
            .await
            .with_context(|| format!("write {}", path.display()))
    }

    /// Emit a change uevent so observers (UPower and friends) re-read the
    /// LED after a hardware-initiated change.
    pub async fn notify_changed(&self) -> Result<()> {
        let path = self.sysfs.join("uevent");
        tokio::fs::write(&path, "change")
            .await
            .with_context(|| format!("write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_record_layout() {
        let record = registration_record("framework::kbd_backlight", 3);
        assert_eq!(record.len(), 68);
        assert_eq!(&record[..24], b"framework::kbd_backlight");
        assert!(record[24..LED_MAX_NAME_SIZE].iter().all(|&b| b == 0));
        assert_eq!(record[LED_MAX_NAME_SIZE..], [3, 0, 0, 0]);
    }
}
