// CLI definitions using clap

use std::time::Duration;

use clap::{Parser, ValueEnum};

use qmk_via::DeviceSelector;

use crate::devices;
use crate::group::GroupMode;

#[derive(Parser)]
#[command(name = "fw16-kbd-uleds")]
#[command(author, version)]
#[command(about = "Framework 16 keyboard backlight bridge (QMK raw HID <-> kernel uleds)")]
pub struct Cli {
    /// Grouping mode: one unified LED, or one LED per module category
    #[arg(short, long, value_enum, default_value_t = Mode::Unified)]
    pub mode: Mode,

    /// Vendor id to probe, hex (defaults to Framework's 32ac)
    #[arg(long, value_parser = parse_hex_u16)]
    pub vid: Option<u16>,

    /// Probe an explicit vid:pid pair (hex, repeatable) instead of the
    /// built-in module list
    #[arg(long = "device", value_name = "VID:PID", value_parser = parse_device_spec)]
    pub devices: Vec<(u16, u16)>,

    /// Maximum brightness reported by the virtual LED (minimum 3, so
    /// every hardware level stays representable)
    #[arg(short = 'b', long, default_value_t = 3)]
    pub max_brightness: u32,

    /// Hardware poll interval, ms
    #[arg(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Debounce window for UI brightness events, ms (0 disables)
    #[arg(short, long, default_value_t = 180)]
    pub debounce_ms: u64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Discover modules, print them, and exit
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Unified,
    Separate,
}

impl From<Mode> for GroupMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Unified => GroupMode::Unified,
            Mode::Separate => GroupMode::Separate,
        }
    }
}

/// Configuration resolved once at startup and passed by reference into
/// every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: GroupMode,
    pub selectors: Vec<DeviceSelector>,
    pub max_brightness: u32,
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Cli {
    pub fn config(&self) -> Config {
        let selectors = if self.devices.is_empty() {
            vec![DeviceSelector {
                vid: self.vid.unwrap_or(devices::FRAMEWORK_VID),
                pids: devices::probe_pids(),
            }]
        } else {
            selectors_from_overrides(&self.devices)
        };

        Config {
            mode: self.mode.into(),
            selectors,
            // a scale below 3 cannot hold four distinct levels, and the
            // sysfs echo of a collapsed value would read back as a change
            max_brightness: self.max_brightness.max(3),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(100)),
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

/// Group --device overrides by vendor id, preserving the order given.
fn selectors_from_overrides(pairs: &[(u16, u16)]) -> Vec<DeviceSelector> {
    let mut selectors: Vec<DeviceSelector> = Vec::new();
    for &(vid, pid) in pairs {
        match selectors.iter_mut().find(|s| s.vid == vid) {
            Some(sel) => {
                if !sel.pids.contains(&pid) {
                    sel.pids.push(pid);
                }
            }
            None => selectors.push(DeviceSelector {
                vid,
                pids: vec![pid],
            }),
        }
    }
    selectors
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let s = s.trim_start_matches("0x");
    u16::from_str_radix(s, 16).map_err(|e| format!("invalid hex id {s:?}: {e}"))
}

fn parse_device_spec(s: &str) -> Result<(u16, u16), String> {
    let (vid, pid) = s
        .split_once(':')
        .ok_or_else(|| format!("expected VID:PID, got {s:?}"))?;
    Ok((parse_hex_u16(vid)?, parse_hex_u16(pid)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_u16("32ac"), Ok(0x32ac));
        assert_eq!(parse_hex_u16("0x0012"), Ok(0x0012));
        assert!(parse_hex_u16("kbd").is_err());
    }

    #[test]
    fn device_spec_parsing() {
        assert_eq!(parse_device_spec("32ac:0012"), Ok((0x32ac, 0x0012)));
        assert!(parse_device_spec("32ac").is_err());
        assert!(parse_device_spec("32ac:xyz").is_err());
    }

    #[test]
    fn overrides_group_by_vendor() {
        let selectors = selectors_from_overrides(&[
            (0x32ac, 0x0012),
            (0x1234, 0x0001),
            (0x32ac, 0x0014),
            (0x32ac, 0x0012), // duplicate dropped
        ]);
        assert_eq!(selectors.len(), 2);
        assert_eq!(selectors[0].vid, 0x32ac);
        assert_eq!(selectors[0].pids, vec![0x0012, 0x0014]);
        assert_eq!(selectors[1].pids, vec![0x0001]);
    }

    #[test]
    fn small_brightness_scales_are_raised() {
        for given in ["0", "1", "2"] {
            let cli = Cli::parse_from(["fw16-kbd-uleds", "--max-brightness", given]);
            assert_eq!(cli.config().max_brightness, 3);
        }
        let cli = Cli::parse_from(["fw16-kbd-uleds", "--max-brightness", "100"]);
        assert_eq!(cli.config().max_brightness, 100);
    }

    #[test]
    fn defaults_resolve() {
        let cli = Cli::parse_from(["fw16-kbd-uleds"]);
        let config = cli.config();
        assert_eq!(config.mode, GroupMode::Unified);
        assert_eq!(config.max_brightness, 3);
        assert_eq!(config.selectors.len(), 1);
        assert_eq!(config.selectors[0].vid, 0x32ac);
        assert_eq!(config.debounce, Duration::from_millis(180));
    }
}
