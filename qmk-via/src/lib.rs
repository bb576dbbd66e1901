//! Raw HID transport for QMK via-protocol backlight control.
//!
//! Framework 16 input modules run QMK firmware and expose the via raw-HID
//! endpoint (usage page 0xFF60, usage 0x61). This crate covers the two
//! things a backlight bridge needs from it: discovering which modules are
//! plugged in and reading/writing their brightness.

pub mod channel;
pub mod discovery;
pub mod error;
pub mod protocol;

pub use channel::{Channel, ViaChannel, READ_TIMEOUT_MS};
pub use discovery::{discover, DeviceSelector, Target, MAX_TARGETS};
pub use error::ChannelError;
