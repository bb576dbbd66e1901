//! Channel error types

use thiserror::Error;

/// Errors that can occur talking to a module's via endpoint
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("communication timeout")]
    Timeout,

    #[error("invalid response: expected cmd 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidResponse { expected: u8, actual: u8 },

    #[error("short write: {0} bytes")]
    ShortWrite(usize),

    #[error("HID error: {0}")]
    Hid(String),

    #[error("HID permission denied (is a udev rule granting hidraw access installed?): {0}")]
    PermissionDenied(String),
}

impl From<hidapi::HidError> for ChannelError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            ChannelError::PermissionDenied(msg)
        } else {
            ChannelError::Hid(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_point_at_udev() {
        let e = ChannelError::PermissionDenied("Permission denied".into());
        assert!(e.to_string().contains("udev rule"));
        let e = ChannelError::Hid("device busy".into());
        assert!(!e.to_string().contains("udev rule"));
    }
}
