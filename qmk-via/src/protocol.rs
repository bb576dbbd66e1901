//! Via protocol constants and request framing
//!
//! The via raw endpoint exchanges fixed 32-byte reports. Writes carry a
//! leading report id byte (0x00), so a request on the wire is 33 bytes:
//!
//! ```text
//! write: [0x00, command, channel, value_id, value, zero padding ...]
//! read:  [command, channel, value_id, value, zero padding ...]
//! ```
//!
//! A response is valid iff its first byte echoes the command sent.

/// Size of one via report (response)
pub const REPORT_SIZE: usize = 32;
/// Size of one request: report id prefix + report
pub const REQUEST_SIZE: usize = REPORT_SIZE + 1;

/// Usage page of the via raw endpoint, as seen in the report descriptor
pub const USAGE_PAGE: u16 = 0xFF60;
/// Usage of the via raw endpoint
pub const USAGE: u16 = 0x61;

/// Via commands
pub mod cmd {
    /// Write a lighting value
    pub const CUSTOM_SET_VALUE: u8 = 0x07;
    /// Read a lighting value
    pub const CUSTOM_GET_VALUE: u8 = 0x08;
}

/// Via lighting channels
pub mod channel {
    /// Monochrome backlight (the keyboards and numpad)
    pub const BACKLIGHT: u8 = 0x01;
    /// RGB matrix (the RGB macropad)
    pub const RGB_MATRIX: u8 = 0x03;
}

/// Value ids within a lighting channel
pub mod value {
    pub const BRIGHTNESS: u8 = 0x01;
}

/// Build one request frame, report id included.
pub fn build_request(cmd: u8, chan: u8, value_id: u8, val: u8) -> [u8; REQUEST_SIZE] {
    let mut buf = [0u8; REQUEST_SIZE];
    buf[0] = 0x00; // report id
    buf[1] = cmd;
    buf[2] = chan;
    buf[3] = value_id;
    buf[4] = val;
    buf
}

/// Brightness percent (0-100) to the 0-255 wire scale.
pub fn percent_to_wire(pct: u8) -> u8 {
    (u16::from(pct.min(100)) * 255 / 100) as u8
}

/// 0-255 wire brightness back to percent.
pub fn wire_to_percent(raw: u8) -> u8 {
    (u16::from(raw) * 100 / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_layout() {
        let buf = build_request(cmd::CUSTOM_SET_VALUE, channel::BACKLIGHT, value::BRIGHTNESS, 0xA8);
        assert_eq!(buf.len(), 33);
        assert_eq!(buf[0], 0x00);
        assert_eq!(buf[1], 0x07);
        assert_eq!(buf[2], 0x01);
        assert_eq!(buf[3], 0x01);
        assert_eq!(buf[4], 0xA8);
        assert!(buf[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn wire_scale_endpoints() {
        assert_eq!(percent_to_wire(0), 0);
        assert_eq!(percent_to_wire(100), 255);
        // out-of-range percent clamps instead of wrapping
        assert_eq!(percent_to_wire(130), 255);
        assert_eq!(wire_to_percent(0), 0);
        assert_eq!(wire_to_percent(255), 100);
    }

    #[test]
    fn wire_scale_is_monotone() {
        let mut prev = 0;
        for pct in 0..=100u8 {
            let raw = percent_to_wire(pct);
            assert!(raw >= prev);
            prev = raw;
        }
    }
}
