//! Brightness channel over the via raw endpoint
//!
//! Handles are opened per call and dropped immediately. Brightness traffic
//! is rare, and short-lived handles mean no stale-descriptor bookkeeping
//! across hotplug cycles.

use hidapi::{HidApi, HidDevice};
use tracing::{debug, trace};

use crate::discovery::Target;
use crate::error::ChannelError;
use crate::protocol::{self, channel, cmd, value, REPORT_SIZE, REQUEST_SIZE};

/// Bounded wait for a module to answer a request (ms).
pub const READ_TIMEOUT_MS: i32 = 200;

/// Brightness set/get against one physical module.
///
/// The seam the group state machine drives hardware through; tests mock it.
pub trait Channel {
    fn set_percent(&self, target: &Target, pct: u8) -> Result<(), ChannelError>;
    fn get_percent(&self, target: &Target) -> Result<u8, ChannelError>;
}

/// Real transport: raw HID writes/reads on the module's hidraw node.
#[derive(Debug, Default)]
pub struct ViaChannel;

impl ViaChannel {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, target: &Target) -> Result<HidDevice, ChannelError> {
        let api = HidApi::new()?;
        // an open failure here usually means the node vanished mid-hotplug
        api.open_path(&target.path)
            .map_err(|e| match ChannelError::from(e) {
                ChannelError::Hid(msg) => ChannelError::DeviceNotFound(msg),
                other => other,
            })
    }

    /// Send one request and validate the echoed command byte.
    fn roundtrip(
        dev: &HidDevice,
        req: &[u8; REQUEST_SIZE],
    ) -> Result<[u8; REPORT_SIZE], ChannelError> {
        let written = dev.write(req)?;
        if written < req.len() {
            return Err(ChannelError::ShortWrite(written));
        }

        let mut resp = [0u8; REPORT_SIZE];
        let read = dev.read_timeout(&mut resp, READ_TIMEOUT_MS)?;
        if read == 0 {
            return Err(ChannelError::Timeout);
        }
        if resp[0] != req[1] {
            return Err(ChannelError::InvalidResponse {
                expected: req[1],
                actual: resp[0],
            });
        }
        Ok(resp)
    }
}

impl Channel for ViaChannel {
    fn set_percent(&self, target: &Target, pct: u8) -> Result<(), ChannelError> {
        let dev = self.open(target)?;
        let raw = protocol::percent_to_wire(pct);
        let mut last = ChannelError::Timeout;

        // Monochrome and RGB-matrix firmwares answer on different lighting
        // channels; either one acknowledging counts as success.
        for chan in [channel::BACKLIGHT, channel::RGB_MATRIX] {
            let req = protocol::build_request(cmd::CUSTOM_SET_VALUE, chan, value::BRIGHTNESS, raw);
            match Self::roundtrip(&dev, &req) {
                Ok(_) => {
                    trace!("set {target} channel {chan:#04x} -> {pct}%");
                    return Ok(());
                }
                Err(e) => {
                    debug!("set {target} channel {chan:#04x} failed: {e}");
                    last = e;
                }
            }
        }
        Err(last)
    }

    fn get_percent(&self, target: &Target) -> Result<u8, ChannelError> {
        let dev = self.open(target)?;
        let mut last = ChannelError::Timeout;

        for chan in [channel::BACKLIGHT, channel::RGB_MATRIX] {
            let req = protocol::build_request(cmd::CUSTOM_GET_VALUE, chan, value::BRIGHTNESS, 0);
            match Self::roundtrip(&dev, &req) {
                Ok(resp) => {
                    let pct = protocol::wire_to_percent(resp[3]);
                    trace!("get {target} channel {chan:#04x} -> {pct}%");
                    return Ok(pct);
                }
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}
