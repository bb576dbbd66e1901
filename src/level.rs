//! Discrete brightness levels
//!
//! The modules step their backlight through four hardware levels. Two
//! scales reference those levels: the virtual LED's UI scale
//! (0..=max_brightness) and the hardware percent scale (0..=100 on the
//! wire). Each conversion is one-directional per event; neither is ever
//! reconstructed by inverting the other's rounding.

use std::fmt;

/// One of the four hardware brightness steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Level(u8);

/// Representative hardware percent per level. Firmware variants disagree
/// on the exact step values (33 vs 35 has been seen in the wild); tune
/// here if a module snaps to the wrong step.
const LEVEL_PERCENT: [u8; 4] = [0, 33, 66, 100];

impl Level {
    pub const OFF: Level = Level(0);
    pub const MAX: Level = Level(3);

    /// Bucket a hardware percent into a level. The bands are contiguous
    /// and cover 0..=100 with no gaps: 0 / 1-33 / 34-66 / 67-100.
    pub fn from_percent(pct: u8) -> Level {
        match pct.min(100) {
            0 => Level(0),
            1..=33 => Level(1),
            34..=66 => Level(2),
            _ => Level(3),
        }
    }

    /// Map a UI-scale raw value (0..=max) to a level: rescale to percent
    /// with integer math, then bucket. A raw of 2 on a max-3 LED lands on
    /// level 2, whatever the bucket boundaries.
    pub fn from_ui(raw: u32, max: u32) -> Level {
        if max == 0 {
            return Level::OFF;
        }
        let pct = u64::from(raw.min(max)) * 100 / u64::from(max);
        Level::from_percent(pct as u8)
    }

    /// Hardware percent sent to modules for this level.
    pub fn hardware_percent(self) -> u8 {
        LEVEL_PERCENT[self.0 as usize]
    }

    /// UI-scale representation on a virtual LED with the given maximum.
    ///
    /// For any max >= 3 this inverts through [`from_ui`](Self::from_ui):
    /// the sysfs echo of our own write decodes back to the same level.
    /// Below 3 the UI scale cannot represent all four levels, which is
    /// why the configuration layer rejects smaller maxima.
    pub fn ui_value(self, max: u32) -> u32 {
        (u64::from(self.0) * u64::from(max) / 3) as u32
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decode a raw uleds read. The kernel's read format varies: both 1-byte
/// and little-endian 4-byte (or longer) reads occur.
pub fn decode_raw(buf: &[u8]) -> u32 {
    match buf.len() {
        1 => u32::from(buf[0]),
        n if n >= 4 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_monotone_and_gap_free() {
        let mut prev = Level::OFF;
        let mut seen = [false; 4];
        for pct in 0..=100u8 {
            let level = Level::from_percent(pct);
            assert!(level >= prev, "level decreased at {pct}%");
            seen[level.index() as usize] = true;
            prev = level;
        }
        assert_eq!(seen, [true; 4], "not every band is reachable");
        assert_eq!(Level::from_percent(0), Level::OFF);
        assert_eq!(Level::from_percent(100), Level::MAX);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(Level::from_percent(1).index(), 1);
        assert_eq!(Level::from_percent(33).index(), 1);
        assert_eq!(Level::from_percent(34).index(), 2);
        assert_eq!(Level::from_percent(66).index(), 2);
        assert_eq!(Level::from_percent(67).index(), 3);
        // over-range input clamps
        assert_eq!(Level::from_percent(250), Level::MAX);
    }

    #[test]
    fn round_trip_is_stable() {
        for level in [Level(0), Level(1), Level(2), Level(3)] {
            let once = Level::from_percent(level.hardware_percent());
            assert_eq!(once, level);
            let twice = Level::from_percent(once.hardware_percent());
            assert_eq!(twice, level, "repeated conversion oscillated");
        }
    }

    #[test]
    fn ui_scale_mapping() {
        // max-3 LED: raw values are the levels themselves
        assert_eq!(Level::from_ui(0, 3).index(), 0);
        assert_eq!(Level::from_ui(1, 3).index(), 1);
        assert_eq!(Level::from_ui(2, 3).index(), 2);
        assert_eq!(Level::from_ui(3, 3).index(), 3);
        // percent-scale LED reproduces the bands
        assert_eq!(Level::from_ui(50, 100).index(), 2);
        assert_eq!(Level::from_ui(100, 100).index(), 3);
        // raw beyond max clamps, degenerate max reads as off
        assert_eq!(Level::from_ui(9, 3), Level::MAX);
        assert_eq!(Level::from_ui(7, 0), Level::OFF);
    }

    #[test]
    fn ui_value_per_scale() {
        assert_eq!(Level::MAX.ui_value(3), 3);
        assert_eq!(Level::from_percent(50).ui_value(3), 2);
        assert_eq!(Level::MAX.ui_value(100), 100);
        assert_eq!(Level::from_percent(20).ui_value(100), 33);
    }

    #[test]
    fn ui_round_trip_per_scale() {
        // the sysfs echo of a written ui_value must decode to the same
        // level, or drift updates would bounce back as a level change
        for max in [3u32, 4, 5, 7, 100, 255, u32::MAX] {
            for level in [Level(0), Level(1), Level(2), Level(3)] {
                assert_eq!(
                    Level::from_ui(level.ui_value(max), max),
                    level,
                    "echo changed level {level} at max {max}"
                );
            }
        }
    }

    #[test]
    fn decode_raw_formats() {
        assert_eq!(decode_raw(&[2]), 2);
        assert_eq!(decode_raw(&[3, 0, 0, 0]), 3);
        assert_eq!(decode_raw(&[0x64, 0, 0, 0, 0, 0, 0, 0]), 100);
        assert_eq!(decode_raw(&[1, 2]), 0); // unknown width
        assert_eq!(decode_raw(&[]), 0);
    }
}
