//! Sensor readings extracted from the serial stream.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One light/distance pair decoded from a `li<digits>di<digits>` tag.
///
/// Light is the raw sensor value (the device reports 0..=1023); distance is in
/// centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reading {
    /// Light intensity.
    pub light: u64,
    /// Distance in centimetres.
    pub distance: u64,
}

impl Reading {
    /// Creates a reading.
    #[must_use]
    pub const fn new(light: u64, distance: u64) -> Self {
        Self { light, distance }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "light={} distance={}cm", self.light, self.distance)
    }
}
