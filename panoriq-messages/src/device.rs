use crate::{DeviceBounds, Hertz};

/// A receiver as described by the device collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Human readable description, also used as the device id in the config
    pub desc: String,
    /// Driver name, e.g. `rtlsdr`
    pub driver: String,
    pub min_freq: Hertz,
    pub max_freq: Hertz,
    pub antennas: Vec<String>,
    pub gains: Vec<GainDescriptor>,
    /// False if the device is known but cannot currently be opened
    pub available: bool,
}

impl Device {
    pub fn bounds(&self, lnb_offset: Hertz) -> DeviceBounds {
        DeviceBounds::new(self.min_freq, self.max_freq).with_lnb(lnb_offset)
    }

    /// Devices without a usable tuning range or that are not available are not offered.
    pub fn is_usable(&self) -> bool {
        self.max_freq > Hertz::ZERO && self.available
    }
}

/// One adjustable gain stage of a device.
#[derive(Debug, Clone, PartialEq)]
pub struct GainDescriptor {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}
