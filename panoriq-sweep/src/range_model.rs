use log::debug;
use panoriq_messages::{DeviceBounds, FrequencyRange, FrequencyUnits, Hertz};

/// The configured scan range and the device limits it must respect.
#[derive(Debug, Clone)]
pub struct FrequencyRangeModel {
    bounds: Option<DeviceBounds>,
    range: FrequencyRange,
    full_range: bool,
}

impl FrequencyRangeModel {
    pub fn new(range: FrequencyRange, full_range: bool) -> Self {
        Self {
            bounds: None,
            range,
            full_range,
        }
    }

    pub fn range(&self) -> FrequencyRange {
        self.range
    }

    pub fn device_bounds(&self) -> Option<DeviceBounds> {
        self.bounds
    }

    /// Device limits with the LNB offset applied, if a device is known.
    pub fn effective_bounds(&self) -> Option<FrequencyRange> {
        self.bounds.map(|bounds| bounds.effective())
    }

    pub fn is_full_range(&self) -> bool {
        self.full_range
    }

    /// Units to label the frequency axis with.
    pub fn units(&self) -> FrequencyUnits {
        FrequencyUnits::for_frequency(self.range.max())
    }

    /// Install new device limits and bring the range back inside them.
    pub fn set_device_bounds(&mut self, bounds: DeviceBounds) -> FrequencyRange {
        let effective = bounds.effective();
        self.bounds = Some(bounds);

        let clamped = self.range.clamp_to(&effective);
        self.range = if self.full_range || clamped.is_degenerate() {
            effective
        } else {
            clamped
        };

        debug!("Device bounds now {effective}, range {}", self.range);
        self.range
    }

    /// Set the scan range. Ignored while full-range mode is on.
    pub fn set_range(&mut self, min: Hertz, max: Hertz) -> FrequencyRange {
        if self.full_range {
            debug!("Ignoring range edit while in full-range mode");
            return self.range;
        }

        let requested = FrequencyRange::new(min, max);
        self.range = match self.effective_bounds() {
            Some(effective) => requested.clamp_to(&effective),
            None => requested,
        };
        self.range
    }

    pub fn set_full_range(&mut self, enabled: bool) -> FrequencyRange {
        self.full_range = enabled;
        if enabled {
            if let Some(effective) = self.effective_bounds() {
                self.range = effective;
            }
        }
        self.range
    }
}
