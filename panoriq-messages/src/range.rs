use crate::Hertz;

/// A closed frequency interval `[min, max]`.
///
/// Always normalized: constructing one with `min > max` swaps the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrequencyRange {
    min: Hertz,
    max: Hertz,
}

impl FrequencyRange {
    pub fn new(a: Hertz, b: Hertz) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Window of `width` Hz around `center`. The width is kept exact for odd values.
    pub fn centered(center: Hertz, width: Hertz) -> Self {
        let min = center - width.half();
        Self::new(min, min + width)
    }

    pub const fn min(&self) -> Hertz {
        self.min
    }

    pub const fn max(&self) -> Hertz {
        self.max
    }

    pub fn width(&self) -> Hertz {
        self.max - self.min
    }

    pub fn center(&self) -> Hertz {
        Hertz(((self.min.0 as i128 + self.max.0 as i128) / 2) as i64)
    }

    pub fn contains(&self, freq: Hertz) -> bool {
        self.min <= freq && freq <= self.max
    }

    /// Narrower than one Hertz.
    pub fn is_degenerate(&self) -> bool {
        self.width() < Hertz(1)
    }

    /// Clamp both bounds into `bounds`.
    pub fn clamp_to(&self, bounds: &FrequencyRange) -> Self {
        Self::new(
            self.min.clamp(bounds.min, bounds.max),
            self.max.clamp(bounds.min, bounds.max),
        )
    }
}

impl std::fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min.0, self.max.0)
    }
}

/// Tuning limits reported by a device, plus the LNB offset in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBounds {
    pub min_freq: Hertz,
    pub max_freq: Hertz,
    pub lnb_offset: Hertz,
}

impl DeviceBounds {
    pub fn new(min_freq: Hertz, max_freq: Hertz) -> Self {
        Self {
            min_freq,
            max_freq,
            lnb_offset: Hertz::ZERO,
        }
    }

    pub fn with_lnb(mut self, lnb_offset: Hertz) -> Self {
        self.lnb_offset = lnb_offset;
        self
    }

    /// Device limits as seen after the downconverter.
    pub fn effective(&self) -> FrequencyRange {
        FrequencyRange::new(
            self.min_freq.saturating_add(self.lnb_offset),
            self.max_freq.saturating_add(self.lnb_offset),
        )
    }
}

/// How the receiver covers the requested window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionMode {
    /// Center frequency is retuned across the window; bandwidth equals its width.
    #[default]
    Sweep,
    /// Center frequency is held; bandwidth equals the minimum zoom bandwidth.
    FixedFrequency,
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sweep => f.write_str("sweep"),
            Self::FixedFrequency => f.write_str("fixed-frequency"),
        }
    }
}
