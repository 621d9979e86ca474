use std::ops::{Add, Sub};

/// Frequency in Hertz.
///
/// Signed, since frequencies relative to an LNB or a tuner offset can be negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hertz(pub i64);

impl std::fmt::Display for Hertz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

impl Hertz {
    pub const ZERO: Hertz = Hertz(0);

    pub const fn khz(khz: i64) -> Self {
        Self(khz * 1_000)
    }

    pub const fn mhz(mhz: i64) -> Self {
        Self(mhz * 1_000_000)
    }

    pub const fn ghz(ghz: i64) -> Self {
        Self(ghz * 1_000_000_000)
    }

    pub const fn as_hz(self) -> i64 {
        self.0
    }

    pub const fn saturating_add(self, rhs: Hertz) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub const fn saturating_sub(self, rhs: Hertz) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Half of this frequency, rounded towards zero.
    pub const fn half(self) -> Self {
        Self(self.0 / 2)
    }

    /// Display units suited to this frequency's magnitude.
    pub fn units(self) -> FrequencyUnits {
        FrequencyUnits::for_frequency(self)
    }
}

impl Add for Hertz {
    type Output = Hertz;

    fn add(self, rhs: Hertz) -> Hertz {
        self.saturating_add(rhs)
    }
}

impl Sub for Hertz {
    type Output = Hertz;

    fn sub(self, rhs: Hertz) -> Hertz {
        self.saturating_sub(rhs)
    }
}

impl From<i64> for Hertz {
    fn from(hz: i64) -> Self {
        Self(hz)
    }
}

impl From<Hertz> for i64 {
    fn from(hz: Hertz) -> Self {
        hz.0
    }
}

/// Scaling used when a frequency axis is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyUnits {
    Hz,
    KHz,
    MHz,
    GHz,
}

impl FrequencyUnits {
    pub fn for_frequency(freq: Hertz) -> Self {
        match freq.0.unsigned_abs() {
            f if f < 1_000 => Self::Hz,
            f if f < 1_000_000 => Self::KHz,
            f if f < 1_000_000_000 => Self::MHz,
            _ => Self::GHz,
        }
    }

    /// Number of Hertz in one unit.
    pub const fn divisor(self) -> i64 {
        match self {
            Self::Hz => 1,
            Self::KHz => 1_000,
            Self::MHz => 1_000_000,
            Self::GHz => 1_000_000_000,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Hz => "Hz",
            Self::KHz => "kHz",
            Self::MHz => "MHz",
            Self::GHz => "GHz",
        }
    }
}

/// Power in Decibels (dB).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Decibels(pub f32);

impl std::fmt::Display for Decibels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} dB", self.0)
    }
}

impl Decibels {
    /// Convert decibels to linear power.
    /// For power: linear = 10^(dB/10)
    pub fn to_linear(self) -> f32 {
        10.0_f32.powf(self.0 / 10.0)
    }

    /// Convert linear power to decibels.
    /// For power: dB = 10 * log10(linear)
    pub fn from_linear(linear: f32) -> Self {
        Self(10.0 * linear.log10())
    }

    pub const fn as_db(self) -> f32 {
        self.0
    }
}

impl From<f32> for Decibels {
    fn from(db: f32) -> Self {
        Self(db)
    }
}

impl From<Decibels> for f32 {
    fn from(db: Decibels) -> Self {
        db.0
    }
}
