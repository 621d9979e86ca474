use std::time::SystemTime;

use crate::{FrequencyRange, Hertz};

/// One PSD window produced by the acquisition side.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    pub freq_start: Hertz,
    pub freq_end: Hertz,
    /// Power samples in dB, lowest frequency first
    pub samples: Vec<f32>,
    /// When the receiver captured the samples (receiver clock)
    pub capture_time: SystemTime,
    /// Nominal sample rate the frame was acquired at
    pub sample_rate: u32,
    /// Sample rate the processing chain actually sustained
    pub measured_sample_rate: u32,
}

impl SpectrumFrame {
    pub fn window(&self) -> FrequencyRange {
        FrequencyRange::new(self.freq_start, self.freq_end)
    }

    /// A frame is well formed if it carries samples over a non-inverted span.
    pub fn is_well_formed(&self) -> bool {
        !self.samples.is_empty() && self.freq_start <= self.freq_end
    }
}

/// Throughput figures shown to the operator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateReport {
    pub sample_rate: u32,
    pub measured_sample_rate: u32,
}
