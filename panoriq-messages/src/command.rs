use std::collections::BTreeMap;
use std::time::Duration;

use crate::{AcquisitionMode, Device, FrequencyRange, Hertz};

/// Commands sent from the controller to the acquisition engine.
#[derive(Debug, Clone)]
pub enum Command {
    /// Retune or reconfigure the window being acquired.
    Configure(WindowChange),
    /// Open the device and start producing frames.
    Start(StartRequest),
    /// Stop producing frames. The device stays selected.
    Stop,
    /// Change one gain stage of the running device.
    SetGain { name: String, value: f32 },
    /// Target round-trip time between frames.
    SetRtt(Duration),
    /// Fraction of the sample rate kept from every FFT, in `(0, 1]`.
    SetRelativeBandwidth(f64),
    SetStrategy(String),
    SetPartitioning(String),
    /// Terminate the engine thread.
    Shutdown,
}

/// The window the receiver should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChange {
    pub window: FrequencyRange,
    pub mode: AcquisitionMode,
}

impl WindowChange {
    pub fn width(&self) -> Hertz {
        self.window.width()
    }
}

/// Everything the acquisition side needs to open a device and start sweeping.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub device: Device,
    pub antenna: Option<String>,
    pub sample_rate: u32,
    pub lnb_offset: Hertz,
    pub window: WindowChange,
    pub strategy: String,
    pub partitioning: String,
    /// Gain values keyed by gain name
    pub gains: BTreeMap<String, f32>,
}
