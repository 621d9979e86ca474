use crate::WindowChange;

/// Current state of the acquisition engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Description of the open device
    pub device: String,
    /// Window being acquired
    pub window: WindowChange,
    /// Sample rate
    pub sample_rate: u32,
    /// Number of bins per frame
    pub fft_size: usize,
}
