use crate::{EngineState, RateReport, SpectrumFrame};

/// Events sent from the acquisition engine to the controller.
#[derive(Debug)]
pub enum Event {
    /// State snapshot sent whenever the engine (re)starts acquisition.
    StateSnapshot(EngineState),
    /// A PSD window.
    Frame(SpectrumFrame),
    /// Periodic throughput report.
    Rates(RateReport),
    /// The requested device cannot be opened.
    DeviceUnavailable(String),
}
