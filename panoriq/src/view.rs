use flume::Sender;
use log::{debug, info, trace};
use panoriq_messages::{FrequencyUnits, Hertz, ViewEvent, WindowRequest};
use panoriq_sweep::{FrequencyAllocationTable, SpectrumView};

/// Console stand-in for the spectrum widget.
///
/// Like the real widget it reports a programmatic zoom reset back as a zoom
/// event, which the controller is expected to drop.
pub struct HeadlessView {
    events: Sender<ViewEvent>,
    center: Hertz,
    bandwidth: Hertz,
    units: FrequencyUnits,
    lines: u64,
    peak: f32,
}

impl HeadlessView {
    pub fn new(events: Sender<ViewEvent>) -> Self {
        Self {
            events,
            center: Hertz::ZERO,
            bandwidth: Hertz::ZERO,
            units: FrequencyUnits::MHz,
            lines: 0,
            peak: f32::NEG_INFINITY,
        }
    }

    /// Strongest level seen since the view was created.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    fn format(&self, freq: Hertz) -> String {
        format!(
            "{:.3} {}",
            freq.as_hz() as f64 / self.units.divisor() as f64,
            self.units.suffix()
        )
    }
}

impl SpectrumView for HeadlessView {
    fn set_center_freq(&mut self, freq: Hertz) {
        self.center = freq;
        debug!("View centered on {}", self.format(freq));
    }

    fn set_bandwidth(&mut self, bandwidth: Hertz) {
        self.bandwidth = bandwidth;
        debug!("View span {}", self.format(bandwidth));
    }

    fn set_demod_cut(&mut self, bandwidth: Hertz) {
        debug!("Filter box {}", self.format(bandwidth));
    }

    fn reset_zoom(&mut self) {
        let request = WindowRequest::Zoom {
            center: self.center,
            span: self.bandwidth,
            tuned_center: self.center,
        };
        // Nobody listening just means the controller is gone
        let _ = self.events.send(ViewEvent::Window(request));
    }

    fn feed(&mut self, samples: &[f32]) {
        self.lines += 1;
        let peak = samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.peak = self.peak.max(peak);
        trace!("Line {}: {} bins, peak {:.1} dB", self.lines, samples.len(), peak);
    }

    fn set_units(&mut self, units: FrequencyUnits) {
        self.units = units;
    }

    fn set_running(&mut self, running: bool) {
        info!("{}", if running { "Scanning" } else { "Idle" });
    }

    fn set_level_range(&mut self, min: f32, max: f32) {
        debug!("Levels {min:.1} dB to {max:.1} dB");
    }

    fn set_palette(&mut self, name: &str) {
        debug!("Palette {name}");
    }

    fn set_band_plan(&mut self, table: Option<&FrequencyAllocationTable>) {
        match table {
            Some(table) => info!("Band plan {} ({} bands)", table.name(), table.bands().len()),
            None => debug!("Band plan removed"),
        }
    }
}
