use panoriq_messages::{FrequencyUnits, Hertz};

use crate::bandplan::FrequencyAllocationTable;

/// The spectrum/waterfall display the controller drives.
///
/// Implementations that raise change notifications when set programmatically
/// (the way a widget would after `reset_zoom`) should queue them as
/// [`ViewEvent`](panoriq_messages::ViewEvent)s on the channel handed to the
/// controller. Window requests queued while the controller is adjusting the
/// range are discarded.
pub trait SpectrumView {
    /// Tune the display to `freq`.
    fn set_center_freq(&mut self, freq: Hertz);

    /// Span covered by one frame.
    fn set_bandwidth(&mut self, bandwidth: Hertz);

    /// Width of the demodulator filter box, centered on the display.
    fn set_demod_cut(&mut self, bandwidth: Hertz);

    /// Undo any horizontal zoom so the whole span is visible.
    fn reset_zoom(&mut self);

    /// Append one PSD line.
    fn feed(&mut self, samples: &[f32]);

    fn set_units(&mut self, _units: FrequencyUnits) {}

    fn set_running(&mut self, _running: bool) {}

    fn set_level_range(&mut self, _min: f32, _max: f32) {}

    fn set_palette(&mut self, _name: &str) {}

    /// Overlay a band plan, or remove the current one with `None`.
    fn set_band_plan(&mut self, _table: Option<&FrequencyAllocationTable>) {}
}
