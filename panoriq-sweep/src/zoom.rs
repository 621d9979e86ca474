//! Zoom and pan reconciliation.
//!
//! Gestures on the display, explicit range edits and device changes all end up
//! here as a requested window. The reconciler keeps the window inside the scan
//! range, decides whether the receiver should sweep or hold a fixed center
//! frequency, and tells the caller both what the display must be set to and
//! whether the acquisition side needs to be reconfigured.

use log::{debug, trace};
use panoriq_messages::{AcquisitionMode, FrequencyRange, Hertz, WindowChange};

use crate::config::ZoomConfig;
use crate::view::SpectrumView;

/// Zoom thresholds, in the units the reconciler works with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSettings {
    /// Bandwidth acquired in fixed-frequency mode
    pub min_bw_for_zoom: Hertz,
    /// Percentage of `min_bw_for_zoom` at or below which zooming switches to
    /// fixed-frequency mode, 1 to 100
    pub relative_bandwidth: u32,
    /// Upper limit for the demodulator cut shown in sweep mode
    pub demod_bw_cap: Hertz,
}

impl ZoomSettings {
    /// Compared in integers so a width exactly on the threshold is always fixed.
    pub fn mode_for_width(&self, width: Hertz) -> AcquisitionMode {
        let threshold = i128::from(self.min_bw_for_zoom.0) * i128::from(self.relative_bandwidth);
        if i128::from(width.0) * 100 <= threshold {
            AcquisitionMode::FixedFrequency
        } else {
            AcquisitionMode::Sweep
        }
    }
}

impl From<&ZoomConfig> for ZoomSettings {
    fn from(config: &ZoomConfig) -> Self {
        Self {
            min_bw_for_zoom: Hertz(config.min_bw_for_zoom),
            relative_bandwidth: config.relative_bandwidth.clamp(1, 100),
            demod_bw_cap: Hertz(config.demod_bw_cap),
        }
    }
}

/// Changes the display must apply for a reconciled window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ViewUpdate {
    pub center: Option<Hertz>,
    pub bandwidth: Option<Hertz>,
    pub demod_cut: Option<Hertz>,
    pub reset_zoom: bool,
}

impl ViewUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to<V: SpectrumView + ?Sized>(&self, view: &mut V) {
        if let Some(center) = self.center {
            view.set_center_freq(center);
        }
        if let Some(bandwidth) = self.bandwidth {
            view.set_bandwidth(bandwidth);
        }
        if let Some(cut) = self.demod_cut {
            view.set_demod_cut(cut);
        }
        if self.reset_zoom {
            view.reset_zoom();
        }
    }
}

/// Outcome of one reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub window: FrequencyRange,
    pub mode: AcquisitionMode,
    pub view: ViewUpdate,
    /// Set when the acquisition side must be reconfigured
    pub change: Option<WindowChange>,
}

/// Sweep/fixed-frequency state machine for the visible window.
#[derive(Debug, Clone)]
pub struct ZoomReconciler {
    settings: ZoomSettings,
    mode: AcquisitionMode,
    window: Option<FrequencyRange>,
    /// Bandwidth the display was last set to
    display_bw: Option<Hertz>,
    last_emitted: Option<(Hertz, AcquisitionMode)>,
}

impl ZoomReconciler {
    pub fn new(settings: ZoomSettings) -> Self {
        Self {
            settings,
            mode: AcquisitionMode::Sweep,
            window: None,
            display_bw: None,
            last_emitted: None,
        }
    }

    pub fn settings(&self) -> &ZoomSettings {
        &self.settings
    }

    /// New thresholds take effect on the next gesture.
    pub fn set_settings(&mut self, settings: ZoomSettings) {
        self.settings = settings;
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn window(&self) -> Option<FrequencyRange> {
        self.window
    }

    /// The window and mode the acquisition side should currently be using.
    pub fn current_change(&self, range: FrequencyRange) -> WindowChange {
        WindowChange {
            window: self.window.unwrap_or(range),
            mode: self.mode,
        }
    }

    /// Zoom gesture: `center` and `span` describe the view after the gesture,
    /// `tuned_center` is where the display is tuned.
    pub fn zoom(
        &mut self,
        range: FrequencyRange,
        center: Hertz,
        span: Hertz,
        tuned_center: Hertz,
    ) -> Reconciled {
        let requested = FrequencyRange::centered(center, span);
        let clamped_both = span > range.width();
        let window = slide_inside(requested, range);
        if window != requested {
            trace!("Zoom window {requested} moved inside {range} as {window}");
        }

        let mode = self.settings.mode_for_width(window.width());
        let window = match mode {
            // Hold the receiver where it is tuned; the gesture center only moves the view
            AcquisitionMode::FixedFrequency => slide_inside(
                FrequencyRange::centered(tuned_center, self.settings.min_bw_for_zoom),
                range,
            ),
            AcquisitionMode::Sweep => window,
        };

        let mut reconciled = self.commit(window, mode);
        if clamped_both {
            debug!("Zoomed out past {range}, resetting to the full range");
            reconciled.view.reset_zoom = true;
        }
        reconciled
    }

    /// Pan gesture: move the window to `center` keeping its width.
    pub fn pan(&mut self, range: FrequencyRange, center: Hertz) -> Reconciled {
        let width = self.window.map_or(range.width(), |w| w.width());
        let requested = FrequencyRange::centered(center, width);
        let window = slide_inside(requested, range);

        let change = self.emit_if_changed(window, self.mode);
        if change.is_none() {
            debug!("Pan to {window} keeps the acquired width, only the display moves");
        }
        self.window = Some(window);

        let mut view = ViewUpdate::default();
        if window != requested {
            // The display sits where the user dragged it; pull it back
            view.center = Some(window.center());
        }

        Reconciled {
            window,
            mode: self.mode,
            view,
            change,
        }
    }

    /// The scan range itself changed: show all of it.
    pub fn reset_to(&mut self, range: FrequencyRange) -> Reconciled {
        let mode = self.settings.mode_for_width(range.width());
        let window = match mode {
            AcquisitionMode::FixedFrequency => slide_inside(
                FrequencyRange::centered(range.center(), self.settings.min_bw_for_zoom),
                range,
            ),
            AcquisitionMode::Sweep => range,
        };
        self.commit(window, mode)
    }

    /// The acquisition side reported frames for `window` on its own initiative.
    ///
    /// The display follows, but nothing is sent back, so the controller and the
    /// device cannot keep correcting each other.
    pub fn adopt(&mut self, window: FrequencyRange) -> Reconciled {
        let view = self.display_update(window, self.mode);
        self.window = Some(window);
        self.last_emitted = Some((window.width(), self.mode));
        Reconciled {
            window,
            mode: self.mode,
            view,
            change: None,
        }
    }

    fn commit(&mut self, window: FrequencyRange, mode: AcquisitionMode) -> Reconciled {
        if mode != self.mode {
            debug!("Acquisition mode {} -> {mode}", self.mode);
        }
        self.mode = mode;
        self.window = Some(window);
        let view = self.display_update(window, mode);
        let change = self.emit_if_changed(window, mode);
        Reconciled {
            window,
            mode,
            view,
            change,
        }
    }

    fn display_update(&mut self, window: FrequencyRange, mode: AcquisitionMode) -> ViewUpdate {
        let mut update = ViewUpdate::default();
        match mode {
            AcquisitionMode::FixedFrequency => {
                // The center stays put; only the received span follows min_bw_for_zoom
                let bw = self.settings.min_bw_for_zoom;
                if self.display_bw != Some(bw) {
                    update.bandwidth = Some(bw);
                    self.display_bw = Some(bw);
                }
            }
            AcquisitionMode::Sweep => {
                let bw = window.width();
                update.center = Some(window.center());
                if self.display_bw != Some(bw) {
                    update.bandwidth = Some(bw);
                    update.demod_cut = Some(Hertz(bw.0 / 10).min(self.settings.demod_bw_cap));
                    update.reset_zoom = true;
                    self.display_bw = Some(bw);
                }
            }
        }
        update
    }

    fn emit_if_changed(
        &mut self,
        window: FrequencyRange,
        mode: AcquisitionMode,
    ) -> Option<WindowChange> {
        let key = (window.width(), mode);
        if self.last_emitted == Some(key) {
            return None;
        }
        self.last_emitted = Some(key);
        Some(WindowChange { window, mode })
    }
}

/// Move `window` inside `bounds` without changing its width. A window wider
/// than `bounds` becomes `bounds`.
fn slide_inside(window: FrequencyRange, bounds: FrequencyRange) -> FrequencyRange {
    if window.width() >= bounds.width() {
        return bounds;
    }
    if window.min() < bounds.min() {
        let shift = bounds.min() - window.min();
        FrequencyRange::new(window.min() + shift, window.max() + shift)
    } else if window.max() > bounds.max() {
        let shift = window.max() - bounds.max();
        FrequencyRange::new(window.min() - shift, window.max() - shift)
    } else {
        window
    }
}
