use crate::{FrequencyRange, Hertz};

/// A request to change the visible window, from whichever source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    /// Zoom gesture on the display.
    Zoom {
        /// Center of the zoomed view (tuned center plus the display's FFT offset)
        center: Hertz,
        /// Visible span after the gesture
        span: Hertz,
        /// Center frequency the display is currently tuned to
        tuned_center: Hertz,
    },
    /// Drag of the display center with the width held.
    Pan { center: Hertz },
    /// Explicit range edit, e.g. from the range spin boxes or a loaded config.
    Range(FrequencyRange),
    /// Full-range checkbox.
    FullRange(bool),
}

/// Notifications raised by the display collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Window(WindowRequest),
    /// The demodulator filter box moved or was resized.
    Filter { offset: Hertz, bandwidth: Hertz },
    /// The displayed power range changed.
    LevelRange { min: f32, max: f32 },
}
