//! Panoramic sweep control: keeps the acquired window, the display and the
//! receiver consistent while the operator zooms and pans across a wide range.

mod acquisition;
mod bandplan;
mod config;
mod controller;
mod error;
mod range_model;
mod saved;
mod staleness;
mod view;
mod zoom;

pub use acquisition::{Acquisition, AcquisitionError, ChannelAcquisition};
pub use bandplan::{
    DEFAULT_BAND_COLOR, FrequencyAllocationTable, FrequencyBand, load_band_plans,
    parse_band_plans,
};
pub use config::{Config, LagFilterConfig, PanoramicConfig, ZoomConfig};
pub use controller::{FrameOutcome, Measures, SweepController, preferred_rtt};
pub use error::{ConfigError, ControllerError, ExportError};
pub use range_model::FrequencyRangeModel;
pub use saved::SavedSpectrum;
pub use staleness::StalenessFilter;
pub use view::SpectrumView;
pub use zoom::{Reconciled, ViewUpdate, ZoomReconciler, ZoomSettings};
