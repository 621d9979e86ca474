//! Types shared between the acquisition engine and the sweep controller.

mod command;
mod device;
mod event;
mod frame;
mod range;
mod state;
mod units;
mod view;

pub use command::{Command, StartRequest, WindowChange};
pub use device::{Device, GainDescriptor};
pub use event::Event;
pub use frame::{RateReport, SpectrumFrame};
pub use range::{AcquisitionMode, DeviceBounds, FrequencyRange};
pub use state::EngineState;
pub use units::{Decibels, FrequencyUnits, Hertz};
pub use view::{ViewEvent, WindowRequest};
