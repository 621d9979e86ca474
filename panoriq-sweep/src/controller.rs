use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, SystemTime};

use flume::Receiver;
use log::{debug, info, trace, warn};
use panoriq_messages::{
    AcquisitionMode, Device, Event, FrequencyRange, Hertz, RateReport, SpectrumFrame,
    StartRequest, ViewEvent, WindowRequest,
};

use crate::acquisition::{Acquisition, AcquisitionError};
use crate::bandplan::FrequencyAllocationTable;
use crate::config::{Config, LagFilterConfig};
use crate::error::ControllerError;
use crate::range_model::FrequencyRangeModel;
use crate::saved::SavedSpectrum;
use crate::staleness::StalenessFilter;
use crate::view::SpectrumView;
use crate::zoom::{Reconciled, ZoomReconciler, ZoomSettings};

/// What happened to a frame handed to [`SweepController::on_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Shown and kept for export.
    Accepted,
    /// Arrived too late to be worth drawing.
    Stale,
    /// No samples or inverted bounds.
    Malformed,
    /// The scan is not running.
    Discarded,
}

/// Figures shown next to the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measures {
    /// Frequency under the demodulator filter box
    pub demod_freq: Hertz,
    pub filter_bandwidth: Hertz,
    /// Frames shown since the scan started
    pub frames: u64,
}

/// Round-trip time that works well for each driver, if one is known.
pub fn preferred_rtt(driver: &str) -> Option<Duration> {
    let ms = match driver {
        "rtlsdr" => 60,
        "airspy" => 16,
        "hackrf" => 10,
        "uhd" => 8,
        _ => return None,
    };
    Some(Duration::from_millis(ms))
}

/// Drives one panoramic sweep session.
///
/// Every call runs to completion on the owner's thread. Programmatic changes to
/// the display are made with `adjusting_range` held; window requests the display
/// raises in response are drained from `view_rx` and dropped before the guard
/// is released.
pub struct SweepController<A: Acquisition, V: SpectrumView> {
    acquisition: A,
    view: V,
    view_rx: Receiver<ViewEvent>,
    config: Config,

    range: FrequencyRangeModel,
    zoom: ZoomReconciler,
    staleness: StalenessFilter,
    saved: SavedSpectrum,

    devices: Vec<Device>,
    selected: Option<usize>,
    antenna: Option<usize>,
    gains: BTreeMap<String, f32>,
    lnb_offset: Hertz,
    banned_device: Option<String>,
    sample_rate: u32,
    rtt: Option<Duration>,

    band_plans: Vec<FrequencyAllocationTable>,
    band_plan: Option<usize>,

    running: bool,
    adjusting_range: bool,
    last_frame_window: Option<FrequencyRange>,
    frames: u64,
    rates: RateReport,
    filter_offset: Hertz,
    filter_bandwidth: Hertz,
}

impl<A: Acquisition, V: SpectrumView> SweepController<A, V> {
    pub fn new(acquisition: A, view: V, view_rx: Receiver<ViewEvent>, config: Config) -> Self {
        let panoramic = &config.panoramic;
        let range = FrequencyRangeModel::new(
            FrequencyRange::new(Hertz(panoramic.range_min), Hertz(panoramic.range_max)),
            panoramic.full_range,
        );
        let lnb_offset = Hertz(panoramic.lnb_freq);
        let sample_rate = panoramic.samp_rate;

        let mut controller = Self {
            acquisition,
            view,
            view_rx,
            range,
            zoom: ZoomReconciler::new(ZoomSettings::from(&config.zoom)),
            staleness: StalenessFilter::new(&config.lag_filter),
            saved: SavedSpectrum::new(),
            devices: Vec::new(),
            selected: None,
            antenna: None,
            gains: BTreeMap::new(),
            lnb_offset,
            banned_device: None,
            sample_rate,
            rtt: None,
            band_plans: Vec::new(),
            band_plan: None,
            running: false,
            adjusting_range: false,
            last_frame_window: None,
            frames: 0,
            rates: RateReport::default(),
            filter_offset: Hertz::ZERO,
            filter_bandwidth: Hertz::ZERO,
            config,
        };

        let panoramic = &controller.config.panoramic;
        controller.view.set_palette(&panoramic.palette);
        controller
            .view
            .set_level_range(panoramic.pan_range_min, panoramic.pan_range_max);

        // The acquisition side learns about this window when the scan starts
        let reconciled = controller.zoom.reset_to(controller.range.range());
        controller.view.set_units(controller.range.units());
        controller.apply_view(&reconciled);
        controller
    }

    // Display events

    /// Handle every event the display has queued.
    ///
    /// All events are processed even if one fails; the first error is returned.
    pub fn pump_view_events(&mut self) -> Result<(), ControllerError> {
        let mut first_err = None;
        while let Ok(event) = self.view_rx.try_recv() {
            if let Err(err) = self.handle_view_event(event) {
                warn!("{err}");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn handle_view_event(&mut self, event: ViewEvent) -> Result<(), ControllerError> {
        match event {
            ViewEvent::Window(request) => self.on_window_request(request),
            other => {
                self.handle_display_event(other);
                Ok(())
            }
        }
    }

    pub fn on_window_request(&mut self, request: WindowRequest) -> Result<(), ControllerError> {
        if self.adjusting_range {
            trace!("Ignoring {request:?} raised while adjusting the range");
            return Ok(());
        }

        match request {
            WindowRequest::Zoom {
                center,
                span,
                tuned_center,
            } => {
                let reconciled = self
                    .zoom
                    .zoom(self.range.range(), center, span, tuned_center);
                self.apply(reconciled)
            }
            WindowRequest::Pan { center } => {
                let reconciled = self.zoom.pan(self.range.range(), center);
                self.apply(reconciled)
            }
            WindowRequest::Range(range) => self.set_range(range.min(), range.max()),
            WindowRequest::FullRange(enabled) => self.set_full_range(enabled),
        }
    }

    fn handle_display_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Window(request) => {
                trace!("Ignoring {request:?} raised while adjusting the range");
            }
            ViewEvent::Filter { offset, bandwidth } => {
                self.filter_offset = offset;
                self.filter_bandwidth = bandwidth;
            }
            ViewEvent::LevelRange { min, max } => {
                self.config.panoramic.pan_range_min = min;
                self.config.panoramic.pan_range_max = max;
                self.view.set_level_range(min, max);
            }
        }
    }

    // Acquisition events

    pub fn on_engine_event(&mut self, event: Event) -> Result<(), ControllerError> {
        match event {
            Event::StateSnapshot(state) => {
                debug!(
                    "Engine acquiring {} from {} at {} sps",
                    state.window.window, state.device, state.sample_rate
                );
                self.rates.sample_rate = state.sample_rate;
            }
            Event::Frame(frame) => {
                self.on_frame(frame);
            }
            Event::Rates(report) => self.on_rates(report),
            Event::DeviceUnavailable(desc) => {
                if self.running {
                    self.running = false;
                    self.view.set_running(false);
                }
                return Err(AcquisitionError::Unavailable(desc).into());
            }
        }
        Ok(())
    }

    pub fn on_frame(&mut self, frame: SpectrumFrame) -> FrameOutcome {
        self.on_frame_at(frame, SystemTime::now())
    }

    /// Handle a frame received at `now`.
    pub fn on_frame_at(&mut self, frame: SpectrumFrame, now: SystemTime) -> FrameOutcome {
        if !self.running {
            trace!("Discarding frame received while stopped");
            return FrameOutcome::Discarded;
        }
        if !frame.is_well_formed() {
            warn!(
                "Dropping malformed frame [{}, {}] with {} samples",
                frame.freq_start,
                frame.freq_end,
                frame.samples.len()
            );
            return FrameOutcome::Malformed;
        }

        self.rates.sample_rate = frame.sample_rate;

        let window = frame.window();
        if self.last_frame_window != Some(window) {
            debug!("Acquisition moved to {window}");
            self.last_frame_window = Some(window);
            let reconciled = self.zoom.adopt(window);
            self.apply_view(&reconciled);
        }

        if !self.staleness.accept(frame.capture_time, now) {
            return FrameOutcome::Stale;
        }

        self.rates.measured_sample_rate = frame.measured_sample_rate;
        self.saved.set(frame.freq_start, frame.freq_end, &frame.samples);
        self.view.feed(&frame.samples);
        self.frames += 1;
        FrameOutcome::Accepted
    }

    pub fn on_rates(&mut self, report: RateReport) {
        self.rates = report;
    }

    // Scan control

    pub fn start(&mut self) -> Result<(), ControllerError> {
        if self.running {
            return Ok(());
        }

        let device = self.selected_device().ok_or(ControllerError::NoDevice)?;
        if self.banned_device.as_deref() == Some(device.desc.as_str()) {
            return Err(ControllerError::DeviceInUse(device.desc.clone()));
        }

        let request = StartRequest {
            device: device.clone(),
            antenna: self.antenna().map(str::to_string),
            sample_rate: self.sample_rate,
            lnb_offset: self.lnb_offset,
            window: self.zoom.current_change(self.range.range()),
            strategy: self.config.panoramic.strategy.clone(),
            partitioning: self.config.panoramic.partitioning.clone(),
            gains: self.gains.clone(),
        };
        self.acquisition.start(&request)?;

        info!(
            "Scanning {} with {} ({})",
            request.window.window, request.device.desc, request.window.mode
        );
        self.running = true;
        self.frames = 0;
        self.staleness.reset();
        self.last_frame_window = None;
        self.view.set_running(true);
        Ok(())
    }

    /// Stop the scan. Frames still in flight are discarded.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        if !self.running {
            return Ok(());
        }

        self.running = false;
        self.sample_rate = self.config.panoramic.samp_rate;
        self.view.set_running(false);
        info!("Scan stopped after {} frames", self.frames);
        self.acquisition.stop()?;
        Ok(())
    }

    // Devices

    /// Offer `devices` to the operator. Unusable ones are left out.
    pub fn set_devices(&mut self, devices: Vec<Device>) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("device list"));
        }
        let (usable, skipped): (Vec<_>, Vec<_>) =
            devices.into_iter().partition(Device::is_usable);
        for device in &skipped {
            debug!("Not offering {} ({})", device.desc, device.driver);
        }

        self.devices = usable;
        self.antenna = None;
        let preferred = &self.config.panoramic.device;
        self.selected = self
            .devices
            .iter()
            .position(|d| &d.desc == preferred)
            .or(if self.devices.is_empty() { None } else { Some(0) });

        if self.selected.is_none() {
            warn!("No usable devices found");
            self.gains.clear();
            return Ok(());
        }

        self.on_device_changed()?;
        let antenna = self.config.panoramic.antenna.clone();
        if !antenna.is_empty() {
            if let Err(err) = self.set_antenna(&antenna) {
                debug!("Configured antenna not restored: {err}");
            }
        }
        Ok(())
    }

    pub fn select_device(&mut self, desc: &str) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("device"));
        }
        let index = self
            .devices
            .iter()
            .position(|d| d.desc == desc)
            .ok_or_else(|| ControllerError::UnknownDevice(desc.to_string()))?;
        self.selected = Some(index);
        self.on_device_changed()
    }

    fn on_device_changed(&mut self) -> Result<(), ControllerError> {
        let Some(device) = self.selected_device().cloned() else {
            self.gains.clear();
            return Ok(());
        };
        info!("Using {} ({})", device.desc, device.driver);

        let panoramic = &self.config.panoramic;
        self.gains = device
            .gains
            .iter()
            .map(|g| {
                let value = panoramic.gain(&device.driver, &g.name).unwrap_or(g.default);
                (g.name.clone(), value)
            })
            .collect();

        if let Some(rtt) = preferred_rtt(&device.driver) {
            self.set_rtt(rtt)?;
        }

        self.antenna = match self.antenna {
            Some(index) if index < device.antennas.len() => Some(index),
            _ if !device.antennas.is_empty() => Some(0),
            _ => None,
        };

        let range = self.range.set_device_bounds(device.bounds(self.lnb_offset));
        self.on_range_changed(range)
    }

    pub fn set_antenna(&mut self, name: &str) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("antenna"));
        }
        let device = self.selected_device().ok_or(ControllerError::NoDevice)?;
        let index = device
            .antennas
            .iter()
            .position(|a| a == name)
            .ok_or_else(|| ControllerError::UnknownAntenna(name.to_string()))?;
        self.antenna = Some(index);
        Ok(())
    }

    pub fn set_banned_device(&mut self, desc: Option<String>) {
        self.banned_device = desc;
    }

    pub fn set_lnb_offset(&mut self, offset: Hertz) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("LNB offset"));
        }
        self.lnb_offset = offset;
        let Some(bounds) = self.selected_device().map(|d| d.bounds(offset)) else {
            return Ok(());
        };
        let range = self.range.set_device_bounds(bounds);
        self.on_range_changed(range)
    }

    pub fn set_gain(&mut self, name: &str, value: f32) -> Result<(), ControllerError> {
        let device = self.selected_device().ok_or(ControllerError::NoDevice)?;
        let driver = device.driver.clone();
        self.config.panoramic.set_gain(&driver, name, value);
        self.gains.insert(name.to_string(), value);
        self.acquisition.set_gain(name, value)?;
        Ok(())
    }

    // Range

    pub fn set_range(&mut self, min: Hertz, max: Hertz) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("scan range"));
        }
        let range = self.range.set_range(min, max);
        self.on_range_changed(range)
    }

    pub fn set_full_range(&mut self, enabled: bool) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("scan range"));
        }
        let range = self.range.set_full_range(enabled);
        self.on_range_changed(range)
    }

    fn on_range_changed(&mut self, range: FrequencyRange) -> Result<(), ControllerError> {
        self.view.set_units(self.range.units());
        let reconciled = self.zoom.reset_to(range);
        self.apply(reconciled)
    }

    // Settings

    /// Sample rate requested on the next start. Only while stopped.
    pub fn set_preferred_sample_rate(&mut self, rate: u32) -> Result<(), ControllerError> {
        if self.running {
            return Err(ControllerError::Busy("sample rate"));
        }
        self.sample_rate = rate;
        self.config.panoramic.samp_rate = rate;
        Ok(())
    }

    /// Bandwidth acquired in fixed-frequency mode. Also becomes the preferred sample rate.
    pub fn set_min_bw_for_zoom(&mut self, bandwidth: Hertz) {
        self.config.zoom.min_bw_for_zoom = bandwidth.as_hz();
        self.zoom.set_settings(ZoomSettings::from(&self.config.zoom));

        self.sample_rate = u32::try_from(bandwidth.as_hz()).unwrap_or(u32::MAX);
        if !self.running {
            self.config.panoramic.samp_rate = self.sample_rate;
        }
    }

    /// Fixed-frequency threshold as a percentage of the minimum zoom bandwidth.
    pub fn set_relative_bandwidth(&mut self, percent: u32) -> Result<(), ControllerError> {
        self.config.zoom.relative_bandwidth = percent.clamp(1, 100);
        self.zoom.set_settings(ZoomSettings::from(&self.config.zoom));
        self.acquisition
            .set_relative_bandwidth(self.config.zoom.relative_bandwidth_factor())?;
        Ok(())
    }

    pub fn set_lag_filter(&mut self, config: LagFilterConfig) {
        self.staleness.configure(&config);
        self.config.lag_filter = config;
    }

    pub fn set_rtt(&mut self, rtt: Duration) -> Result<(), ControllerError> {
        self.rtt = Some(rtt);
        self.acquisition.set_rtt(rtt)?;
        Ok(())
    }

    pub fn set_strategy(&mut self, strategy: &str) -> Result<(), ControllerError> {
        self.config.panoramic.strategy = strategy.to_string();
        self.acquisition.set_strategy(strategy)?;
        Ok(())
    }

    pub fn set_partitioning(&mut self, partitioning: &str) -> Result<(), ControllerError> {
        self.config.panoramic.partitioning = partitioning.to_string();
        self.acquisition.set_partitioning(partitioning)?;
        Ok(())
    }

    pub fn set_palette(&mut self, name: &str) {
        self.config.panoramic.palette = name.to_string();
        self.view.set_palette(name);
    }

    // Band plans

    pub fn set_band_plans(&mut self, plans: Vec<FrequencyAllocationTable>) {
        if self.band_plan.is_some() {
            self.view.set_band_plan(None);
            self.band_plan = None;
        }
        self.band_plans = plans;
    }

    /// Overlay the plan called `name`, or none. Returns false if there is no such plan.
    pub fn select_band_plan(&mut self, name: Option<&str>) -> bool {
        if self.band_plan.take().is_some() {
            self.view.set_band_plan(None);
        }

        let Some(name) = name else {
            return true;
        };
        let Some(index) = self.band_plans.iter().position(|p| p.name() == name) else {
            warn!("No band plan named `{name}`");
            return false;
        };
        self.band_plan = Some(index);
        self.view.set_band_plan(Some(&self.band_plans[index]));
        true
    }

    pub fn band_plan(&self) -> Option<&FrequencyAllocationTable> {
        self.band_plan.map(|i| &self.band_plans[i])
    }

    // Export and persistence

    pub fn export(&self, path: &Path) -> Result<(), ControllerError> {
        self.saved.export_to_file(path)?;
        Ok(())
    }

    /// Capture the session state into the persisted configuration.
    pub fn save_config(&mut self) -> &Config {
        let device = self.selected.map(|i| &self.devices[i]);
        let antenna = self.antenna().map(str::to_string);
        let panoramic = &mut self.config.panoramic;

        if let Some(device) = device {
            panoramic.device.clone_from(&device.desc);
            panoramic.antenna = antenna.unwrap_or_default();
        }
        panoramic.lnb_freq = self.lnb_offset.as_hz();
        panoramic.range_min = self.range.range().min().as_hz();
        panoramic.range_max = self.range.range().max().as_hz();
        panoramic.full_range = self.range.is_full_range();
        &self.config
    }

    // Accessors

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn range(&self) -> FrequencyRange {
        self.range.range()
    }

    pub fn is_full_range(&self) -> bool {
        self.range.is_full_range()
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.zoom.mode()
    }

    /// Window the receiver is asked to cover.
    pub fn window(&self) -> FrequencyRange {
        self.zoom.current_change(self.range.range()).window
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn selected_device(&self) -> Option<&Device> {
        self.selected.map(|i| &self.devices[i])
    }

    pub fn antenna(&self) -> Option<&str> {
        let device = self.selected_device()?;
        self.antenna
            .and_then(|i| device.antennas.get(i))
            .map(String::as_str)
    }

    pub fn gains(&self) -> &BTreeMap<String, f32> {
        &self.gains
    }

    pub fn lnb_offset(&self) -> Hertz {
        self.lnb_offset
    }

    pub fn preferred_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    pub fn rates(&self) -> RateReport {
        self.rates
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn measures(&self) -> Measures {
        let center = self
            .last_frame_window
            .map_or(Hertz::ZERO, |window| window.center());
        Measures {
            demod_freq: center + self.filter_offset,
            filter_bandwidth: self.filter_bandwidth,
            frames: self.frames,
        }
    }

    pub fn saved(&self) -> &SavedSpectrum {
        &self.saved
    }

    pub fn staleness(&self) -> &StalenessFilter {
        &self.staleness
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn acquisition(&self) -> &A {
        &self.acquisition
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    // Internals

    fn apply(&mut self, reconciled: Reconciled) -> Result<(), ControllerError> {
        self.apply_view(&reconciled);
        if let Some(change) = reconciled.change {
            debug!("Requesting {} in {} mode", change.window, change.mode);
            self.acquisition.configure_window(change)?;
        }
        Ok(())
    }

    /// Push a display update with the range guard held.
    fn apply_view(&mut self, reconciled: &Reconciled) {
        if reconciled.view.is_empty() {
            return;
        }

        self.adjusting_range = true;
        reconciled.view.apply_to(&mut self.view);
        while let Ok(event) = self.view_rx.try_recv() {
            self.handle_display_event(event);
        }
        self.adjusting_range = false;
    }
}
