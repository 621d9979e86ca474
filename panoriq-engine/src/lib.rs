mod spectrum;

pub use spectrum::{SyntheticSpectrum, Tone};

use anyhow::Result;
use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use panoriq_messages::{
    Command, Device, EngineState, Event, GainDescriptor, Hertz, RateReport, SpectrumFrame,
    StartRequest, WindowChange,
};
use rand::Rng;
use std::collections::BTreeMap;
use std::time::{Duration, Instant, SystemTime};

/// Bins per PSD frame.
pub const FFT_SIZE: usize = 1024;

const IDLE_POLL: Duration = Duration::from_millis(100);
const DEFAULT_RTT: Duration = Duration::from_millis(100);
const MIN_RTT: Duration = Duration::from_millis(1);
const RATE_REPORT_INTERVAL: Duration = Duration::from_millis(500);
/// Every this many frames one is held back as if the host stalled
const STALL_EVERY: u64 = 50;
const STALL: Duration = Duration::from_millis(250);

/// Receivers the simulated engine can open.
pub fn simulated_devices() -> Vec<Device> {
    let gain = |name: &str, max: f32, step: f32, default: f32| GainDescriptor {
        name: name.to_string(),
        min: 0.0,
        max,
        step,
        default,
    };

    vec![
        Device {
            desc: "Simulated RTL2832U".to_string(),
            driver: "rtlsdr".to_string(),
            min_freq: Hertz::mhz(24),
            max_freq: Hertz::mhz(1_766),
            antennas: vec!["RX".to_string()],
            gains: vec![gain("LNA", 49.6, 0.1, 20.0)],
            available: true,
        },
        Device {
            desc: "Simulated HackRF One".to_string(),
            driver: "hackrf".to_string(),
            min_freq: Hertz::mhz(1),
            max_freq: Hertz::mhz(6_000),
            antennas: vec!["TX/RX".to_string()],
            gains: vec![gain("LNA", 40.0, 8.0, 16.0), gain("VGA", 62.0, 2.0, 20.0)],
            available: true,
        },
        Device {
            desc: "Simulated audio input".to_string(),
            driver: "alsa".to_string(),
            min_freq: Hertz::ZERO,
            max_freq: Hertz::ZERO,
            antennas: Vec::new(),
            gains: Vec::new(),
            available: true,
        },
    ]
}

struct Session {
    device: Device,
    window: WindowChange,
    sample_rate: u32,
    gains: BTreeMap<String, f32>,
    frames: u64,
    next_frame: Instant,
    last_report: Instant,
    frames_at_report: u64,
    measured_sample_rate: u32,
}

impl Session {
    fn new(request: &StartRequest) -> Self {
        let now = Instant::now();
        Self {
            device: request.device.clone(),
            window: request.window,
            sample_rate: request.sample_rate,
            gains: request.gains.clone(),
            frames: 0,
            next_frame: now,
            last_report: now,
            frames_at_report: 0,
            measured_sample_rate: request.sample_rate,
        }
    }

    fn state(&self) -> EngineState {
        EngineState {
            device: self.device.desc.clone(),
            window: self.window,
            sample_rate: self.sample_rate,
            fft_size: FFT_SIZE,
        }
    }
}

/// The simulated acquisition backend.
/// Produces PSD frames for the requested window and processes commands from the controller.
pub struct Engine {
    cmd_rx: Receiver<Command>,
    event_tx: Sender<Event>,
    devices: Vec<Device>,
    spectrum: SyntheticSpectrum,
    rtt: Duration,
    relative_bandwidth: f64,
    strategy: String,
    partitioning: String,
    session: Option<Session>,
    should_exit: bool,
}

impl Engine {
    /// Create a new Engine instance.
    pub fn new(cmd_rx: Receiver<Command>, event_tx: Sender<Event>, devices: Vec<Device>) -> Self {
        debug!("Constructing a new engine with {} devices", devices.len());
        Self {
            cmd_rx,
            event_tx,
            devices,
            spectrum: SyntheticSpectrum::with_default_tones(),
            rtt: DEFAULT_RTT,
            relative_bandwidth: 1.0,
            strategy: String::new(),
            partitioning: String::new(),
            session: None,
            should_exit: false,
        }
    }

    /// Replace the simulated band, e.g. with a seeded one for reproducible frames.
    pub fn with_spectrum(mut self, spectrum: SyntheticSpectrum) -> Self {
        self.spectrum = spectrum;
        self
    }

    /// Run the engine (blocking) until `Shutdown` or the controller goes away.
    pub fn run(mut self) -> Result<()> {
        while !self.should_exit {
            let timeout = self
                .session
                .as_ref()
                .map_or(IDLE_POLL, |s| s.next_frame.saturating_duration_since(Instant::now()));

            match self.cmd_rx.recv_timeout(timeout) {
                Ok(cmd) => {
                    debug!("Engine received command: {:?}", cmd);
                    self.handle_command(cmd)?;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.should_exit = true;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if !self.should_exit {
                self.tick()?;
            }
        }
        debug!("Engine exiting");
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Configure(change) => {
                if let Some(session) = self.session.as_mut() {
                    session.window = change;
                    let state = session.state();
                    self.event_tx.send(Event::StateSnapshot(state))?;
                }
            }
            Command::Start(request) => self.start(request)?,
            Command::Stop => {
                if let Some(session) = self.session.take() {
                    info!(
                        "Stopped {} after {} frames",
                        session.device.desc, session.frames
                    );
                }
            }
            Command::SetGain { name, value } => match self.session.as_mut() {
                Some(session) => {
                    session.gains.insert(name, value);
                }
                None => debug!("Ignoring gain {name} = {value} while stopped"),
            },
            Command::SetRtt(rtt) => self.rtt = rtt.max(MIN_RTT),
            Command::SetRelativeBandwidth(factor) => self.relative_bandwidth = factor,
            Command::SetStrategy(strategy) => self.strategy = strategy,
            Command::SetPartitioning(partitioning) => self.partitioning = partitioning,
            Command::Shutdown => self.should_exit = true,
        }
        Ok(())
    }

    fn start(&mut self, request: StartRequest) -> Result<()> {
        let desc = &request.device.desc;
        let known = self
            .devices
            .iter()
            .any(|d| &d.desc == desc && d.is_usable());
        if !known {
            warn!("Cannot open {desc}");
            self.event_tx.send(Event::DeviceUnavailable(desc.clone()))?;
            return Ok(());
        }

        self.strategy.clone_from(&request.strategy);
        self.partitioning.clone_from(&request.partitioning);
        let session = Session::new(&request);
        info!(
            "Opened {} at {} sps, {} / {} sweep, relative bandwidth {:.2}",
            desc, session.sample_rate, self.strategy, self.partitioning, self.relative_bandwidth
        );
        self.event_tx.send(Event::StateSnapshot(session.state()))?;
        self.session = Some(session);
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        if now < session.next_frame {
            return Ok(());
        }
        session.next_frame = now + self.rtt;
        session.frames += 1;

        let gain: f32 = session.gains.values().sum();
        let window = session.window.window;
        let samples = self.spectrum.generate(window, FFT_SIZE, gain);

        let mut rng = rand::thread_rng();
        let mut latency = Duration::from_millis(rng.gen_range(5..20));
        if session.frames % STALL_EVERY == 0 {
            latency += STALL;
        }

        let frame = SpectrumFrame {
            freq_start: window.min(),
            freq_end: window.max(),
            samples,
            capture_time: SystemTime::now() - latency,
            sample_rate: session.sample_rate,
            measured_sample_rate: session.measured_sample_rate,
        };
        self.event_tx.send(Event::Frame(frame))?;

        let elapsed = now.duration_since(session.last_report);
        if elapsed >= RATE_REPORT_INTERVAL {
            // Share of the requested frame rate actually achieved
            let expected = elapsed.as_secs_f64() / self.rtt.as_secs_f64();
            let delivered = (session.frames - session.frames_at_report) as f64;
            let ratio = (delivered / expected).min(1.0);
            session.measured_sample_rate = (f64::from(session.sample_rate) * ratio) as u32;
            session.last_report = now;
            session.frames_at_report = session.frames;

            self.event_tx.send(Event::Rates(RateReport {
                sample_rate: session.sample_rate,
                measured_sample_rate: session.measured_sample_rate,
            }))?;
        }
        Ok(())
    }
}
