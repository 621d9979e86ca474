mod view;

use panoriq_engine::{Engine, simulated_devices};
use panoriq_messages::{Command, Hertz, ViewEvent, WindowRequest};
use panoriq_sweep::{ChannelAcquisition, Config, SweepController, load_band_plans};
use view::HeadlessView;

use log::{LevelFilter, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frames to wait before each scripted gesture.
const SCRIPT: [(u64, WindowRequest); 3] = [
    // The FM broadcast band
    (
        20,
        WindowRequest::Zoom {
            center: Hertz::khz(98_000),
            span: Hertz::mhz(20),
            tuned_center: Hertz::khz(98_000),
        },
    ),
    // Narrow enough to hold the receiver on one station
    (
        20,
        WindowRequest::Zoom {
            center: Hertz::khz(95_800),
            span: Hertz::khz(400),
            tuned_center: Hertz::khz(95_800),
        },
    ),
    // Back out to sweep a few stations further up the band
    (
        20,
        WindowRequest::Zoom {
            center: Hertz::khz(104_300),
            span: Hertz::mhz(6),
            tuned_center: Hertz::khz(95_800),
        },
    ),
];
const FINAL_FRAMES: u64 = 20;

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        info!("{} not found, using defaults", path.display());
        return Ok(Config::default());
    }
    Ok(Config::load(path)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} - mod path |{}| - args: |{}|",
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .filter_module("panoriq_engine", LevelFilter::Info)
        .filter_module("panoriq_sweep", LevelFilter::Debug)
        .filter_module("panoriq", LevelFilter::Debug)
        .init();

    // Parse CLI arguments: config file, then export destination
    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| "panoriq.toml".to_string()));
    let export_path = PathBuf::from(args.next().unwrap_or_else(|| "panoramic.m".to_string()));
    let band_plan_path = config_path.with_file_name("bandplans.toml");

    let config = load_config(&config_path)?;

    // Create flume channels for bidirectional communication
    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::bounded(4);
    let (view_tx, view_rx) = flume::unbounded::<ViewEvent>();

    // Spawn engine thread
    let engine_handle = std::thread::spawn(move || {
        let engine = Engine::new(cmd_rx, event_tx, simulated_devices());
        engine.run()
    });

    let mut controller = SweepController::new(
        ChannelAcquisition::new(cmd_tx.clone()),
        HeadlessView::new(view_tx.clone()),
        view_rx,
        config,
    );
    controller.set_devices(simulated_devices())?;

    if band_plan_path.exists() {
        match load_band_plans(&band_plan_path) {
            Ok(plans) => {
                let first = plans.first().map(|p| p.name().to_string());
                controller.set_band_plans(plans);
                controller.select_band_plan(first.as_deref());
            }
            Err(err) => warn!("{err}"),
        }
    }

    controller.start()?;

    let mut script = SCRIPT.iter();
    let mut next_step = script.next();
    let mut deadline = controller.frames() + next_step.map_or(FINAL_FRAMES, |(n, _)| *n);

    while controller.is_running() && controller.frames() < deadline {
        if let Err(err) = controller.pump_view_events() {
            warn!("{err}");
        }

        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(event) => controller.on_engine_event(event)?,
            Err(flume::RecvTimeoutError::Timeout) => warn!("No data from the engine"),
            Err(flume::RecvTimeoutError::Disconnected) => anyhow::bail!("Engine stopped"),
        }

        if controller.frames() >= deadline {
            if let Some((_, gesture)) = next_step {
                info!("Gesture: {gesture:?}");
                view_tx.send(ViewEvent::Window(*gesture))?;
                next_step = script.next();
                deadline = controller.frames() + next_step.map_or(FINAL_FRAMES, |(n, _)| *n);
            }
        }
    }

    controller.stop()?;

    let measures = controller.measures();
    let rates = controller.rates();
    info!(
        "{} frames, window {} in {} mode, demodulator at {}, {} of {} sps, peak {:.1} dB",
        measures.frames,
        controller.window(),
        controller.mode(),
        measures.demod_freq,
        rates.measured_sample_rate,
        rates.sample_rate,
        controller.view().peak()
    );

    if let Err(err) = controller.export(&export_path) {
        warn!("{err}");
    }
    if let Err(err) = controller.save_config().save(&config_path) {
        warn!("{err}");
    }

    // Done - send shutdown command to engine
    let _ = cmd_tx.send(Command::Shutdown);
    drop(event_rx);

    // Wait for engine thread to finish
    match engine_handle.join() {
        Ok(result) => {
            if let Err(err) = result {
                // Frames in flight when the receiver went away
                debug!("Engine finished with {err}");
            }
        }
        Err(_) => anyhow::bail!("Engine thread panicked"),
    }

    Ok(())
}
