use flume::{Receiver, Sender};
use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use panoriq_engine::{Engine, FFT_SIZE, SyntheticSpectrum, Tone, simulated_devices};
use panoriq_messages::{
    AcquisitionMode, Command, Decibels, Device, Event, FrequencyRange, Hertz, StartRequest,
    WindowChange,
};

fn setup_engine() -> (Sender<Command>, Receiver<Event>, JoinHandle<anyhow::Result<()>>) {
    // Create channels
    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, event_rx) = flume::unbounded::<Event>();

    // Create and run engine in background thread
    let handle = thread::spawn(move || {
        let engine = Engine::new(cmd_rx, event_tx, simulated_devices());
        engine.run()
    });
    (cmd_tx, event_rx, handle)
}

fn teardown(cmd_tx: Sender<Command>, handle: JoinHandle<anyhow::Result<()>>) {
    cmd_tx.send(Command::Shutdown).unwrap();
    handle
        .join()
        .expect("Engine thread should not panic")
        .expect("Engine should exit cleanly");
}

fn window(min: i64, max: i64) -> WindowChange {
    WindowChange {
        window: FrequencyRange::new(Hertz(min), Hertz(max)),
        mode: AcquisitionMode::Sweep,
    }
}

fn start_request(device: Device, window: WindowChange) -> StartRequest {
    StartRequest {
        device,
        antenna: None,
        sample_rate: 2_400_000,
        lnb_offset: Hertz::ZERO,
        window,
        strategy: "stochastic".to_string(),
        partitioning: "discrete".to_string(),
        gains: BTreeMap::new(),
    }
}

fn rtl() -> Device {
    simulated_devices()
        .into_iter()
        .find(|d| d.driver == "rtlsdr")
        .expect("Simulated RTL device should exist")
}

/// Next event that is not a rate report.
fn next_event(event_rx: &Receiver<Event>) -> Event {
    loop {
        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::Rates(_)) => continue,
            Ok(event) => return event,
            Err(e) => panic!("Failed to receive event: {:?}", e),
        }
    }
}

#[test]
fn test_engine_construction() {
    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, event_rx) = flume::unbounded::<Event>();

    // Construct engine - should not panic
    let _engine = Engine::new(cmd_rx, event_tx, simulated_devices());

    // Cleanup
    drop(cmd_tx);
    drop(event_rx);
}

#[test]
fn test_engine_is_idle_until_started() {
    let (cmd_tx, event_rx, handle) = setup_engine();

    assert!(event_rx.recv_timeout(Duration::from_millis(300)).is_err());

    teardown(cmd_tx, handle);
}

#[test]
fn test_engine_rejects_unknown_device() {
    let (cmd_tx, event_rx, handle) = setup_engine();

    let mut device = rtl();
    device.desc = "Not plugged in".to_string();
    cmd_tx
        .send(Command::Start(start_request(device, window(88_000_000, 108_000_000))))
        .unwrap();

    match next_event(&event_rx) {
        Event::DeviceUnavailable(desc) => assert_eq!(desc, "Not plugged in"),
        other => panic!("Expected DeviceUnavailable, got {:?}", other),
    }

    teardown(cmd_tx, handle);
}

#[test]
fn test_engine_sends_frames_for_window() {
    let (cmd_tx, event_rx, handle) = setup_engine();
    cmd_tx.send(Command::SetRtt(Duration::from_millis(10))).unwrap();
    cmd_tx
        .send(Command::Start(start_request(rtl(), window(88_000_000, 108_000_000))))
        .unwrap();

    // First event is the StateSnapshot
    match next_event(&event_rx) {
        Event::StateSnapshot(state) => {
            assert_eq!(state.device, "Simulated RTL2832U");
            assert_eq!(state.window, window(88_000_000, 108_000_000));
            assert_eq!(state.sample_rate, 2_400_000);
            assert_eq!(state.fft_size, FFT_SIZE);
        }
        other => panic!("First event should be StateSnapshot, got {:?}", other),
    }

    // Verify we receive frames covering the window
    for _ in 0..5 {
        match next_event(&event_rx) {
            Event::Frame(frame) => {
                assert_eq!(frame.freq_start, Hertz(88_000_000));
                assert_eq!(frame.freq_end, Hertz(108_000_000));
                assert_eq!(frame.samples.len(), FFT_SIZE);
                assert!(frame.is_well_formed());
            }
            other => panic!("Expected a frame, got {:?}", other),
        }
    }

    teardown(cmd_tx, handle);
}

#[test]
fn test_engine_uses_supplied_spectrum() {
    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, event_rx) = flume::unbounded::<Event>();
    let spectrum = SyntheticSpectrum::with_seed(
        Decibels(-120.0),
        vec![Tone {
            freq: Hertz(98_000_000),
            width: Hertz(200_000),
            level: Decibels(-30.0),
        }],
        3,
    );
    let handle = thread::spawn(move || {
        let engine = Engine::new(cmd_rx, event_tx, simulated_devices()).with_spectrum(spectrum);
        engine.run()
    });

    cmd_tx.send(Command::SetRtt(Duration::from_millis(10))).unwrap();
    cmd_tx
        .send(Command::Start(start_request(rtl(), window(88_000_000, 108_000_000))))
        .unwrap();
    assert!(matches!(next_event(&event_rx), Event::StateSnapshot(_)));

    match next_event(&event_rx) {
        Event::Frame(frame) => {
            let peak = frame.samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            assert_eq!(peak, -30.0);
            // Only the carrier rises above the quiet floor
            let loud = frame.samples.iter().filter(|v| **v > -110.0).count();
            assert!(loud > 0 && loud < 20, "{loud} bins above the floor");
        }
        other => panic!("Expected a frame, got {:?}", other),
    }

    teardown(cmd_tx, handle);
}

#[test]
fn test_engine_follows_window_changes() {
    let (cmd_tx, event_rx, handle) = setup_engine();
    cmd_tx.send(Command::SetRtt(Duration::from_millis(10))).unwrap();
    cmd_tx
        .send(Command::Start(start_request(rtl(), window(88_000_000, 108_000_000))))
        .unwrap();
    assert!(matches!(next_event(&event_rx), Event::StateSnapshot(_)));

    let narrow = WindowChange {
        window: FrequencyRange::new(Hertz(99_000_000), Hertz(101_000_000)),
        mode: AcquisitionMode::FixedFrequency,
    };
    cmd_tx.send(Command::Configure(narrow)).unwrap();

    // Frames already queued may still show the old window
    loop {
        match next_event(&event_rx) {
            Event::Frame(_) => continue,
            Event::StateSnapshot(state) => {
                assert_eq!(state.window, narrow);
                break;
            }
            other => panic!("Unexpected event {:?}", other),
        }
    }

    match next_event(&event_rx) {
        Event::Frame(frame) => assert_eq!(frame.window(), narrow.window),
        other => panic!("Expected a frame, got {:?}", other),
    }

    teardown(cmd_tx, handle);
}

#[test]
fn test_engine_reports_rates() {
    let (cmd_tx, event_rx, handle) = setup_engine();
    cmd_tx.send(Command::SetRtt(Duration::from_millis(20))).unwrap();
    cmd_tx
        .send(Command::Start(start_request(rtl(), window(88_000_000, 108_000_000))))
        .unwrap();

    let report = loop {
        match event_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Event::Rates(report)) => break report,
            Ok(_) => continue,
            Err(e) => panic!("No rate report: {:?}", e),
        }
    };
    assert_eq!(report.sample_rate, 2_400_000);
    assert!(report.measured_sample_rate <= report.sample_rate);

    teardown(cmd_tx, handle);
}

#[test]
fn test_engine_exits_when_controller_drops() {
    let (cmd_tx, event_rx, handle) = setup_engine();

    // Cleanup: drop the command sender to stop engine
    drop(cmd_tx);
    let result = handle.join().expect("Engine thread should not panic");
    assert!(result.is_ok());
    drop(event_rx);
}
