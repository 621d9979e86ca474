use std::time::Duration;

use flume::Sender;
use log::debug;
use panoriq_messages::{Command, StartRequest, WindowChange};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("device `{0}` is not available")]
    Unavailable(String),

    #[error("acquisition engine is gone")]
    Disconnected,
}

/// The receiver side the controller drives.
pub trait Acquisition {
    fn configure_window(&mut self, change: WindowChange) -> Result<(), AcquisitionError>;

    fn start(&mut self, request: &StartRequest) -> Result<(), AcquisitionError>;

    fn stop(&mut self) -> Result<(), AcquisitionError>;

    fn set_gain(&mut self, _name: &str, _value: f32) -> Result<(), AcquisitionError> {
        Ok(())
    }

    fn set_rtt(&mut self, _rtt: Duration) -> Result<(), AcquisitionError> {
        Ok(())
    }

    fn set_relative_bandwidth(&mut self, _factor: f64) -> Result<(), AcquisitionError> {
        Ok(())
    }

    fn set_strategy(&mut self, _strategy: &str) -> Result<(), AcquisitionError> {
        Ok(())
    }

    fn set_partitioning(&mut self, _partitioning: &str) -> Result<(), AcquisitionError> {
        Ok(())
    }
}

/// Forwards every request as a [`Command`] to an engine thread.
///
/// Device availability is only known to the engine, which answers a start it
/// cannot honor with an `Event::DeviceUnavailable` rather than an error here.
#[derive(Debug, Clone)]
pub struct ChannelAcquisition {
    cmd_tx: Sender<Command>,
}

impl ChannelAcquisition {
    pub fn new(cmd_tx: Sender<Command>) -> Self {
        Self { cmd_tx }
    }

    fn send(&self, cmd: Command) -> Result<(), AcquisitionError> {
        debug!("Sending {cmd:?}");
        self.cmd_tx
            .send(cmd)
            .map_err(|_| AcquisitionError::Disconnected)
    }
}

impl Acquisition for ChannelAcquisition {
    fn configure_window(&mut self, change: WindowChange) -> Result<(), AcquisitionError> {
        self.send(Command::Configure(change))
    }

    fn start(&mut self, request: &StartRequest) -> Result<(), AcquisitionError> {
        self.send(Command::Start(request.clone()))
    }

    fn stop(&mut self) -> Result<(), AcquisitionError> {
        self.send(Command::Stop)
    }

    fn set_gain(&mut self, name: &str, value: f32) -> Result<(), AcquisitionError> {
        self.send(Command::SetGain {
            name: name.to_string(),
            value,
        })
    }

    fn set_rtt(&mut self, rtt: Duration) -> Result<(), AcquisitionError> {
        self.send(Command::SetRtt(rtt))
    }

    fn set_relative_bandwidth(&mut self, factor: f64) -> Result<(), AcquisitionError> {
        self.send(Command::SetRelativeBandwidth(factor))
    }

    fn set_strategy(&mut self, strategy: &str) -> Result<(), AcquisitionError> {
        self.send(Command::SetStrategy(strategy.to_string()))
    }

    fn set_partitioning(&mut self, partitioning: &str) -> Result<(), AcquisitionError> {
        self.send(Command::SetPartitioning(partitioning.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panoriq_messages::{AcquisitionMode, FrequencyRange, Hertz};

    #[test]
    fn test_requests_become_commands() {
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let mut acquisition = ChannelAcquisition::new(cmd_tx);

        let change = WindowChange {
            window: FrequencyRange::new(Hertz(1_000), Hertz(2_000)),
            mode: AcquisitionMode::Sweep,
        };
        acquisition.configure_window(change).unwrap();
        acquisition.set_gain("LNA", 12.5).unwrap();
        acquisition.stop().unwrap();

        assert!(matches!(cmd_rx.try_recv(), Ok(Command::Configure(c)) if c == change));
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(Command::SetGain { name, value }) if name == "LNA" && value == 12.5
        ));
        assert!(matches!(cmd_rx.try_recv(), Ok(Command::Stop)));
    }

    #[test]
    fn test_dropped_engine_is_reported() {
        let (cmd_tx, cmd_rx) = flume::unbounded();
        drop(cmd_rx);
        let mut acquisition = ChannelAcquisition::new(cmd_tx);
        assert!(matches!(
            acquisition.stop(),
            Err(AcquisitionError::Disconnected)
        ));
    }
}
