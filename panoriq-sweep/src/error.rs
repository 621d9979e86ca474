use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::acquisition::AcquisitionError;

/// Errors surfaced to the operator by the sweep controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no device selected")]
    NoDevice,

    #[error("unknown device `{0}`")]
    UnknownDevice(String),

    #[error("the selected device has no antenna `{0}`")]
    UnknownAntenna(String),

    #[error("scan cannot start because `{0}` is in use by another session")]
    DeviceInUse(String),

    #[error("cannot change the {0} while the scan is running")]
    Busy(&'static str),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Failure to write a spectrum export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no spectrum has been captured yet")]
    Empty,

    #[error("cannot save spectrum to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to read or write the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
