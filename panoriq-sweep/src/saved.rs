use std::io::{self, Write};
use std::path::Path;

use log::info;
use panoriq_messages::Hertz;
use tempfile::NamedTempFile;

use crate::error::ExportError;

/// Significant digits written per sample, matching single precision.
const SAMPLE_DIGITS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    start: Hertz,
    end: Hertz,
    data: Vec<f32>,
}

/// The most recent accepted PSD window, kept for export.
#[derive(Debug, Default, Clone)]
pub struct SavedSpectrum {
    snapshot: Option<Snapshot>,
}

impl SavedSpectrum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held spectrum.
    pub fn set(&mut self, start: Hertz, end: Hertz, samples: &[f32]) {
        self.snapshot = Some(Snapshot {
            start,
            end,
            data: samples.to_vec(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn bounds(&self) -> Option<(Hertz, Hertz)> {
        self.snapshot.as_ref().map(|s| (s.start, s.end))
    }

    pub fn samples(&self) -> &[f32] {
        self.snapshot.as_ref().map_or(&[], |s| s.data.as_slice())
    }

    /// Write the spectrum as a MATLAB/Octave script.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        out.write_all(b"%\n% Panoramic Spectrum file generated by Panoriq\n%\n\n")?;
        writeln!(out, "freqMin = {};", snapshot.start.as_hz())?;
        writeln!(out, "freqMax = {};", snapshot.end.as_hz())?;
        out.write_all(b"PSD = [ ")?;
        for &value in &snapshot.data {
            write!(out, "{} ", format_g(f64::from(value), SAMPLE_DIGITS))?;
        }
        out.write_all(b"];\n")
    }

    /// Export to `path`. The file only appears once it has been written completely.
    pub fn export_to_file(&self, path: &Path) -> Result<(), ExportError> {
        if self.is_empty() {
            return Err(ExportError::Empty);
        }

        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomically(path, &buf).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Exported {} PSD samples to {}", self.samples().len(), path.display());
        Ok(())
    }
}

/// Write `contents` to a temporary file next to `path` and move it into place.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Format `value` the way C's `%.<precision>g` does.
pub(crate) fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    // Rounding to `precision` digits first decides the exponent, e.g. 9.9999996 -> 1e1
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
