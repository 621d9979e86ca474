//! Frequency allocation tables drawn over the spectrum.
//!
//! Plans are read from TOML:
//!
//! ```toml
//! [[table]]
//! name = "ITU Region 1"
//!
//! [[table.band]]
//! min = 87500000
//! max = 108000000
//! primary = "BROADCASTING"
//! color = "#3f0000"
//! ```

use std::fs;
use std::path::Path;

use log::{debug, warn};
use panoriq_messages::{FrequencyRange, Hertz};
use toml::{Table, Value};

use crate::config::as_frequency;
use crate::error::ConfigError;

pub const DEFAULT_BAND_COLOR: &str = "#1f1f1f";

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBand {
    pub range: FrequencyRange,
    pub primary: String,
    pub secondary: String,
    pub footnotes: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAllocationTable {
    name: String,
    bands: Vec<FrequencyBand>,
}

impl FrequencyAllocationTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, band: FrequencyBand) {
        self.bands.push(band);
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    /// Bands overlapping `window`, in table order.
    pub fn bands_in(&self, window: FrequencyRange) -> impl Iterator<Item = &FrequencyBand> {
        self.bands
            .iter()
            .filter(move |band| band.range.min() <= window.max() && band.range.max() >= window.min())
    }
}

pub fn load_band_plans(path: &Path) -> Result<Vec<FrequencyAllocationTable>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_band_plans(&text)
}

/// Parse every `[[table]]` in `text`. Only a syntax error fails the whole
/// document; unusable tables and bands are skipped.
pub fn parse_band_plans(text: &str) -> Result<Vec<FrequencyAllocationTable>, ConfigError> {
    let document: Table = toml::from_str(text)?;

    let Some(tables) = document.get("table") else {
        return Ok(Vec::new());
    };
    let Some(tables) = tables.as_array() else {
        warn!("Band plan file: `table` must be an array of tables");
        return Ok(Vec::new());
    };

    let plans: Vec<_> = tables
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| parse_table(index, entry))
        .collect();
    debug!("Loaded {} band plans", plans.len());
    Ok(plans)
}

fn parse_table(index: usize, entry: &Value) -> Option<FrequencyAllocationTable> {
    let Some(name) = entry.get("name").and_then(Value::as_str) else {
        warn!("Band plan #{index} has no name, skipping");
        return None;
    };

    let mut table = FrequencyAllocationTable::new(name);
    let bands = entry.get("band").and_then(Value::as_array);
    for (i, band) in bands.into_iter().flatten().enumerate() {
        match parse_band(band) {
            Some(band) => table.push(band),
            None => warn!("{name}: band #{i} is malformed, skipping"),
        }
    }
    Some(table)
}

fn parse_band(entry: &Value) -> Option<FrequencyBand> {
    let min = entry.get("min").and_then(as_frequency)?;
    let max = entry.get("max").and_then(as_frequency)?;
    let text = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let color = entry
        .get("color")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_BAND_COLOR)
        .to_string();

    Some(FrequencyBand {
        range: FrequencyRange::new(Hertz(min), Hertz(max)),
        primary: text("primary"),
        secondary: text("secondary"),
        footnotes: text("footnotes"),
        color,
    })
}
