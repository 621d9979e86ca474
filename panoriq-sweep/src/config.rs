use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use toml::{Table, Value};

use crate::error::ConfigError;
use crate::saved::write_atomically;

const GAIN_PREFIX: &str = "gain.";

/// Application configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lag_filter: LagFilterConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
    #[serde(default)]
    pub panoramic: PanoramicConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml_string()?;
        write_atomically(path, text.as_bytes()).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Stale frame suppression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagFilterConfig {
    #[serde(default = "default_lag_filter_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_lag_ms")]
    pub max_lag_ms: u64,
}

impl Default for LagFilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_lag_filter_enabled(),
            max_lag_ms: default_max_lag_ms(),
        }
    }
}

fn default_lag_filter_enabled() -> bool {
    true
}

fn default_max_lag_ms() -> u64 {
    100
}

/// Sweep/fixed-frequency switching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Bandwidth acquired in fixed-frequency mode, in Hz
    #[serde(default = "default_min_bw_for_zoom")]
    pub min_bw_for_zoom: i64,
    /// Percentage of `min_bw_for_zoom` below which zooming holds the center frequency
    #[serde(default = "default_relative_bandwidth")]
    pub relative_bandwidth: u32,
    /// Ceiling for the demodulator cut shown in sweep mode, in Hz
    #[serde(default = "default_demod_bw_cap")]
    pub demod_bw_cap: i64,
}

impl ZoomConfig {
    pub fn relative_bandwidth_factor(&self) -> f64 {
        f64::from(self.relative_bandwidth.clamp(1, 100)) / 100.0
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_bw_for_zoom: default_min_bw_for_zoom(),
            relative_bandwidth: default_relative_bandwidth(),
            demod_bw_cap: default_demod_bw_cap(),
        }
    }
}

fn default_min_bw_for_zoom() -> i64 {
    2_000_000
}

fn default_relative_bandwidth() -> u32 {
    100
}

fn default_demod_bw_cap() -> i64 {
    4_000_000_000
}

/// Persisted state of the panoramic spectrum session.
///
/// Stored as a flat key/value table so that per-driver gains can live next to
/// the fixed keys as `gain.<driver>.<name>` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PanoramicConfig {
    pub full_range: bool,
    pub range_min: i64,
    pub range_max: i64,
    pub pan_range_min: f32,
    pub pan_range_max: f32,
    pub lnb_freq: i64,
    pub device: String,
    pub antenna: String,
    pub samp_rate: u32,
    pub strategy: String,
    pub partitioning: String,
    pub palette: String,
    gains: BTreeMap<String, f32>,
}

impl Default for PanoramicConfig {
    fn default() -> Self {
        Self {
            full_range: false,
            range_min: 88_000_000,
            range_max: 108_000_000,
            pan_range_min: -90.0,
            pan_range_max: -10.0,
            lnb_freq: 0,
            device: String::new(),
            antenna: String::new(),
            samp_rate: 8_000_000,
            strategy: "stochastic".to_string(),
            partitioning: "discrete".to_string(),
            palette: "Suscan".to_string(),
            gains: BTreeMap::new(),
        }
    }
}

impl PanoramicConfig {
    fn gain_key(driver: &str, name: &str) -> String {
        format!("{GAIN_PREFIX}{driver}.{name}")
    }

    pub fn has_gain(&self, driver: &str, name: &str) -> bool {
        self.gains.contains_key(&Self::gain_key(driver, name))
    }

    pub fn gain(&self, driver: &str, name: &str) -> Option<f32> {
        self.gains.get(&Self::gain_key(driver, name)).copied()
    }

    pub fn set_gain(&mut self, driver: &str, name: &str, value: f32) {
        self.gains.insert(Self::gain_key(driver, name), value);
    }

    /// Overwrite fields present in `table`. Missing keys keep their current value,
    /// unknown keys are ignored and mistyped ones are reported and skipped.
    pub fn deserialize_from(&mut self, table: &Table) {
        load_bool(table, "fullRange", &mut self.full_range);
        load_frequency(table, "rangeMin", &mut self.range_min);
        load_frequency(table, "rangeMax", &mut self.range_max);
        load_float(table, "panRangeMin", &mut self.pan_range_min);
        load_float(table, "panRangeMax", &mut self.pan_range_max);
        load_frequency(table, "lnbFreq", &mut self.lnb_freq);
        load_string(table, "device", &mut self.device);
        load_string(table, "antenna", &mut self.antenna);
        load_rate(table, "sampRate", &mut self.samp_rate);
        load_string(table, "strategy", &mut self.strategy);
        load_string(table, "partitioning", &mut self.partitioning);
        load_string(table, "palette", &mut self.palette);

        for (key, value) in table.iter().filter(|(k, _)| k.starts_with(GAIN_PREFIX)) {
            match as_float(value) {
                Some(gain) => {
                    self.gains.insert(key.clone(), gain as f32);
                }
                None => warn!("Ignoring gain `{key}`: expected a number, got {value}"),
            }
        }
    }

    pub fn serialize_to(&self) -> Table {
        let mut table = Table::new();
        table.insert("fullRange".into(), Value::Boolean(self.full_range));
        table.insert("rangeMin".into(), Value::Integer(self.range_min));
        table.insert("rangeMax".into(), Value::Integer(self.range_max));
        table.insert("panRangeMin".into(), Value::Float(f64::from(self.pan_range_min)));
        table.insert("panRangeMax".into(), Value::Float(f64::from(self.pan_range_max)));
        table.insert("lnbFreq".into(), Value::Integer(self.lnb_freq));
        table.insert("device".into(), Value::String(self.device.clone()));
        table.insert("antenna".into(), Value::String(self.antenna.clone()));
        table.insert("sampRate".into(), Value::Integer(i64::from(self.samp_rate)));
        table.insert("strategy".into(), Value::String(self.strategy.clone()));
        table.insert("partitioning".into(), Value::String(self.partitioning.clone()));
        table.insert("palette".into(), Value::String(self.palette.clone()));
        for (key, gain) in &self.gains {
            table.insert(key.clone(), Value::Float(f64::from(*gain)));
        }
        table
    }
}

impl Serialize for PanoramicConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serialize_to().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PanoramicConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let table = Table::deserialize(deserializer)?;
        let mut config = PanoramicConfig::default();
        config.deserialize_from(&table);
        Ok(config)
    }
}

/// Integer or float, as a whole number of Hertz.
pub(crate) fn as_frequency(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.is_finite() => Some(f.round() as i64),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn mistyped(key: &str, expected: &str, value: &Value) {
    warn!("Ignoring config key `{key}`: expected {expected}, got {value}");
}

fn load_bool(table: &Table, key: &str, field: &mut bool) {
    match table.get(key) {
        Some(Value::Boolean(b)) => *field = *b,
        Some(other) => mistyped(key, "a boolean", other),
        None => debug!("Config key `{key}` missing, keeping {field}"),
    }
}

fn load_string(table: &Table, key: &str, field: &mut String) {
    match table.get(key) {
        Some(Value::String(s)) => field.clone_from(s),
        Some(other) => mistyped(key, "a string", other),
        None => debug!("Config key `{key}` missing, keeping `{field}`"),
    }
}

fn load_frequency(table: &Table, key: &str, field: &mut i64) {
    let Some(value) = table.get(key) else {
        return;
    };
    match as_frequency(value) {
        Some(freq) => *field = freq,
        None => mistyped(key, "a frequency", value),
    }
}

fn load_float(table: &Table, key: &str, field: &mut f32) {
    let Some(value) = table.get(key) else {
        return;
    };
    match as_float(value) {
        Some(f) => *field = f as f32,
        None => mistyped(key, "a number", value),
    }
}

fn load_rate(table: &Table, key: &str, field: &mut u32) {
    let Some(value) = table.get(key) else {
        return;
    };
    match as_frequency(value).and_then(|rate| u32::try_from(rate).ok()) {
        Some(rate) => *field = rate,
        None => mistyped(key, "a sample rate", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.lag_filter, LagFilterConfig::default());
        assert_eq!(config.zoom, ZoomConfig::default());
        assert_eq!(config.panoramic, PanoramicConfig::default());
    }

    #[test]
    fn test_panoramic_keys_and_gains() {
        let config = Config::from_toml_str(
            r#"
            [lag_filter]
            max_lag_ms = 50

            [panoramic]
            fullRange = true
            rangeMin = 24000000
            rangeMax = 1.766e9
            device = "Generic RTL2832U"
            sampRate = 2400000
            somethingElse = "ignored"
            "gain.rtlsdr.LNA" = 29.7
            "gain.airspy.MIX" = 5
            "#,
        )
        .unwrap();

        assert!(config.lag_filter.enabled);
        assert_eq!(config.lag_filter.max_lag_ms, 50);

        let panoramic = &config.panoramic;
        assert!(panoramic.full_range);
        assert_eq!(panoramic.range_min, 24_000_000);
        assert_eq!(panoramic.range_max, 1_766_000_000);
        assert_eq!(panoramic.device, "Generic RTL2832U");
        assert_eq!(panoramic.samp_rate, 2_400_000);
        assert_eq!(panoramic.palette, PanoramicConfig::default().palette);
        assert_eq!(panoramic.gain("rtlsdr", "LNA"), Some(29.7));
        assert_eq!(panoramic.gain("airspy", "MIX"), Some(5.0));
        assert!(!panoramic.has_gain("rtlsdr", "MIX"));
    }

    #[test]
    fn test_mistyped_keys_keep_current_value() {
        let mut panoramic = PanoramicConfig {
            range_min: 1_000,
            ..PanoramicConfig::default()
        };
        let table: Table = toml::from_str(
            r#"
            rangeMin = "a lot"
            fullRange = 1
            antenna = "RX2"
            sampRate = -5
            "gain.hackrf.VGA" = "loud"
            "#,
        )
        .unwrap();

        panoramic.deserialize_from(&table);

        assert_eq!(panoramic.range_min, 1_000);
        assert!(!panoramic.full_range);
        assert_eq!(panoramic.antenna, "RX2");
        assert_eq!(panoramic.samp_rate, PanoramicConfig::default().samp_rate);
        assert!(!panoramic.has_gain("hackrf", "VGA"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panoriq.toml");

        let mut config = Config::default();
        config.zoom.relative_bandwidth = 40;
        config.panoramic.lnb_freq = -9_750_000_000;
        config.panoramic.set_gain("hackrf", "LNA", 16.0);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.zoom.relative_bandwidth, 40);
        assert_eq!(loaded.panoramic, config.panoramic);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_relative_bandwidth_factor_is_clamped() {
        let mut zoom = ZoomConfig::default();
        assert_eq!(zoom.relative_bandwidth_factor(), 1.0);
        zoom.relative_bandwidth = 0;
        assert_eq!(zoom.relative_bandwidth_factor(), 0.01);
        zoom.relative_bandwidth = 250;
        assert_eq!(zoom.relative_bandwidth_factor(), 1.0);
    }
}
