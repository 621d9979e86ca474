use panoriq_messages::{Decibels, FrequencyRange, Hertz};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A carrier present in the simulated band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freq: Hertz,
    /// Occupied bandwidth
    pub width: Hertz,
    pub level: Decibels,
}

/// Generates PSD windows: a noisy floor with a few fixed carriers on top.
pub struct SyntheticSpectrum {
    rng: StdRng,
    noise_floor: Decibels,
    /// Peak-to-peak noise ripple in dB
    ripple: f32,
    tones: Vec<Tone>,
}

impl SyntheticSpectrum {
    pub fn new(noise_floor: Decibels, tones: Vec<Tone>) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            noise_floor,
            ripple: 6.0,
            tones,
        }
    }

    /// Same as [`SyntheticSpectrum::new`] with a reproducible noise sequence.
    pub fn with_seed(noise_floor: Decibels, tones: Vec<Tone>, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(noise_floor, tones)
        }
    }

    /// A few broadcast and utility carriers spread over the HF to UHF range.
    pub fn with_default_tones() -> Self {
        let tone = |mhz: f64, khz_wide: i64, db: f32| Tone {
            freq: Hertz((mhz * 1e6) as i64),
            width: Hertz::khz(khz_wide),
            level: Decibels(db),
        };
        Self::new(
            Decibels(-100.0),
            vec![
                tone(7.1, 3, -60.0),
                tone(89.1, 200, -45.0),
                tone(95.8, 200, -50.0),
                tone(104.3, 200, -40.0),
                tone(162.4, 25, -65.0),
                tone(433.92, 10, -55.0),
                tone(1090.0, 1000, -62.0),
            ],
        )
    }

    /// One PSD line of `bins` samples over `window`, shifted by `gain` dB.
    pub fn generate(&mut self, window: FrequencyRange, bins: usize, gain: f32) -> Vec<f32> {
        if bins == 0 {
            return Vec::new();
        }

        let start = window.min().as_hz() as f64;
        let bin_width = window.width().as_hz().max(1) as f64 / bins as f64;
        let half_ripple = self.ripple / 2.0;

        (0..bins)
            .map(|i| {
                let lo = start + i as f64 * bin_width;
                let hi = lo + bin_width;
                let noise = self.noise_floor.0 + self.rng.gen_range(-half_ripple..=half_ripple);
                let carrier = self
                    .tones
                    .iter()
                    .filter(|t| overlaps(t, lo, hi))
                    .map(|t| t.level.0)
                    .fold(f32::NEG_INFINITY, f32::max);
                noise.max(carrier) + gain
            })
            .collect()
    }
}

fn overlaps(tone: &Tone, lo: f64, hi: f64) -> bool {
    let half = tone.width.as_hz() as f64 / 2.0;
    let center = tone.freq.as_hz() as f64;
    center - half < hi && center + half >= lo
}
