// src/analysis/bands.rs
//! Band table and trapezoidal band-power integration.
//!
//! Every band is the half-open interval `[low_hz, high_hz)`. The membership test
//! lives in [`FrequencyBand::contains`] and nothing else decides which bins belong
//! to a band. Two or more bins are integrated with the trapezoidal rule. A single
//! bin is weighted by the width the full-range trapezoid gives it
//! ([`SpectralEstimate::bin_width_hz`]), so coarse spectra still report power and the
//! band sum never exceeds [`SpectralEstimate::total_power`]. A band whose interval
//! holds no bin integrates to exactly `0.0`.

use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::analysis::spectrum::{trapezoid, SpectralEstimate};
use crate::analysis::ScreeningError;
use crate::types::BandName;

static DEFAULT_BANDS: Lazy<Vec<FrequencyBand>> = Lazy::new(|| {
    vec![
        FrequencyBand::new(BandName::Delta, 0.5, 4.0),
        FrequencyBand::new(BandName::Theta, 4.0, 8.0),
        FrequencyBand::new(BandName::Alpha, 8.0, 13.0),
        FrequencyBand::new(BandName::Beta, 13.0, 30.0),
        FrequencyBand::new(BandName::Gamma, 30.0, 45.0),
    ]
});

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: BandName,
    /// Inclusive.
    pub low_hz: f64,
    /// Exclusive.
    pub high_hz: f64,
}

impl FrequencyBand {
    pub const fn new(name: BandName, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name,
            low_hz,
            high_hz,
        }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz < self.high_hz
    }
}

/// Ordered set of bands used for integration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandTable {
    bands: Vec<FrequencyBand>,
}

impl Default for BandTable {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS.clone(),
        }
    }
}

impl BandTable {
    pub fn new(bands: Vec<FrequencyBand>) -> Result<Self, ScreeningError> {
        let table = Self { bands };
        table.validate()?;
        Ok(table)
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn get(&self, name: BandName) -> Option<&FrequencyBand> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn lowest_edge_hz(&self) -> Option<f64> {
        self.bands.iter().map(|b| b.low_hz).reduce(f64::min)
    }

    /// Bands must be ascending, non-overlapping, uniquely named, and include
    /// theta, alpha and beta (the ratio inputs).
    pub fn validate(&self) -> Result<(), ScreeningError> {
        for band in &self.bands {
            if !(band.low_hz >= 0.0 && band.low_hz < band.high_hz && band.high_hz.is_finite()) {
                return Err(ScreeningError::InvalidConfig(format!(
                    "band {} has invalid edges [{}, {})",
                    band.name, band.low_hz, band.high_hz
                )));
            }
        }
        for pair in self.bands.windows(2) {
            if pair[1].low_hz < pair[0].high_hz {
                return Err(ScreeningError::InvalidConfig(format!(
                    "band {} overlaps or precedes band {}",
                    pair[1].name, pair[0].name
                )));
            }
        }
        for (i, band) in self.bands.iter().enumerate() {
            if self.bands[..i].iter().any(|b| b.name == band.name) {
                return Err(ScreeningError::InvalidConfig(format!(
                    "band {} listed twice",
                    band.name
                )));
            }
        }
        for required in [BandName::Theta, BandName::Alpha, BandName::Beta] {
            if self.get(required).is_none() {
                return Err(ScreeningError::InvalidConfig(format!(
                    "band table is missing {required}"
                )));
            }
        }
        Ok(())
    }

    pub fn integrate(&self, estimate: &SpectralEstimate) -> BandPowers {
        let freqs = estimate.frequencies_hz();
        let power = estimate.power();
        let entries = self
            .bands
            .iter()
            .map(|band| {
                let first = freqs.iter().position(|&f| band.contains(f));
                let bins = freqs.iter().filter(|&&f| band.contains(f)).count();
                let value = match (first, bins) {
                    (Some(start), 1) => power[start] * estimate.bin_width_hz(start),
                    (Some(start), _) => {
                        let end = start + bins;
                        trapezoid(&freqs[start..end], &power[start..end])
                    }
                    (None, _) => {
                        warn!(
                            "no spectral bin inside {} [{}, {}) Hz at {:.3} Hz resolution",
                            band.name,
                            band.low_hz,
                            band.high_hz,
                            estimate.resolution_hz()
                        );
                        0.0
                    }
                };
                BandPower {
                    band: band.name,
                    low_hz: band.low_hz,
                    high_hz: band.high_hz,
                    power: value,
                    bins,
                }
            })
            .collect::<Vec<_>>();
        let powers = BandPowers { entries };
        debug!("band powers: {powers}");
        powers
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BandPower {
    pub band: BandName,
    pub low_hz: f64,
    pub high_hz: f64,
    pub power: f64,
    pub bins: usize,
}

/// Integrated power per band, in band-table order. Serializes as `{name: power}`.
#[derive(Clone, Debug, PartialEq)]
pub struct BandPowers {
    entries: Vec<BandPower>,
}

impl BandPowers {
    pub fn get(&self, band: BandName) -> Option<f64> {
        self.entries.iter().find(|e| e.band == band).map(|e| e.power)
    }

    /// Power of `band`, `0.0` when the table has no such band.
    pub fn power(&self, band: BandName) -> f64 {
        self.get(band).unwrap_or(0.0)
    }

    pub fn entries(&self) -> &[BandPower] {
        &self.entries
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().fold(0.0, |acc, e| acc + e.power)
    }

    /// Each band's share of the summed band power. All zero when nothing was integrated.
    pub fn relative(&self) -> Vec<(BandName, f64)> {
        let total = self.total();
        self.entries
            .iter()
            .map(|e| {
                let share = if total > 0.0 { e.power / total } else { 0.0 };
                (e.band, share)
            })
            .collect()
    }

    pub fn dominant(&self) -> Option<BandName> {
        self.entries
            .iter()
            .filter(|e| e.power > 0.0)
            .max_by(|a, b| a.power.total_cmp(&b.power))
            .map(|e| e.band)
    }
}

impl Serialize for BandPowers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.band, &entry.power)?;
        }
        map.end()
    }
}

impl std::fmt::Display for BandPowers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:.4}", entry.band, entry.power)?;
        }
        Ok(())
    }
}
