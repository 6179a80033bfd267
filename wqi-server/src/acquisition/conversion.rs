//! Spectral-to-parameter conversion policies
//!
//! Band reflectances become three normalized-difference indices, which a
//! versioned empirical policy maps onto the eight fields. Policies are
//! selected by name in `[remote] conversion`; outputs are rounded to two
//! decimals.

use super::remote::{BandStatistics, RemoteError};
use serde::{Deserialize, Serialize};
use std::fmt;
use wqi_common::ParameterSet;

/// Normalized-difference water and vegetation indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralIndices {
    /// (green - nir) / (green + nir)
    pub ndwi: f64,
    /// (nir - red) / (nir + red)
    pub ndvi: f64,
    /// (green - swir) / (green + swir)
    pub mndwi: f64,
}

fn normalized_difference(a: f64, b: f64, name: &str) -> Result<f64, RemoteError> {
    let sum = a + b;
    if sum == 0.0 {
        return Err(RemoteError::Malformed(format!("{} undefined: zero denominator", name)));
    }
    Ok((a - b) / sum)
}

impl SpectralIndices {
    pub fn from_bands(bands: &BandStatistics) -> Result<Self, RemoteError> {
        Ok(Self {
            ndwi: normalized_difference(bands.green, bands.nir, "NDWI")?,
            ndvi: normalized_difference(bands.nir, bands.red, "NDVI")?,
            mndwi: normalized_difference(bands.green, bands.swir, "MNDWI")?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionPolicy {
    /// Linear index formulas at constant 25 °C
    #[serde(rename = "empirical-v1")]
    EmpiricalV1,
    /// Red-band turbidity, temperature-dependent oxygen saturation and
    /// conductivity tied to TDS
    #[default]
    #[serde(rename = "empirical-v2")]
    EmpiricalV2,
}

impl fmt::Display for ConversionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionPolicy::EmpiricalV1 => write!(f, "empirical-v1"),
            ConversionPolicy::EmpiricalV2 => write!(f, "empirical-v2"),
        }
    }
}

const ASSUMED_WATER_TEMP: f64 = 25.0;
const CHLORINE_DEFAULT: f64 = 0.8;
const TDS_TO_CONDUCTIVITY: f64 = 1.31;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Oxygen solubility in fresh water (mg/L) at `t` °C, sea-level pressure
fn do_saturation(t: f64) -> f64 {
    14.652 - 0.41022 * t + 0.007991 * t * t - 0.000_077_774 * t * t * t
}

impl ConversionPolicy {
    pub fn convert(&self, bands: &BandStatistics) -> Result<ParameterSet, RemoteError> {
        let idx = SpectralIndices::from_bands(bands)?;
        let params = match self {
            ConversionPolicy::EmpiricalV1 => ParameterSet {
                ph: 7.0 + idx.ndvi * 0.5,
                turbidity: ((1.0 - idx.ndwi) * 10.0).max(0.1),
                tds: 300.0 + (1.0 - idx.mndwi) * 200.0,
                dissolved_oxygen: 8.0 - idx.ndvi * 2.0,
                temperature: ASSUMED_WATER_TEMP,
                conductivity: 600.0 + (1.0 - idx.mndwi) * 400.0,
                chlorine: CHLORINE_DEFAULT,
                nitrate: 5.0 + (1.0 - idx.ndvi) * 3.0,
            },
            ConversionPolicy::EmpiricalV2 => {
                let tds = 300.0 + (1.0 - idx.mndwi) * 200.0;
                let oxygen = do_saturation(ASSUMED_WATER_TEMP) * (1.0 - 0.15 * idx.ndvi.max(0.0));
                ParameterSet {
                    ph: 7.0 + idx.ndvi * 0.5,
                    turbidity: (250.0 * bands.red.max(0.0).powf(1.3)).max(0.1),
                    tds,
                    dissolved_oxygen: oxygen.max(1.0),
                    temperature: ASSUMED_WATER_TEMP,
                    conductivity: tds * TDS_TO_CONDUCTIVITY,
                    chlorine: CHLORINE_DEFAULT,
                    nitrate: 5.0 + (1.0 - idx.ndvi) * 3.0,
                }
            }
        };

        let rounded = ParameterSet::from_array(params.to_array().map(round2));
        if !rounded.is_finite() {
            return Err(RemoteError::Malformed(format!("{} produced non-finite parameters", self)));
        }
        Ok(rounded)
    }
}
