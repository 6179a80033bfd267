//! Tier 3: simulated readings
//!
//! Seasonal and diurnal temperature model with per-field noise around the
//! river's empirical means. Never fails; every draw is floored at a physical
//! minimum.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;
use wqi_common::ParameterSet;

/// Season bucket for a month (1-12)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Summer,
    Winter,
    Transitional,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            4..=6 => Season::Summer,
            12 | 1 | 2 => Season::Winter,
            _ => Season::Transitional,
        }
    }

    /// Shift applied to the baseline water temperature (°C)
    pub fn temperature_shift(self) -> f64 {
        match self {
            Season::Summer => 5.0,
            Season::Winter => -7.0,
            Season::Transitional => 0.0,
        }
    }
}

const BASE_TEMP: f64 = 22.0;
const DIURNAL_AMPLITUDE: f64 = 3.0;
const DIURNAL_PEAK_HOUR: f64 = 14.0;

pub const TURBIDITY_FLOOR: f64 = 0.1;
pub const DO_FLOOR: f64 = 1.0;
const TDS_FLOOR: f64 = 10.0;

/// Diurnal term: +amplitude at 14:00, -amplitude at 02:00
fn diurnal(hour: f64) -> f64 {
    DIURNAL_AMPLITUDE * (2.0 * PI * (hour - DIURNAL_PEAK_HOUR) / 24.0).cos()
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    mean + std_dev * z
}

/// Stateless reading generator
#[derive(Debug, Clone, Default)]
pub struct ReadingSimulator;

impl ReadingSimulator {
    /// Mean water temperature expected at a local time
    pub fn expected_temperature(at_local: &NaiveDateTime) -> f64 {
        let hour = f64::from(at_local.hour()) + f64::from(at_local.minute()) / 60.0;
        BASE_TEMP + Season::from_month(at_local.month()).temperature_shift() + diurnal(hour)
    }

    /// Draw one reading for a local time
    pub fn simulate<R: Rng + ?Sized>(&self, at_local: &NaiveDateTime, rng: &mut R) -> ParameterSet {
        let temperature = Self::expected_temperature(at_local) + gaussian(rng, 0.0, 0.5);

        // Log-normal, median 2.0 NTU
        let turbidity = gaussian(rng, 2.0f64.ln(), 0.5).exp().max(TURBIDITY_FLOOR);

        let tds = gaussian(rng, 350.0, 60.0).max(TDS_FLOOR);
        // Warmer water holds less oxygen
        let dissolved_oxygen = gaussian(rng, 8.5 - 0.1 * (temperature - BASE_TEMP), 0.8).max(DO_FLOOR);
        let conductivity = (tds * gaussian(rng, 1.31, 0.05)).max(0.0);

        ParameterSet {
            ph: gaussian(rng, 7.5, 0.3).max(0.0),
            turbidity,
            tds,
            dissolved_oxygen,
            temperature: temperature.max(0.0),
            conductivity,
            chlorine: gaussian(rng, 0.8, 0.15).max(0.0),
            nitrate: gaussian(rng, 4.0, 1.0).max(0.0),
        }
    }
}
