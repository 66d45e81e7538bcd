//! Modulation proximity: how close two pitches sound, unison and octave alike
//!
//! Proximity is the maximum of a handful of bands, each a bell around an
//! interval centre scaled by its weight, plus a raised-cosine tail that fades
//! from the minor seventh to nothing at the octave. The ordering
//! fifth > fourth > major third > minor seventh is the contract; the bell
//! width and weights are tunable.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{Result, TonegraphError};
use crate::interval::CENTS_EPSILON;

const FIFTH_CENTS: f64 = 700.0;
const FOURTH_CENTS: f64 = 500.0;
const MAJOR_THIRD_CENTS: f64 = 400.0;
const MINOR_SEVENTH_CENTS: f64 = 1000.0;
const OCTAVE_CENTS: f64 = 1200.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationBands {
    pub fifth: f64,
    pub fourth: f64,
    pub major_third: f64,
    pub minor_seventh: f64,
    /// Width of each bell in cents
    pub band_width_cents: f64,
}

impl Default for ModulationBands {
    fn default() -> Self {
        Self {
            fifth: 0.8,
            fourth: 0.62,
            major_third: 0.45,
            minor_seventh: 0.3,
            band_width_cents: 30.0,
        }
    }
}

impl ModulationBands {
    /// Weights must fall strictly from unison (1.0) through the seventh
    pub fn validate(&self) -> Result<()> {
        let chain = [1.0, self.fifth, self.fourth, self.major_third, self.minor_seventh, 0.0];
        if chain.iter().any(|w| !w.is_finite()) || chain.windows(2).any(|w| w[0] <= w[1]) {
            return Err(TonegraphError::InvalidConfig(format!(
                "band weights must strictly decrease from unison: {:?}",
                &chain[1..5]
            )));
        }
        if !self.band_width_cents.is_finite() || self.band_width_cents <= 0.0 {
            return Err(TonegraphError::InvalidConfig(format!(
                "band width must be positive, got {}",
                self.band_width_cents
            )));
        }
        Ok(())
    }

    fn bell(&self, distance: f64) -> f64 {
        let x = distance / self.band_width_cents;
        (-x * x).exp()
    }

    /// Proximity in `[0, 1]` for an interval of `cents`, any direction or
    /// octave. 1.0 for unison and octaves.
    pub fn proximity(&self, cents: f64) -> f64 {
        if !cents.is_finite() {
            return 0.0;
        }
        let mut c = cents.rem_euclid(OCTAVE_CENTS);
        // only float noise below a whole octave counts as the octave itself
        if OCTAVE_CENTS - c < CENTS_EPSILON {
            c = 0.0;
        }

        let unison = self.bell(c);
        let banded = [
            (FIFTH_CENTS, self.fifth),
            (FOURTH_CENTS, self.fourth),
            (MAJOR_THIRD_CENTS, self.major_third),
            (MINOR_SEVENTH_CENTS, self.minor_seventh),
        ]
        .into_iter()
        .map(|(centre, weight)| weight * self.bell((c - centre).abs()))
        .fold(unison, f64::max);

        let tail = if c > MINOR_SEVENTH_CENTS {
            let t = (c - MINOR_SEVENTH_CENTS) / (OCTAVE_CENTS - MINOR_SEVENTH_CENTS);
            self.minor_seventh * 0.5 * (1.0 + (PI * t).cos())
        } else {
            0.0
        };

        banded.max(tail).clamp(0.0, 1.0)
    }
}
