//! Semitone-plus-cents intervals

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TonegraphError};

/// Tolerance used when comparing widths in cents
pub const CENTS_EPSILON: f64 = 1e-6;

/// An immutable distance between two pitches, spelled as whole semitones plus
/// a cent remainder.
///
/// Structural equality compares the spelling, so `2 semitones + 0 cents` and
/// `1 semitone + 100 cents` are different intervals with the same width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    semitones: i32,
    cents: f64,
}

impl Interval {
    pub const UNISON: Interval = Interval::from_semitones(0);
    pub const MINOR_SECOND: Interval = Interval::from_semitones(1);
    pub const MAJOR_SECOND: Interval = Interval::from_semitones(2);
    pub const MINOR_THIRD: Interval = Interval::from_semitones(3);
    pub const MAJOR_THIRD: Interval = Interval::from_semitones(4);
    pub const PERFECT_FOURTH: Interval = Interval::from_semitones(5);
    pub const TRITONE: Interval = Interval::from_semitones(6);
    pub const PERFECT_FIFTH: Interval = Interval::from_semitones(7);
    pub const MINOR_SIXTH: Interval = Interval::from_semitones(8);
    pub const MAJOR_SIXTH: Interval = Interval::from_semitones(9);
    pub const MINOR_SEVENTH: Interval = Interval::from_semitones(10);
    pub const MAJOR_SEVENTH: Interval = Interval::from_semitones(11);
    pub const OCTAVE: Interval = Interval::from_semitones(12);

    /// Create an interval from a semitone count and a cent remainder.
    ///
    /// Fails when the cent part reverses the direction given by the semitone
    /// count (e.g. `+2` semitones with `-250` cents), or when `cents` is not
    /// finite.
    pub fn new(semitones: i32, cents: f64) -> Result<Self> {
        if !cents.is_finite() {
            return Err(TonegraphError::InvalidInterval { semitones, cents });
        }
        let width = semitones as f64 * 100.0 + cents;
        let reversed = (semitones > 0 && width < -CENTS_EPSILON)
            || (semitones < 0 && width > CENTS_EPSILON);
        if reversed {
            return Err(TonegraphError::InvalidInterval { semitones, cents });
        }
        Ok(Self { semitones, cents })
    }

    /// Whole-semitone interval
    pub const fn from_semitones(semitones: i32) -> Self {
        Self { semitones, cents: 0.0 }
    }

    /// Split a width into the nearest semitone count and a remainder in
    /// `[-50, 50]` cents.
    pub fn from_cents(width: f64) -> Result<Self> {
        let rounded = (width / 100.0).round();
        if !width.is_finite() || rounded.abs() > i32::MAX as f64 {
            return Err(TonegraphError::InvalidInterval { semitones: 0, cents: width });
        }
        let semitones = rounded as i32;
        Self::new(semitones, width - semitones as f64 * 100.0)
    }

    pub fn semitones(&self) -> i32 {
        self.semitones
    }

    pub fn cents(&self) -> f64 {
        self.cents
    }

    /// Total width: `semitones * 100 + cents`
    pub fn width_in_cents(&self) -> f64 {
        self.semitones as f64 * 100.0 + self.cents
    }

    /// True when both intervals span the same width, regardless of spelling
    pub fn same_width(&self, other: &Interval) -> bool {
        (self.width_in_cents() - other.width_in_cents()).abs() < CENTS_EPSILON
    }

    /// The same interval pointing the other way
    pub fn inverted(&self) -> Self {
        Self {
            semitones: -self.semitones,
            cents: -self.cents,
        }
    }

    /// Stack two intervals, keeping the spelling of both parts
    pub fn checked_add(&self, other: &Interval) -> Result<Self> {
        let cents = self.cents + other.cents;
        let semitones = self
            .semitones
            .checked_add(other.semitones)
            .ok_or(TonegraphError::InvalidInterval {
                semitones: self.semitones,
                cents,
            })?;
        Self::new(semitones, cents)
    }

    /// Width reduced into a single octave, in `[0, 1200)`
    pub fn octave_reduced_cents(&self) -> f64 {
        self.width_in_cents().rem_euclid(1200.0)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::UNISON
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cents.abs() < CENTS_EPSILON {
            write!(f, "{}st", self.semitones)
        } else {
            write!(f, "{}st{:+}c", self.semitones, self.cents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width() {
        let iv = Interval::new(7, -2.0).unwrap();
        assert!((iv.width_in_cents() - 698.0).abs() < CENTS_EPSILON);
        assert_eq!(Interval::OCTAVE.width_in_cents(), 1200.0);
    }

    #[test]
    fn test_spelling_is_distinguishable() {
        let a = Interval::new(2, 0.0).unwrap();
        let b = Interval::new(1, 100.0).unwrap();
        assert_ne!(a, b);
        assert!(a.same_width(&b));
    }

    #[test]
    fn test_inconsistent_spelling_rejected() {
        assert!(matches!(
            Interval::new(2, -250.0),
            Err(TonegraphError::InvalidInterval { .. })
        ));
        assert!(Interval::new(-1, 150.0).is_err());
        assert!(Interval::new(1, f64::NAN).is_err());

        // Descending and pure-cent spellings are fine
        assert!(Interval::new(-2, -30.0).is_ok());
        assert!(Interval::new(0, -30.0).is_ok());
    }

    #[test]
    fn test_checked_add_overflow() {
        let huge = Interval::new(i32::MAX, 0.0).unwrap();
        assert!(matches!(
            huge.checked_add(&Interval::MINOR_SECOND),
            Err(TonegraphError::InvalidInterval { .. })
        ));
        let fifth = Interval::PERFECT_FOURTH.checked_add(&Interval::MAJOR_SECOND).unwrap();
        assert!(fifth.same_width(&Interval::PERFECT_FIFTH));
        assert!(Interval::from_cents(1e12).is_err());
    }

    #[test]
    fn test_from_cents_rounds_to_nearest_semitone() {
        let iv = Interval::from_cents(386.3).unwrap();
        assert_eq!(iv.semitones(), 4);
        assert!((iv.cents() - (-13.7)).abs() < 1e-9);

        let down = Interval::from_cents(-702.0).unwrap();
        assert_eq!(down.semitones(), -7);
        assert!((down.cents() - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_octave_reduction() {
        let ninth = Interval::from_semitones(14);
        assert_eq!(ninth.octave_reduced_cents(), 200.0);
        assert_eq!(Interval::from_semitones(-5).octave_reduced_cents(), 700.0);
    }
}
