//! Pitch positions with cent adjustment

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TonegraphError};
use crate::interval::{CENTS_EPSILON, Interval};

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Reference tuning: A4 (number 69) = 440 Hz
const A4_NUMBER: i32 = 69;
const A4_HZ: f64 = 440.0;

/// A pitch position: a semitone number (MIDI numbering, 60 = middle C) plus
/// a cent adjustment.
///
/// `PartialEq` compares spelling; use [`Note::pitch_eq`] or
/// [`Note::compare`] to compare sounding pitch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Note {
    number: i32,
    adjustment: f64,
}

impl Note {
    pub const MIDDLE_C: Note = Note::new(60);
    pub const A4: Note = Note::new(A4_NUMBER);

    pub const fn new(number: i32) -> Self {
        Self { number, adjustment: 0.0 }
    }

    /// Any adjustment is stored as given; scales and ranges reject notes
    /// that are not finite.
    pub fn with_adjustment(number: i32, adjustment: f64) -> Self {
        Self { number, adjustment }
    }

    /// Nearest note to a frequency, with the remainder kept as adjustment
    pub fn from_frequency(hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(TonegraphError::InvalidFrequency(hz));
        }
        let cents = A4_NUMBER as f64 * 100.0 + 1200.0 * (hz / A4_HZ).log2();
        Ok(Self::from_absolute_cents(cents))
    }

    pub fn from_absolute_cents(cents: f64) -> Self {
        let number = (cents / 100.0).round() as i32;
        Self {
            number,
            adjustment: cents - number as f64 * 100.0,
        }
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn adjustment(&self) -> f64 {
        self.adjustment
    }

    /// Position in cents above number 0
    pub fn absolute_cents(&self) -> f64 {
        self.number as f64 * 100.0 + self.adjustment
    }

    pub fn frequency(&self) -> f64 {
        A4_HZ * 2f64.powf((self.absolute_cents() - A4_NUMBER as f64 * 100.0) / 1200.0)
    }

    /// Pitch class (0 = C) of the nearest tempered semitone
    pub fn pitch_class(&self) -> u8 {
        ((self.absolute_cents() / 100.0).round() as i32).rem_euclid(12) as u8
    }

    /// Scientific octave of the nearest tempered semitone (60 -> 4)
    pub fn octave(&self) -> i32 {
        ((self.absolute_cents() / 100.0).round() as i32).div_euclid(12) - 1
    }

    /// Advance by an interval plus an optional extra adjustment in cents.
    ///
    /// # Panics
    ///
    /// If the semitone number overflows; see [`Note::checked_add`].
    pub fn add(&self, interval: Interval, adjustment: Option<f64>) -> Note {
        Note {
            number: self.number + interval.semitones(),
            adjustment: self.adjustment + interval.cents() + adjustment.unwrap_or(0.0),
        }
    }

    /// [`Note::add`] that reports semitone overflow as `InvalidNote`
    pub fn checked_add(&self, interval: Interval, adjustment: Option<f64>) -> Result<Note> {
        let number = self
            .number
            .checked_add(interval.semitones())
            .ok_or_else(|| TonegraphError::InvalidNote(format!("{self} + {interval} overflows")))?;
        Ok(Note {
            number,
            adjustment: self.adjustment + interval.cents() + adjustment.unwrap_or(0.0),
        })
    }

    pub fn transpose_cents(&self, cents: f64) -> Note {
        Note {
            number: self.number,
            adjustment: self.adjustment + cents,
        }
    }

    /// Signed distance in cents from `self` up to `other`
    pub fn cents_to(&self, other: &Note) -> f64 {
        other.absolute_cents() - self.absolute_cents()
    }

    /// Order by sounding pitch
    pub fn compare(&self, other: &Note) -> Ordering {
        let diff = self.cents_to(other);
        if diff.abs() < CENTS_EPSILON {
            Ordering::Equal
        } else if diff > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    pub fn pitch_eq(&self, other: &Note) -> bool {
        self.compare(other) == Ordering::Equal
    }

    /// Fold the adjustment into the semitone number so it lies in `[-50, 50]`
    pub fn normalized(&self) -> Note {
        Self::from_absolute_cents(self.absolute_cents())
    }

    pub fn name(&self) -> &'static str {
        SHARP_NAMES[self.pitch_class() as usize]
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nearest = self.normalized();
        write!(f, "{}{}", nearest.name(), nearest.octave())?;
        if nearest.adjustment.abs() >= CENTS_EPSILON {
            write!(f, "{:+}c", nearest.adjustment)?;
        }
        Ok(())
    }
}

impl FromStr for Note {
    type Err = TonegraphError;

    /// Parses `C4`, `F#3`, `Bb-1`, `A4+25c`, `E4-13.5c`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || TonegraphError::InvalidNote(s.to_string());

        // The cent sign is the last +/- that is not the octave sign
        let cent_split = s
            .strip_suffix('c')
            .or_else(|| s.strip_suffix('C'))
            .and_then(|body| {
                body.char_indices()
                    .skip(2)
                    .filter(|(_, c)| *c == '+' || *c == '-')
                    .map(|(i, _)| i)
                    .last()
                    .map(|split| (body, split))
            });

        let (pitch_part, cents) = match cent_split {
            Some((body, split)) => {
                let cents: f64 = body[split..].parse().map_err(|_| invalid())?;
                if !cents.is_finite() {
                    return Err(invalid());
                }
                (&body[..split], cents)
            }
            None => (s, 0.0),
        };

        let mut chars = pitch_part.chars();
        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let mut pitch_class: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let octave_part = if let Some(r) = rest.strip_prefix('#') {
            pitch_class += 1;
            r
        } else if let Some(r) = rest.strip_prefix('b') {
            pitch_class -= 1;
            r
        } else {
            rest
        };

        let octave: i32 = if octave_part.is_empty() {
            4
        } else {
            octave_part.parse().map_err(|_| invalid())?
        };

        let number = octave
            .checked_add(1)
            .and_then(|o| o.checked_mul(12))
            .and_then(|n| n.checked_add(pitch_class))
            .ok_or_else(invalid)?;
        Ok(Note {
            number,
            adjustment: cents,
        })
    }
}
