//! Externally supplied tonal spectra

use serde::{Deserialize, Serialize};

use crate::note::Note;
use crate::pulse::Pulse;

pub const DEFAULT_TOLERANCE_CENTS: f64 = 50.0;

/// One candidate tone with an approximate frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralComponent {
    pub frequency_hz: f64,
    pub weight: f32,
}

impl SpectralComponent {
    pub fn new(frequency_hz: f64, weight: f32) -> Self {
        Self { frequency_hz, weight }
    }
}

/// A set of candidate tones describing a pitch region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub components: Vec<SpectralComponent>,
    /// How far (in cents) a tone may sit from a component and still count
    pub tolerance_cents: f64,
}

impl Spectrum {
    pub fn new(components: Vec<SpectralComponent>) -> Self {
        Self {
            components,
            tolerance_cents: DEFAULT_TOLERANCE_CENTS,
        }
    }

    /// Spectrum of a pulse's tones at the default tolerance
    pub fn from_pulse(pulse: &Pulse) -> Self {
        pulse.spectrum(DEFAULT_TOLERANCE_CENTS)
    }

    pub fn with_tolerance(mut self, tolerance_cents: f64) -> Self {
        self.tolerance_cents = tolerance_cents.abs();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// True when some component lies within tolerance of `note`
    pub fn contains(&self, note: &Note) -> bool {
        let target = note.frequency();
        self.components
            .iter()
            .filter(|c| c.frequency_hz > 0.0)
            .any(|c| (1200.0 * (c.frequency_hz / target).log2()).abs() <= self.tolerance_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_within_tolerance() {
        let spectrum = Spectrum::new(vec![SpectralComponent::new(440.0, 1.0)]);
        assert!(spectrum.contains(&Note::A4));
        assert!(spectrum.contains(&Note::with_adjustment(69, 40.0)));
        assert!(!spectrum.contains(&Note::with_adjustment(69, 60.0)));
        assert!(!spectrum.contains(&Note::new(81)));

        let tight = spectrum.with_tolerance(10.0);
        assert!(!tight.contains(&Note::with_adjustment(69, 40.0)));
    }

    #[test]
    fn test_ignores_non_positive_components() {
        let spectrum = Spectrum::new(vec![SpectralComponent::new(0.0, 1.0)]);
        assert!(!spectrum.contains(&Note::A4));
        assert!(Spectrum::new(Vec::new()).is_empty());
    }
}
