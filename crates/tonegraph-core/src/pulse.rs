//! Pulses: time-sampled clusters of sounding tones

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::note::Note;
use crate::spectrum::{SpectralComponent, Spectrum};

/// Opaque ordering key for when a pulse was sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SampleKey(pub u64);

/// Identity of the instrument part a tone came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PartId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampledTone {
    pub pitch: Note,
    /// 0.0 (silent) to 1.0 (loudest)
    pub loudness: f32,
    pub part: PartId,
}

impl SampledTone {
    pub fn new(pitch: Note, loudness: f32, part: PartId) -> Self {
        let loudness = if loudness.is_nan() { 0.0 } else { loudness.clamp(0.0, 1.0) };
        Self { pitch, loudness, part }
    }
}

/// A raw observation: tones sounding at (about) the same time, not yet tied
/// to any scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    tones: Vec<SampledTone>,
    sample_time: SampleKey,
}

impl Pulse {
    pub fn new(sample_time: SampleKey, tones: impl IntoIterator<Item = SampledTone>) -> Self {
        let mut pulse = Self {
            tones: Vec::new(),
            sample_time,
        };
        for tone in tones {
            pulse.insert(tone);
        }
        pulse
    }

    /// Add a tone. A pitch-equal tone from the same part is merged, keeping
    /// the louder reading; returns false in that case.
    pub fn insert(&mut self, tone: SampledTone) -> bool {
        let tone = SampledTone::new(tone.pitch, tone.loudness, tone.part);
        if let Some(existing) = self
            .tones
            .iter_mut()
            .find(|t| t.part == tone.part && t.pitch.pitch_eq(&tone.pitch))
        {
            existing.loudness = existing.loudness.max(tone.loudness);
            return false;
        }
        self.tones.push(tone);
        true
    }

    pub fn tones(&self) -> &[SampledTone] {
        &self.tones
    }

    pub fn sample_time(&self) -> SampleKey {
        self.sample_time
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }

    /// Loudest tone; the lowest pitch wins ties
    pub fn dominant(&self) -> Option<&SampledTone> {
        self.tones.iter().max_by(|a, b| {
            a.loudness
                .total_cmp(&b.loudness)
                .then_with(|| b.pitch.compare(&a.pitch))
        })
    }

    pub fn pitch_classes(&self) -> BTreeSet<u8> {
        self.tones.iter().map(|t| t.pitch.pitch_class()).collect()
    }

    pub fn transposed(&self, cents: f64) -> Pulse {
        Pulse {
            tones: self
                .tones
                .iter()
                .map(|t| SampledTone {
                    pitch: t.pitch.transpose_cents(cents),
                    ..*t
                })
                .collect(),
            sample_time: self.sample_time,
        }
    }

    /// The pulse as a spectrum, weighted by loudness
    pub fn spectrum(&self, tolerance_cents: f64) -> Spectrum {
        Spectrum::new(
            self.tones
                .iter()
                .map(|t| SpectralComponent::new(t.pitch.frequency(), t.loudness))
                .collect(),
        )
        .with_tolerance(tolerance_cents)
    }

    /// Group onsets into pulses. An onset joins the open pulse while it falls
    /// within `window` keys of that pulse's first onset.
    pub fn cluster(onsets: impl IntoIterator<Item = (SampleKey, SampledTone)>, window: u64) -> Vec<Pulse> {
        let mut onsets: Vec<_> = onsets.into_iter().collect();
        onsets.sort_by_key(|(key, _)| *key);

        let mut pulses: Vec<Pulse> = Vec::new();
        for (key, tone) in onsets {
            match pulses.last_mut() {
                Some(open) if key.0 - open.sample_time.0 <= window => {
                    open.insert(tone);
                }
                _ => pulses.push(Pulse::new(key, [tone])),
            }
        }
        pulses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(number: i32, loudness: f32) -> SampledTone {
        SampledTone::new(Note::new(number), loudness, PartId(0))
    }

    #[test]
    fn test_set_semantics_per_part() {
        let mut pulse = Pulse::new(SampleKey(0), [tone(60, 0.3), tone(64, 0.5)]);
        assert!(!pulse.insert(tone(60, 0.9)));
        assert_eq!(pulse.len(), 2);
        assert_eq!(pulse.tones()[0].loudness, 0.9);

        // same pitch on another part is a distinct tone
        assert!(pulse.insert(SampledTone::new(Note::new(60), 0.2, PartId(1))));
        assert_eq!(pulse.len(), 3);
    }

    #[test]
    fn test_loudness_is_clamped() {
        let t = SampledTone::new(Note::MIDDLE_C, 3.0, PartId(0));
        assert_eq!(t.loudness, 1.0);
        let t = SampledTone::new(Note::MIDDLE_C, f32::NAN, PartId(0));
        assert_eq!(t.loudness, 0.0);
    }

    #[test]
    fn test_dominant_and_pitch_classes() {
        let pulse = Pulse::new(SampleKey(3), [tone(48, 0.8), tone(64, 0.8), tone(67, 0.4)]);
        assert_eq!(pulse.dominant().unwrap().pitch.number(), 48);
        assert_eq!(pulse.pitch_classes().into_iter().collect::<Vec<_>>(), vec![0, 4, 7]);
        assert!(Pulse::new(SampleKey(0), []).dominant().is_none());
    }

    #[test]
    fn test_transposed_keeps_time() {
        let pulse = Pulse::new(SampleKey(9), [tone(60, 1.0)]);
        let up = pulse.transposed(1200.0);
        assert_eq!(up.sample_time(), SampleKey(9));
        assert!(up.tones()[0].pitch.pitch_eq(&Note::new(72)));
    }

    #[test]
    fn test_cluster_by_window() {
        let onsets = vec![
            (SampleKey(100), tone(64, 0.5)),
            (SampleKey(0), tone(60, 0.5)),
            (SampleKey(5), tone(67, 0.5)),
            (SampleKey(12), tone(72, 0.5)),
            (SampleKey(104), tone(60, 0.5)),
        ];
        let pulses = Pulse::cluster(onsets, 10);
        assert_eq!(pulses.len(), 3);
        assert_eq!(pulses[0].len(), 2);
        assert_eq!(pulses[1].sample_time(), SampleKey(12));
        assert_eq!(pulses[2].len(), 2);
        assert!(Pulse::cluster(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_spectrum_from_pulse() {
        let pulse = Pulse::new(SampleKey(0), [tone(69, 0.7)]);
        let spectrum = pulse.spectrum(20.0);
        assert!(spectrum.contains(&Note::A4));
        assert!(!spectrum.contains(&Note::with_adjustment(69, 25.0)));
    }
}
