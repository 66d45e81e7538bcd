//! Ranking pulses against known ranges
//!
//! A score mixes two parts: how close each pulse tone sounds to the range's
//! tones (modulation proximity, loudness weighted) and how many pulse tones
//! the range leaves unexplained (structural distance).

use std::cmp::Ordering;

use tracing::trace;

use crate::config::MatcherConfig;
use crate::error::Result;
use crate::note::Note;
use crate::phrase::PhraseBuffer;
use crate::pulse::Pulse;
use crate::range::Range;
use crate::scale::{Scale, ScaleId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMatch<'a> {
    pub range: &'a Range,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Similarity of `pulse` to `range` in `[0, 1]`; an empty pulse scores 0
    pub fn score(&self, pulse: &Pulse, range: &Range) -> f64 {
        if pulse.is_empty() || range.size() == 0 {
            return 0.0;
        }
        let total = self.config.pitch_weight + self.config.structure_weight;
        let mixed = self.config.pitch_weight * self.pitch_score(pulse, range)
            + self.config.structure_weight * (1.0 - self.structural_distance(pulse, range));
        (mixed / total).clamp(0.0, 1.0)
    }

    fn pitch_score(&self, pulse: &Pulse, range: &Range) -> f64 {
        let bands = &self.config.bands;
        let loudness: f64 = pulse.tones().iter().map(|t| t.loudness as f64).sum();
        let uniform = loudness <= 0.0;

        let weighted: f64 = pulse
            .tones()
            .iter()
            .map(|t| {
                let best = range
                    .tones()
                    .iter()
                    .map(|r| bands.proximity(r.cents_to(&t.pitch)))
                    .fold(0.0, f64::max);
                if uniform { best } else { best * t.loudness as f64 }
            })
            .sum();

        if uniform {
            weighted / pulse.len() as f64
        } else {
            weighted / loudness
        }
    }

    /// Unexplained pulse tones over the range's event count, at most 1
    fn structural_distance(&self, pulse: &Pulse, range: &Range) -> f64 {
        let tolerance = self.config.match_tolerance_cents;
        let covered = |pitch: &Note| {
            range.events().iter().any(|e| {
                let c = range.tones()[e.tone].cents_to(pitch).rem_euclid(1200.0);
                c.min(1200.0 - c) <= tolerance
            })
        };
        let unmatched = pulse.tones().iter().filter(|t| !covered(&t.pitch)).count();
        (unmatched as f64 / range.size() as f64).min(1.0)
    }

    /// Rank `ranges` against `pulse`, keeping scores strictly above
    /// `threshold`.
    ///
    /// Ties go to the range on the buffer's most recently matched scale, then
    /// to the smaller range.
    pub fn match_pulse<'a>(
        &self,
        pulse: &Pulse,
        ranges: impl IntoIterator<Item = &'a Range>,
        threshold: f64,
        buffer: Option<&PhraseBuffer>,
    ) -> Vec<RangeMatch<'a>> {
        let mut matches: Vec<RangeMatch<'a>> = ranges
            .into_iter()
            .map(|range| RangeMatch {
                range,
                score: self.score(pulse, range),
            })
            .filter(|m| m.score > threshold)
            .collect();

        let recent = buffer.and_then(PhraseBuffer::last_scale);
        matches.sort_by(|a, b| rank(a, b, recent));

        trace!(
            sample = pulse.sample_time().0,
            kept = matches.len(),
            best = matches.first().map(|m| m.score),
            "Matched pulse"
        );
        matches
    }

    /// Every recognized range of `scales`
    pub fn candidates<'s>(scales: impl IntoIterator<Item = &'s Scale>) -> Vec<Range> {
        scales.into_iter().flat_map(Scale::recognized_ranges).collect()
    }

    /// Ranges of the systematic `scales` that bridge the two pulses, scored
    /// against `current`. Other scales are skipped.
    pub fn bridge<'s>(
        &self,
        previous: &Pulse,
        current: &Pulse,
        scales: impl IntoIterator<Item = &'s Scale>,
        threshold: f64,
    ) -> Result<Vec<(Range, f64)>> {
        let tolerance = self.config.match_tolerance_cents;
        let from = previous.spectrum(tolerance);
        let to = current.spectrum(tolerance);

        let mut bridged = Vec::new();
        for scale in scales.into_iter().filter(|s| s.is_systematic()) {
            bridged.extend(scale.derive_ranges(&from, &to)?);
        }

        let ranked = self
            .match_pulse(current, &bridged, threshold, None)
            .into_iter()
            .map(|m| (m.range.clone(), m.score))
            .collect();
        Ok(ranked)
    }
}

fn rank(a: &RangeMatch<'_>, b: &RangeMatch<'_>, recent: Option<ScaleId>) -> Ordering {
    let continues = |m: &RangeMatch<'_>| recent == Some(m.range.scale());
    b.score
        .total_cmp(&a.score)
        .then_with(|| continues(b).cmp(&continues(a)))
        .then_with(|| a.range.size().cmp(&b.range.size()))
}
