//! Phrases: consecutive pulses explained by one scale
//!
//! A [`PhraseBuffer`] is owned by the caller and fed one ranked pulse at a
//! time. It closes a phrase when the best-matching scale changes or when a
//! pulse matches nothing known.

use serde::{Deserialize, Serialize};
use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::matcher::RangeMatch;
use crate::pulse::{Pulse, SampleKey};
use crate::range::{EventId, Range, ToneKind};
use crate::scale::ScaleId;

/// Loudness ratio below which a tone counts as a grace into the loudest one
const GRACE_RATIO: f32 = 0.5;

/// Opaque song identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongTag(pub String);

impl From<&str> for SongTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SongTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub song: Option<SongTag>,
    pub scale: ScaleId,
    pub pulses: Vec<Pulse>,
    /// Best range per pulse
    pub ranges: Vec<Range>,
    pub scores: Vec<f64>,
}

impl Phrase {
    fn open(song: Option<SongTag>, pulse: Pulse, best: &RangeMatch<'_>) -> Self {
        Self {
            song,
            scale: best.range.scale(),
            pulses: vec![pulse],
            ranges: vec![best.range.clone()],
            scores: vec![best.score],
        }
    }

    fn append(&mut self, pulse: Pulse, best: &RangeMatch<'_>) {
        self.pulses.push(pulse);
        self.ranges.push(best.range.clone());
        self.scores.push(best.score);
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// First and last sample keys
    pub fn span(&self) -> Option<(SampleKey, SampleKey)> {
        Some((self.pulses.first()?.sample_time(), self.pulses.last()?.sample_time()))
    }

    /// Compose the phrase into a range on its scale.
    ///
    /// Each pulse becomes a sub-range. A pitch sounding in consecutive pulses
    /// is stretched; tones much quieter than the loudest tone of their pulse
    /// appear into it.
    pub fn to_range(&self) -> Result<Range> {
        let mut builder = Range::builder(self.scale);
        let mut previous: Vec<(usize, EventId, bool)> = Vec::new();

        for pulse in &self.pulses {
            let mut current: Vec<(usize, EventId, bool)> = Vec::with_capacity(pulse.len());
            let dominant = pulse.dominant();
            let mut loudest: Option<(EventId, usize)> = None;

            for tone in pulse.tones() {
                let index = builder.tone(tone.pitch);
                let held = previous.iter_mut().find(|(t, _, used)| *t == index && !*used);
                let kind = if held.is_some() { ToneKind::Continue } else { ToneKind::Start };
                let id = builder.event(index, kind)?;
                if let Some((_, from, used)) = held {
                    *used = true;
                    builder.stretch(*from, id)?;
                }
                if dominant.is_some_and(|d| d.pitch.pitch_eq(&tone.pitch) && d.part == tone.part) {
                    loudest = Some((id, index));
                }
                current.push((index, id, false));
            }

            if let (Some((target, target_tone)), Some(dominant)) = (loudest, dominant) {
                for (tone, (index, id, _)) in pulse.tones().iter().zip(&current) {
                    if *index != target_tone && tone.loudness < dominant.loudness * GRACE_RATIO {
                        builder.appearance(*id, target)?;
                    }
                }
            }

            previous = current;
            builder.next_segment();
        }

        builder.build()
    }
}

/// Accumulating state between pulses
#[derive(Debug, Clone, Default)]
pub struct PhraseBuffer {
    song: Option<SongTag>,
    last_scale: Option<ScaleId>,
    open: Option<Phrase>,
}

impl PhraseBuffer {
    pub fn new(song: Option<SongTag>) -> Self {
        Self {
            song,
            last_scale: None,
            open: None,
        }
    }

    pub fn song(&self) -> Option<&SongTag> {
        self.song.as_ref()
    }

    /// Scale of the most recent best match
    pub fn last_scale(&self) -> Option<ScaleId> {
        self.last_scale
    }

    pub fn open_phrase(&self) -> Option<&Phrase> {
        self.open.as_ref()
    }

    /// Feed one pulse with its ranking, best first. Returns the phrase this
    /// pulse closed, if any. A pulse with no matches is dropped.
    pub fn push(&mut self, pulse: Pulse, ranked: &[RangeMatch<'_>]) -> Option<Phrase> {
        let Some(best) = ranked.first() else {
            if let Some(closed) = &self.open {
                debug!(scale = %closed.scale, pulses = closed.len(), "Phrase closed: no known pattern");
            }
            return self.open.take();
        };

        let scale = best.range.scale();
        self.last_scale = Some(scale);

        if let Some(open) = self.open.as_mut().filter(|o| o.scale == scale) {
            open.append(pulse, best);
            return None;
        }

        let closed = self.open.replace(Phrase::open(self.song.clone(), pulse, best));
        if let Some(closed) = &closed {
            debug!(from = %closed.scale, to = %scale, pulses = closed.len(), "Phrase closed: scale changed");
        }
        closed
    }

    /// Close and return the open phrase
    pub fn finish(&mut self) -> Option<Phrase> {
        self.open.take()
    }
}
