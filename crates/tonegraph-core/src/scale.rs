//! Scales: interval sequences anchored at a root, with per-step cent adjustments

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{Result, TonegraphError};
use crate::interval::{CENTS_EPSILON, Interval};
use crate::note::Note;
use crate::presets::StandardScale;
use crate::range::Range;
use crate::spectrum::Spectrum;

static NEXT_SCALE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique scale identity; ranges refer to their scale through it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScaleId(pub u64);

impl ScaleId {
    fn next() -> Self {
        Self(NEXT_SCALE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability tags checked at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Canonical preset, immutable and shared
    pub standard: bool,
    /// Supports a range register and cross-spectrum derivation
    pub systematic: bool,
}

/// A scale and its degrees.
///
/// `Clone` copies the same logical scale and keeps its [`ScaleId`], so a
/// clone of a standard preset is an equal but unshared instance. Use
/// [`Scale::duplicate`] for the sharing policy, and [`Scale::with_root`] or
/// [`Scale::into_systematic`] when the copy needs an identity of its own.
/// Every constructor, deserialization included, checks that all degrees stay
/// inside the note range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScale")]
pub struct Scale {
    id: ScaleId,
    symbol: Option<String>,
    root: Option<Note>,
    intervals: Vec<Interval>,
    adjustments: Vec<Option<f64>>,
    capabilities: Capabilities,
    /// Composite ranges of a systematic scale, keyed by register index
    #[serde(default)]
    register: BTreeMap<usize, Range>,
}

#[derive(Deserialize)]
struct RawScale {
    id: ScaleId,
    symbol: Option<String>,
    root: Option<Note>,
    intervals: Vec<Interval>,
    adjustments: Vec<Option<f64>>,
    capabilities: Capabilities,
    #[serde(default)]
    register: BTreeMap<usize, Range>,
}

impl TryFrom<RawScale> for Scale {
    type Error = TonegraphError;

    fn try_from(raw: RawScale) -> Result<Self> {
        Scale {
            id: raw.id,
            symbol: raw.symbol,
            root: raw.root,
            intervals: raw.intervals,
            adjustments: raw.adjustments,
            capabilities: raw.capabilities,
            register: raw.register,
        }
        .checked()
    }
}

impl Scale {
    /// Build a scale from its parts.
    ///
    /// `adjustments` shorter than `intervals` is padded with `None`; extra
    /// entries are accepted only when they are all `None`.
    pub fn new(
        symbol: Option<&str>,
        root: Option<Note>,
        intervals: Vec<Interval>,
        adjustments: Vec<Option<f64>>,
    ) -> Result<Self> {
        Scale {
            id: ScaleId::next(),
            symbol: symbol.map(str::to_string),
            root,
            intervals,
            adjustments,
            capabilities: Capabilities::default(),
            register: BTreeMap::new(),
        }
        .checked()
    }

    /// Normalize the adjustment list and validate every part
    fn checked(mut self) -> Result<Self> {
        let steps = self.intervals.len();
        if self.adjustments.len() > steps {
            if self.adjustments[steps..].iter().any(Option::is_some) {
                return Err(TonegraphError::InvalidScale(format!(
                    "{} adjustments for {} intervals",
                    self.adjustments.len(),
                    steps
                )));
            }
            self.adjustments.truncate(steps);
        }
        if let Some(root) = self.root.filter(|r| !r.absolute_cents().is_finite()) {
            return Err(TonegraphError::InvalidNote(format!("root {:?} is not finite", root)));
        }
        if let Some(bad) = self.adjustments.iter().flatten().find(|a| !a.is_finite()) {
            return Err(TonegraphError::InvalidScale(format!("adjustment {bad} is not finite")));
        }
        self.adjustments.resize(steps, None);

        self.intervals
            .iter()
            .try_fold(self.anchor(), |note, iv| note.checked_add(*iv, None))
            .map_err(|_| TonegraphError::InvalidScale(format!("degrees from {} overflow the note range", self.anchor())))?;

        if !self.register.is_empty() && !self.is_systematic() {
            return Err(TonegraphError::NotSystematic(self.id.0));
        }
        for (index, range) in &self.register {
            if *index < self.degree_count() {
                return Err(TonegraphError::RegisterCollision {
                    index: *index,
                    reason: "reserved for a scale degree",
                });
            }
            if range.scale() != self.id {
                return Err(TonegraphError::ScaleMismatch {
                    expected: self.id.0,
                    found: range.scale().0,
                });
            }
        }
        Ok(self)
    }

    /// Infer a scale from a literal note sequence. Intervals are rounded to
    /// the nearest semitone and the remainder becomes the step adjustment.
    pub fn from_notes(symbol: Option<&str>, notes: &[Note]) -> Result<Self> {
        let Some(root) = notes.first() else {
            return Err(TonegraphError::InvalidScale("no notes".into()));
        };

        if let Some(i) = notes.iter().position(|n| !n.absolute_cents().is_finite()) {
            return Err(TonegraphError::InvalidNote(format!("note {i} is not finite")));
        }

        let mut intervals = Vec::with_capacity(notes.len() - 1);
        let mut adjustments = Vec::with_capacity(notes.len() - 1);
        for pair in notes.windows(2) {
            let width = pair[0].cents_to(&pair[1]);
            let semitones = (width / 100.0).round() as i32;
            let remainder = width - semitones as f64 * 100.0;
            intervals.push(Interval::from_semitones(semitones));
            adjustments.push((remainder.abs() >= CENTS_EPSILON).then_some(remainder));
        }

        Self::new(symbol, Some(*root), intervals, adjustments)
    }

    pub(crate) fn preset(preset: StandardScale) -> Self {
        Self {
            id: ScaleId::next(),
            symbol: Some(preset.symbol().to_string()),
            root: None,
            intervals: preset.steps().iter().map(|&s| Interval::from_semitones(s)).collect(),
            adjustments: vec![None; preset.steps().len()],
            capabilities: Capabilities {
                standard: true,
                systematic: false,
            },
            register: BTreeMap::new(),
        }
    }

    /// Shared canonical instance for a standard symbol (case-insensitive)
    pub fn standard(symbol: &str) -> Option<Arc<Scale>> {
        StandardScale::lookup(symbol).map(StandardScale::scale)
    }

    /// A copy anchored at `root`, with its own identity. Registered ranges
    /// are not carried over since they belong to the old anchor.
    pub fn with_root(&self, root: Note) -> Result<Scale> {
        Scale {
            id: ScaleId::next(),
            root: Some(root),
            register: BTreeMap::new(),
            ..self.clone()
        }
        .checked()
    }

    /// A copy with the systematic capability and an empty register
    pub fn into_systematic(self) -> Scale {
        Scale {
            id: ScaleId::next(),
            capabilities: Capabilities {
                systematic: true,
                ..self.capabilities
            },
            register: BTreeMap::new(),
            ..self
        }
    }

    /// Clone following the sharing policy: unrooted standard scales hand back
    /// the same instance, everything else is deep-copied.
    pub fn duplicate(this: &Arc<Scale>) -> Arc<Scale> {
        if this.is_standard() && this.root.is_none() {
            Arc::clone(this)
        } else {
            Arc::new(Scale::clone(this))
        }
    }

    pub fn id(&self) -> ScaleId {
        self.id
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn root(&self) -> Option<Note> {
        self.root
    }

    /// Root, or middle C for unrooted scales
    pub fn anchor(&self) -> Note {
        self.root.unwrap_or(Note::MIDDLE_C)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn adjustments(&self) -> &[Option<f64>] {
        &self.adjustments
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_standard(&self) -> bool {
        self.capabilities.standard
    }

    pub fn is_systematic(&self) -> bool {
        self.capabilities.systematic
    }

    /// Root plus one degree per interval
    pub fn degree_count(&self) -> usize {
        self.intervals.len() + 1
    }

    /// Width of step `i` including its adjustment
    fn step_cents(&self, i: usize) -> f64 {
        self.intervals[i].width_in_cents() + self.adjustments[i].unwrap_or(0.0)
    }

    pub fn degree(&self, index: usize) -> Result<Note> {
        if index >= self.degree_count() {
            return Err(TonegraphError::IndexOutOfRange {
                index,
                limit: self.degree_count(),
            });
        }
        self.intervals
            .iter()
            .zip(&self.adjustments)
            .take(index)
            .try_fold(self.anchor(), |note, (iv, adj)| note.checked_add(*iv, *adj))
    }

    /// Lazily walk every degree from the root. Each call starts over.
    pub fn produce_degrees(&self) -> Degrees<'_> {
        Degrees {
            scale: self,
            next: 0,
            current: self.anchor(),
        }
    }

    /// Peak-to-trough span of the walk from the root, in cents.
    ///
    /// Adjustments may push a degree back past an earlier one, so this is the
    /// spread of the running sums rather than their final value.
    pub fn total_width_cents(&self) -> f64 {
        let mut running = 0.0_f64;
        let mut low = 0.0_f64;
        let mut high = 0.0_f64;
        for i in 0..self.intervals.len() {
            running += self.step_cents(i);
            low = low.min(running);
            high = high.max(running);
        }
        high - low
    }

    /// Single-tone range for a degree
    pub fn degree_range(&self, index: usize) -> Result<Range> {
        Ok(Range::degree(self.id, self.degree(index)?))
    }

    // ========================================================================
    // Systematic register
    // ========================================================================

    /// Store a composite range at a register index.
    ///
    /// Indices below [`Scale::degree_count`] belong to the degrees and are
    /// never reassigned.
    pub fn register_range(&mut self, index: usize, range: Range) -> Result<()> {
        if !self.is_systematic() {
            return Err(TonegraphError::NotSystematic(self.id.0));
        }
        if range.scale() != self.id {
            return Err(TonegraphError::ScaleMismatch {
                expected: self.id.0,
                found: range.scale().0,
            });
        }
        if index < self.degree_count() {
            return Err(TonegraphError::RegisterCollision {
                index,
                reason: "reserved for a scale degree",
            });
        }
        if self.register.contains_key(&index) {
            return Err(TonegraphError::RegisterCollision {
                index,
                reason: "already occupied",
            });
        }
        debug!(scale = %self.id, index, size = range.size(), "Registered composite range");
        self.register.insert(index, range);
        Ok(())
    }

    /// Look up a range in the shared degree/register index space
    pub fn range_at(&self, index: usize) -> Result<Range> {
        if index < self.degree_count() {
            return self.degree_range(index);
        }
        self.register
            .get(&index)
            .cloned()
            .ok_or(TonegraphError::IndexOutOfRange {
                index,
                limit: self.register.keys().next_back().map_or(self.degree_count(), |k| k + 1),
            })
    }

    pub fn registered_ranges(&self) -> impl Iterator<Item = (usize, &Range)> {
        self.register.iter().map(|(idx, range)| (*idx, range))
    }

    /// Degree ranges followed by registered composites in register order
    pub fn recognized_ranges(&self) -> Vec<Range> {
        self.produce_degrees()
            .map(|note| Range::degree(self.id, note))
            .chain(self.register.values().cloned())
            .collect()
    }

    /// Every recognized range with at least one tone inside each spectrum
    pub fn derive_ranges(&self, spectrum_a: &Spectrum, spectrum_b: &Spectrum) -> Result<Vec<Range>> {
        if !self.is_systematic() {
            return Err(TonegraphError::NotSystematic(self.id.0));
        }

        let bridges: Vec<Range> = self
            .recognized_ranges()
            .into_iter()
            .filter(|range| {
                let tones = range.tones();
                tones.iter().any(|t| spectrum_a.contains(t)) && tones.iter().any(|t| spectrum_b.contains(t))
            })
            .collect();

        debug!(scale = %self.id, found = bridges.len(), "Derived bridging ranges");
        Ok(bridges)
    }
}

/// Iterator over a scale's degrees, see [`Scale::produce_degrees`]
#[derive(Debug, Clone)]
pub struct Degrees<'a> {
    scale: &'a Scale,
    next: usize,
    current: Note,
}

impl Iterator for Degrees<'_> {
    type Item = Note;

    fn next(&mut self) -> Option<Note> {
        if self.next >= self.scale.degree_count() {
            return None;
        }
        let note = self.current;
        if let Some(iv) = self.scale.intervals.get(self.next) {
            // construction guarantees the walk fits
            self.current = self.current.add(*iv, self.scale.adjustments[self.next]);
        }
        self.next += 1;
        Some(note)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.scale.degree_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Degrees<'_> {}
impl FusedIterator for Degrees<'_> {}
