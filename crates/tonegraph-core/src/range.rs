//! Ranges: scale-anchored tone-events with stretch/appearance relations
//!
//! A range carries no absolute timing. Its tone-events are partitioned into
//! time-ordered sub-ranges (segments); relations are index pairs into the
//! event arena, so ranges stay cheap to clone and serialize.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, TonegraphError};
use crate::note::Note;
use crate::scale::ScaleId;

/// Index of a tone-event inside its range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub usize);

/// How a tone behaves within its sub-range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneKind {
    Start,
    Continue,
    /// Cut short rather than decaying naturally
    ShortStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneEvent {
    /// Index into the range's tone table (pitch identity)
    pub tone: usize,
    pub kind: ToneKind,
    /// Sub-range this event belongs to
    pub segment: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// The same sounding tone continuing into the next sub-range
    Stretch,
    /// Grace/slur connection between two distinct tones
    Appearance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub from: EventId,
    pub to: EventId,
}

/// Deserialized ranges are rebuilt through the same checks as [`RangeBuilder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
    scale: ScaleId,
    tones: Vec<Note>,
    events: Vec<ToneEvent>,
    relations: Vec<Relation>,
}

/// Wire shape of a [`Range`] before validation
#[derive(Deserialize)]
struct RawRange {
    scale: ScaleId,
    tones: Vec<Note>,
    events: Vec<ToneEvent>,
    relations: Vec<Relation>,
}

impl TryFrom<RawRange> for Range {
    type Error = TonegraphError;

    fn try_from(raw: RawRange) -> Result<Self> {
        if raw.events.is_empty() {
            return Err(TonegraphError::EmptyRange);
        }
        for (i, tone) in raw.tones.iter().enumerate() {
            if !tone.absolute_cents().is_finite() {
                return Err(TonegraphError::InvalidNote(format!("tone {i} is not finite")));
            }
            if raw.tones[..i].iter().any(|t| t.pitch_eq(tone)) {
                return Err(TonegraphError::MalformedRange(format!("tone {i} repeats an earlier pitch")));
            }
        }

        let mut segment = 0;
        for (i, event) in raw.events.iter().enumerate() {
            if event.tone >= raw.tones.len() {
                return Err(TonegraphError::IndexOutOfRange {
                    index: event.tone,
                    limit: raw.tones.len(),
                });
            }
            let next = if i == 0 { 0 } else { segment + 1 };
            if event.segment != segment && event.segment != next {
                return Err(TonegraphError::MalformedRange(format!(
                    "event {i} jumps from sub-range {segment} to {}",
                    event.segment
                )));
            }
            segment = event.segment;
        }

        let mut range = Range {
            scale: raw.scale,
            tones: raw.tones,
            events: raw.events,
            relations: Vec::with_capacity(raw.relations.len()),
        };
        for relation in raw.relations {
            range.connect(relation.kind, relation.from, relation.to)?;
        }
        Ok(range)
    }
}

impl Range {
    pub fn builder(scale: ScaleId) -> RangeBuilder {
        RangeBuilder::new(scale)
    }

    /// The degenerate single-tone range used for scale degrees
    pub fn degree(scale: ScaleId, note: Note) -> Self {
        Self {
            scale,
            tones: vec![note],
            events: vec![ToneEvent {
                tone: 0,
                kind: ToneKind::Start,
                segment: 0,
            }],
            relations: Vec::new(),
        }
    }

    pub fn scale(&self) -> ScaleId {
        self.scale
    }

    pub fn tones(&self) -> &[Note] {
        &self.tones
    }

    pub fn events(&self) -> &[ToneEvent] {
        &self.events
    }

    pub fn event(&self, id: EventId) -> Option<&ToneEvent> {
        self.events.get(id.0)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Number of tone-events
    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn segment_count(&self) -> usize {
        self.events.last().map_or(0, |e| e.segment + 1)
    }

    pub fn is_degree(&self) -> bool {
        self.events.len() == 1 && self.relations.is_empty()
    }

    pub fn pitch_of(&self, id: EventId) -> Option<Note> {
        self.event(id).map(|e| self.tones[e.tone])
    }

    pub fn stretches(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.kind == RelationKind::Stretch)
    }

    pub fn appearances(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.kind == RelationKind::Appearance)
    }

    /// Events grouped by sub-range, in time order
    pub fn sub_ranges(&self) -> impl Iterator<Item = &[ToneEvent]> {
        self.events.chunk_by(|a, b| a.segment == b.segment)
    }

    pub fn outgoing_stretch(&self, id: EventId) -> Option<EventId> {
        self.stretches().find(|r| r.from == id).map(|r| r.to)
    }

    /// `id` followed by every event it stretches into
    pub fn continuation_chain(&self, id: EventId) -> Vec<EventId> {
        if self.event(id).is_none() {
            return Vec::new();
        }
        let mut chain = vec![id];
        let mut current = id;
        while let Some(next) = self.outgoing_stretch(current) {
            chain.push(next);
            current = next;
        }
        chain
    }

    pub fn pitch_classes(&self) -> BTreeSet<u8> {
        self.tones.iter().map(Note::pitch_class).collect()
    }

    pub fn add_stretch(&mut self, from: EventId, to: EventId) -> Result<()> {
        self.connect(RelationKind::Stretch, from, to)
    }

    pub fn add_appearance(&mut self, from: EventId, to: EventId) -> Result<()> {
        self.connect(RelationKind::Appearance, from, to)
    }

    fn connect(&mut self, kind: RelationKind, from: EventId, to: EventId) -> Result<()> {
        let limit = self.events.len();
        let source = *self
            .event(from)
            .ok_or(TonegraphError::IndexOutOfRange { index: from.0, limit })?;

        // One sounding tone cannot continue into two futures; checked before
        // anything about the target.
        if kind == RelationKind::Stretch && self.outgoing_stretch(from).is_some() {
            return Err(TonegraphError::DuplicateStretch { source_event: from.0 });
        }

        let target = *self
            .event(to)
            .ok_or(TonegraphError::IndexOutOfRange { index: to.0, limit })?;
        let invalid = |reason| TonegraphError::InvalidRelation {
            from: from.0,
            to: to.0,
            reason,
        };

        if from == to {
            return Err(invalid("an event cannot relate to itself"));
        }

        match kind {
            RelationKind::Stretch => {
                if source.kind == ToneKind::ShortStop {
                    return Err(invalid("a short-stopped tone has no continuation"));
                }
                if source.tone != target.tone {
                    return Err(invalid("stretch requires the same pitch identity"));
                }
                if target.segment != source.segment + 1 {
                    return Err(invalid("stretch must reach the next sub-range"));
                }
            }
            RelationKind::Appearance => {
                if source.tone == target.tone {
                    return Err(invalid("appearance requires distinct pitches"));
                }
                if source.segment.abs_diff(target.segment) > 1 {
                    return Err(invalid("appearance must stay within adjacent sub-ranges"));
                }
            }
        }

        self.relations.push(Relation { kind, from, to });
        Ok(())
    }
}

/// Incremental construction of a [`Range`].
///
/// Events are appended to the current sub-range; [`RangeBuilder::next_segment`]
/// closes it. Relations are validated as they are added.
#[derive(Debug, Clone)]
pub struct RangeBuilder {
    range: Range,
    segment: usize,
}

impl RangeBuilder {
    pub fn new(scale: ScaleId) -> Self {
        Self {
            range: Range {
                scale,
                tones: Vec::new(),
                events: Vec::new(),
                relations: Vec::new(),
            },
            segment: 0,
        }
    }

    /// Register a pitch identity, reusing an existing pitch-equal tone
    pub fn tone(&mut self, note: Note) -> usize {
        if let Some(idx) = self.range.tones.iter().position(|t| t.pitch_eq(&note)) {
            return idx;
        }
        self.range.tones.push(note);
        self.range.tones.len() - 1
    }

    /// Close the current sub-range. Does nothing while it is still empty.
    pub fn next_segment(&mut self) -> &mut Self {
        let current_has_events = self
            .range
            .events
            .last()
            .is_some_and(|e| e.segment == self.segment);
        if current_has_events {
            self.segment += 1;
        }
        self
    }

    pub fn event(&mut self, tone: usize, kind: ToneKind) -> Result<EventId> {
        if tone >= self.range.tones.len() {
            return Err(TonegraphError::IndexOutOfRange {
                index: tone,
                limit: self.range.tones.len(),
            });
        }
        self.range.events.push(ToneEvent {
            tone,
            kind,
            segment: self.segment,
        });
        Ok(EventId(self.range.events.len() - 1))
    }

    /// Shorthand for registering `note` and adding an event for it
    pub fn note_event(&mut self, note: Note, kind: ToneKind) -> EventId {
        let tone = self.tone(note);
        self.range.events.push(ToneEvent {
            tone,
            kind,
            segment: self.segment,
        });
        EventId(self.range.events.len() - 1)
    }

    pub fn stretch(&mut self, from: EventId, to: EventId) -> Result<&mut Self> {
        self.range.add_stretch(from, to)?;
        Ok(self)
    }

    pub fn appearance(&mut self, from: EventId, to: EventId) -> Result<&mut Self> {
        self.range.add_appearance(from, to)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Range> {
        if self.range.events.is_empty() {
            return Err(TonegraphError::EmptyRange);
        }
        if let Some(tone) = self.range.tones.iter().find(|t| !t.absolute_cents().is_finite()) {
            return Err(TonegraphError::InvalidNote(format!("tone {:?} is not finite", tone)));
        }
        Ok(self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: ScaleId = ScaleId(7);

    struct WorkedExample {
        builder: RangeBuilder,
        t1_start: EventId,
        t1_continue: EventId,
        t3_grace: EventId,
    }

    /// Tone 1 starts, continues, then stops short; tone 2 starts and
    /// continues; tone 3 graces tone 1.
    fn worked_example() -> WorkedExample {
        let mut b = Range::builder(SCALE);
        let t1 = b.tone(Note::new(64));
        let t2 = b.tone(Note::new(60));
        let t3 = b.tone(Note::new(62));

        let t1_start = b.event(t1, ToneKind::Start).unwrap();
        b.event(t2, ToneKind::Start).unwrap();
        let t3_grace = b.event(t3, ToneKind::ShortStop).unwrap();
        b.next_segment();
        let t1_continue = b.event(t1, ToneKind::Continue).unwrap();
        b.event(t2, ToneKind::Continue).unwrap();
        b.next_segment();
        b.event(t1, ToneKind::ShortStop).unwrap();

        b.stretch(t1_start, t1_continue).unwrap();
        b.appearance(t3_grace, t1_start).unwrap();

        WorkedExample {
            builder: b,
            t1_start,
            t1_continue,
            t3_grace,
        }
    }

    #[test]
    fn test_worked_example_builds() {
        let ex = worked_example();
        let range = ex.builder.build().unwrap();

        assert_eq!(range.size(), 6);
        assert_eq!(range.segment_count(), 3);
        assert_eq!(range.tones().len(), 3);

        let stretches: Vec<_> = range.stretches().collect();
        assert_eq!(stretches.len(), 1);
        assert_eq!((stretches[0].from, stretches[0].to), (ex.t1_start, ex.t1_continue));

        let appearances: Vec<_> = range.appearances().collect();
        assert_eq!(appearances.len(), 1);
        assert_eq!((appearances[0].from, appearances[0].to), (ex.t3_grace, ex.t1_start));

        let sizes: Vec<usize> = range.sub_ranges().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![3, 2, 1]);
    }

    #[test]
    fn test_worked_example_rejects_second_stretch() {
        let mut ex = worked_example();
        let err = ex.builder.stretch(ex.t1_start, ex.t1_continue).unwrap_err();
        assert_eq!(err, TonegraphError::DuplicateStretch { source_event: ex.t1_start.0 });
    }

    #[test]
    fn test_duplicate_stretch_regardless_of_target() {
        // Any second stretch from a source fails the same way, even toward a
        // target that would otherwise be invalid.
        for target_note in [Note::new(40), Note::new(64), Note::with_adjustment(64, 30.0)] {
            let mut b = Range::builder(SCALE);
            let a = b.note_event(Note::new(64), ToneKind::Start);
            b.next_segment();
            let a2 = b.note_event(Note::new(64), ToneKind::Continue);
            let other = b.note_event(target_note, ToneKind::Start);
            b.stretch(a, a2).unwrap();
            assert!(matches!(
                b.stretch(a, other),
                Err(TonegraphError::DuplicateStretch { .. })
            ));
        }
    }

    #[test]
    fn test_stretch_rules() {
        let mut b = Range::builder(SCALE);
        let c = b.note_event(Note::new(60), ToneKind::Start);
        let d = b.note_event(Note::new(62), ToneKind::ShortStop);
        b.next_segment();
        let c2 = b.note_event(Note::new(60), ToneKind::Continue);
        let d2 = b.note_event(Note::new(62), ToneKind::Start);
        b.next_segment();
        let c3 = b.note_event(Note::new(60), ToneKind::Continue);

        // different pitch
        assert!(matches!(b.stretch(c, d2), Err(TonegraphError::InvalidRelation { .. })));
        // short stop cannot continue
        assert!(matches!(b.stretch(d, d2), Err(TonegraphError::InvalidRelation { .. })));
        // not adjacent
        assert!(matches!(b.stretch(c, c3), Err(TonegraphError::InvalidRelation { .. })));
        // backwards
        assert!(matches!(b.stretch(c2, c), Err(TonegraphError::InvalidRelation { .. })));
        // unknown event
        assert!(matches!(
            b.stretch(c, EventId(99)),
            Err(TonegraphError::IndexOutOfRange { .. })
        ));

        b.stretch(c, c2).unwrap();
        b.stretch(c2, c3).unwrap();
        let range = b.build().unwrap();
        assert_eq!(range.continuation_chain(c), vec![c, c2, c3]);
    }

    #[test]
    fn test_appearance_rules() {
        let mut b = Range::builder(SCALE);
        let c = b.note_event(Note::new(60), ToneKind::Start);
        let e = b.note_event(Note::new(64), ToneKind::ShortStop);
        b.next_segment();
        let g = b.note_event(Note::new(67), ToneKind::Start);
        b.next_segment();
        let a = b.note_event(Note::new(69), ToneKind::Start);
        let c_again = b.note_event(Note::new(60), ToneKind::Start);

        // short-stopped grace notes may still appear
        b.appearance(e, c).unwrap();
        b.appearance(e, g).unwrap();
        b.appearance(g, a).unwrap();
        // multiplicity is unbounded
        b.appearance(g, c_again).unwrap();

        assert!(matches!(b.appearance(c, a), Err(TonegraphError::InvalidRelation { .. })));
        assert!(matches!(b.appearance(c, c_again), Err(TonegraphError::InvalidRelation { .. })));
        assert!(matches!(b.appearance(c, c), Err(TonegraphError::InvalidRelation { .. })));

        let range = b.build().unwrap();
        assert_eq!(range.appearances().count(), 4);
        assert_eq!(range.stretches().count(), 0);
    }

    #[test]
    fn test_alternative_partition_is_also_legal() {
        // Tone 3 read as a short tail after tone 2 in its own sub-range
        let mut b = Range::builder(SCALE);
        let t1 = b.note_event(Note::new(64), ToneKind::Start);
        let t2 = b.note_event(Note::new(60), ToneKind::Start);
        b.next_segment();
        let t1b = b.note_event(Note::new(64), ToneKind::Continue);
        let t2b = b.note_event(Note::new(60), ToneKind::Continue);
        b.next_segment();
        b.note_event(Note::new(64), ToneKind::ShortStop);
        let t3 = b.note_event(Note::new(62), ToneKind::ShortStop);

        b.stretch(t1, t1b).unwrap();
        b.stretch(t2, t2b).unwrap();
        b.appearance(t2b, t3).unwrap();
        let range = b.build().unwrap();

        assert_eq!(range.segment_count(), 3);
        assert_eq!(range.stretches().count(), 2);
    }

    #[test]
    fn test_empty_and_degree_ranges() {
        let mut b = Range::builder(SCALE);
        b.next_segment().next_segment();
        assert_eq!(b.build().unwrap_err(), TonegraphError::EmptyRange);

        let degree = Range::degree(SCALE, Note::MIDDLE_C);
        assert!(degree.is_degree());
        assert_eq!(degree.size(), 1);
        assert_eq!(degree.segment_count(), 1);
        assert!(degree.relations().is_empty());
    }

    #[test]
    fn test_trailing_empty_segment_is_ignored() {
        let mut b = Range::builder(SCALE);
        b.note_event(Note::new(60), ToneKind::Start);
        b.next_segment().next_segment();
        let range = b.build().unwrap();
        assert_eq!(range.segment_count(), 1);
    }

    #[test]
    fn test_serializes() {
        let ex = worked_example();
        let range = ex.builder.build().unwrap();
        let json = serde_json::to_string(&range).unwrap();
        let back: Range = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
    }

    fn from_value(value: serde_json::Value) -> std::result::Result<Range, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    #[test]
    fn test_deserialize_rejects_second_stretch() {
        let ex = worked_example();
        let range = ex.builder.build().unwrap();
        let mut value = serde_json::to_value(&range).unwrap();
        let extra = serde_json::json!({
            "kind": "Stretch",
            "from": ex.t1_start.0,
            "to": ex.t1_continue.0,
        });
        value["relations"].as_array_mut().unwrap().push(extra);

        let err = from_value(value).unwrap_err();
        let expected = TonegraphError::DuplicateStretch { source_event: ex.t1_start.0 }.to_string();
        assert!(err.contains(&expected), "{err}");
    }

    #[test]
    fn test_build_rejects_non_finite_tone() {
        let mut b = Range::builder(SCALE);
        b.note_event(Note::with_adjustment(60, f64::NAN), ToneKind::Start);
        assert!(matches!(b.build(), Err(TonegraphError::InvalidNote(_))));
    }

    #[test]
    fn test_deserialize_rejects_malformed_arena() {
        let degree = serde_json::to_value(Range::degree(SCALE, Note::MIDDLE_C)).unwrap();

        let mut bad_tone = degree.clone();
        bad_tone["events"][0]["tone"] = serde_json::json!(5);
        assert!(from_value(bad_tone).is_err());

        let mut skipped_segment = degree.clone();
        skipped_segment["events"][0]["segment"] = serde_json::json!(2);
        assert!(from_value(skipped_segment).is_err());

        let mut empty = degree.clone();
        empty["events"] = serde_json::json!([]);
        assert!(from_value(empty).is_err());

        let mut self_loop = degree;
        self_loop["relations"] = serde_json::json!([{ "kind": "Appearance", "from": 0, "to": 0 }]);
        assert!(from_value(self_loop).is_err());
    }
}
