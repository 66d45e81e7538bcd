//! Append-only store of known ranges
//!
//! Readers take a [`CorpusSnapshot`], a cheap handle on the entries as they
//! stood at that moment. Appends copy the entry list only while a snapshot is
//! still alive, so matching never blocks a writer for long.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tonegraph_core::{Range, ScaleId, SongTag};
use tracing::debug;

/// Who produced a corpus range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    Human,
    Algorithm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub range: Range,
    pub song: Option<SongTag>,
    pub origin: Origin,
    /// Position in append order
    pub sequence: usize,
}

#[derive(Debug, Default)]
pub struct Corpus {
    entries: Mutex<Arc<Vec<Arc<CorpusEntry>>>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Vec<Arc<CorpusEntry>>>> {
        // entries are only ever pushed whole, so a poisoned list is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a range; returns its sequence number
    pub fn add(&self, range: Range, song: Option<SongTag>, origin: Origin) -> usize {
        let mut entries = self.lock();
        let sequence = entries.len();
        debug!(sequence, scale = %range.scale(), size = range.size(), ?origin, "Corpus entry added");
        Arc::make_mut(&mut *entries).push(Arc::new(CorpusEntry {
            range,
            song,
            origin,
            sequence,
        }));
        sequence
    }

    pub fn snapshot(&self) -> CorpusSnapshot {
        let entries = self.lock();
        CorpusSnapshot {
            entries: Arc::clone(&*entries),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Read-only view of the corpus at one point in time
#[derive(Debug, Clone, Default)]
pub struct CorpusSnapshot {
    entries: Arc<Vec<Arc<CorpusEntry>>>,
}

impl CorpusSnapshot {
    pub fn entries(&self) -> &[Arc<CorpusEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ranges(&self) -> impl Iterator<Item = &Range> {
        self.entries.iter().map(|e| &e.range)
    }

    pub fn ranges_for(&self, scale: ScaleId) -> impl Iterator<Item = &Range> {
        self.ranges().filter(move |r| r.scale() == scale)
    }

    pub fn ranges_for_song<'a>(&'a self, song: &'a SongTag) -> impl Iterator<Item = &'a Range> {
        self.entries
            .iter()
            .filter(move |e| e.song.as_ref() == Some(song))
            .map(|e| &e.range)
    }
}
