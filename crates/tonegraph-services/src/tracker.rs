//! Background phrase tracking over a stream of pulses

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tonegraph_core::{Matcher, Phrase, PhraseBuffer, Pulse, Range, Scale, SongTag};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::corpus::{Corpus, Origin};
use crate::error::ServiceError;

/// Matches submitted pulses against the scales' recognized ranges and the
/// corpus on a worker thread, emitting phrases as they close.
pub struct PhraseTracker {
    config: TrackerConfig,
    matcher: Matcher,
    scales: Arc<Vec<Arc<Scale>>>,
    corpus: Arc<Corpus>,
    pulse_tx: Option<Sender<Pulse>>,
    phrase_tx: Sender<Phrase>,
    phrase_rx: Receiver<Phrase>,
    worker: Option<JoinHandle<()>>,
}

impl PhraseTracker {
    pub fn new(config: TrackerConfig, scales: Vec<Arc<Scale>>, corpus: Arc<Corpus>) -> Result<Self, ServiceError> {
        config.validate()?;
        let matcher = Matcher::new(config.matcher.clone())?;
        let (phrase_tx, phrase_rx) = unbounded();
        Ok(Self {
            config,
            matcher,
            scales: Arc::new(scales),
            corpus,
            pulse_tx: None,
            phrase_tx,
            phrase_rx,
            worker: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.pulse_tx.is_some()
    }

    pub fn corpus(&self) -> Arc<Corpus> {
        self.corpus.clone()
    }

    /// Closed phrases, in the order they closed.
    ///
    /// The tracker keeps its own receiver, so phrases nobody reads stay
    /// queued until drained from any clone or until the tracker is dropped.
    pub fn phrases(&self) -> Receiver<Phrase> {
        self.phrase_rx.clone()
    }

    pub fn start(&mut self) -> Result<(), ServiceError> {
        if self.is_running() {
            return Err(ServiceError::AlreadyRunning);
        }

        let (pulse_tx, pulse_rx) = bounded::<Pulse>(self.config.channel_capacity);
        let worker = TrackLoop {
            matcher: self.matcher.clone(),
            scales: self.scales.clone(),
            corpus: self.corpus.clone(),
            phrases: self.phrase_tx.clone(),
            threshold: self.config.threshold,
            learn: self.config.learn_phrases,
            song: self.config.song_tag(),
        };
        let handle = thread::Builder::new()
            .name("phrase-tracker".into())
            .spawn(move || worker.run(pulse_rx))?;

        self.pulse_tx = Some(pulse_tx);
        self.worker = Some(handle);

        info!(
            scales = self.scales.len(),
            threshold = self.config.threshold,
            learn = self.config.learn_phrases,
            "Phrase tracker started"
        );
        Ok(())
    }

    /// Queue a pulse; blocks while the channel is full
    pub fn submit(&self, pulse: Pulse) -> Result<(), ServiceError> {
        let tx = self.pulse_tx.as_ref().ok_or(ServiceError::NotRunning)?;
        tx.send(pulse).map_err(|_| ServiceError::Disconnected)
    }

    /// Drain queued pulses, flush the open phrase, and join the worker
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        let tx = self.pulse_tx.take().ok_or(ServiceError::NotRunning)?;
        drop(tx);

        if let Some(handle) = self.worker.take() {
            handle.join().map_err(|_| ServiceError::Disconnected)?;
        }

        info!(corpus = self.corpus.len(), "Phrase tracker stopped");
        Ok(())
    }
}

impl Drop for PhraseTracker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct TrackLoop {
    matcher: Matcher,
    scales: Arc<Vec<Arc<Scale>>>,
    corpus: Arc<Corpus>,
    phrases: Sender<Phrase>,
    threshold: f64,
    learn: bool,
    song: Option<SongTag>,
}

impl TrackLoop {
    fn run(self, pulses: Receiver<Pulse>) {
        let known: Vec<Range> = Matcher::candidates(self.scales.iter().map(|s| s.as_ref()));
        let mut buffer = PhraseBuffer::new(self.song.clone());
        debug!(candidates = known.len(), "Tracker worker running");

        while let Ok(pulse) = pulses.recv() {
            let snapshot = self.corpus.snapshot();
            let ranked = self.matcher.match_pulse(
                &pulse,
                known.iter().chain(snapshot.ranges()),
                self.threshold,
                Some(&buffer),
            );
            if ranked.is_empty() {
                debug!(sample = pulse.sample_time().0, "No known pattern for pulse");
            }
            if let Some(phrase) = buffer.push(pulse, &ranked) {
                self.close(phrase);
            }
        }

        if let Some(phrase) = buffer.finish() {
            self.close(phrase);
        }
    }

    fn close(&self, phrase: Phrase) {
        if self.learn {
            match phrase.to_range() {
                Ok(range) => {
                    self.corpus.add(range, phrase.song.clone(), Origin::Algorithm);
                }
                Err(e) => warn!(error = %e, scale = %phrase.scale, "Could not compose phrase into a range"),
            }
        }

        info!(
            scale = %phrase.scale,
            pulses = phrase.len(),
            mean_score = phrase.mean_score(),
            "Phrase closed"
        );
        // the tracker holds a receiver for the channel's whole life
        let _ = self.phrases.send(phrase);
    }
}
