//! Error types for tonegraph

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TonegraphError {
    #[error("Invalid interval: {semitones} semitones with {cents} cents")]
    InvalidInterval { semitones: i32, cents: f64 },
    #[error("Index {index} out of range (limit {limit})")]
    IndexOutOfRange { index: usize, limit: usize },
    #[error("Register {index} collides: {reason}")]
    RegisterCollision { index: usize, reason: &'static str },
    #[error("Tone-event {source_event} already has an outgoing stretch")]
    DuplicateStretch { source_event: usize },
    #[error("Invalid relation {from} -> {to}: {reason}")]
    InvalidRelation {
        from: usize,
        to: usize,
        reason: &'static str,
    },
    #[error("Range has no tone-events")]
    EmptyRange,
    #[error("Malformed range: {0}")]
    MalformedRange(String),
    #[error("Invalid scale: {0}")]
    InvalidScale(String),
    #[error("Invalid note: {0}")]
    InvalidNote(String),
    #[error("Invalid frequency: {0} Hz")]
    InvalidFrequency(f64),
    #[error("Scale {0} is not systematic")]
    NotSystematic(u64),
    #[error("Range anchored to scale {found}, expected {expected}")]
    ScaleMismatch { expected: u64, found: u64 },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TonegraphError>;
