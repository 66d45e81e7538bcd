//! tonegraph-core: Scales, tone-event ranges, and pulse matching

mod config;
mod error;
mod interval;
pub mod matcher;
pub mod modulation;
mod note;
pub mod phrase;
pub mod presets;
mod pulse;
pub mod range;
mod scale;
mod spectrum;

pub use config::MatcherConfig;
pub use error::{Result, TonegraphError};
pub use interval::{CENTS_EPSILON, Interval};
pub use matcher::{Matcher, RangeMatch};
pub use modulation::ModulationBands;
pub use note::Note;
pub use phrase::{Phrase, PhraseBuffer, SongTag};
pub use presets::StandardScale;
pub use pulse::{PartId, Pulse, SampleKey, SampledTone};
pub use range::{EventId, Range, RangeBuilder, Relation, RelationKind, ToneEvent, ToneKind};
pub use scale::{Capabilities, Degrees, Scale, ScaleId};
pub use spectrum::{DEFAULT_TOLERANCE_CENTS, SpectralComponent, Spectrum};
