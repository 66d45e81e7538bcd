//! Canonical standard scales as a data table

use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use crate::scale::Scale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardScale {
    Chromatic,
    Major,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Minor,
    Locrian,
    WholeTone,
    MajorPentatonic,
    MinorPentatonic,
    Egyptian,
    BluesMajor,
    BluesMinor,
}

/// One shared instance per preset, in `StandardScale::ALL` order
static SHARED: LazyLock<Vec<Arc<Scale>>> =
    LazyLock::new(|| StandardScale::ALL.iter().map(|p| Arc::new(Scale::preset(*p))).collect());

impl StandardScale {
    pub const ALL: [StandardScale; 14] = [
        Self::Chromatic,
        Self::Major,
        Self::Dorian,
        Self::Phrygian,
        Self::Lydian,
        Self::Mixolydian,
        Self::Minor,
        Self::Locrian,
        Self::WholeTone,
        Self::MajorPentatonic,
        Self::MinorPentatonic,
        Self::Egyptian,
        Self::BluesMajor,
        Self::BluesMinor,
    ];

    /// Semitone steps from the root up to the octave
    pub fn steps(&self) -> &'static [i32] {
        match self {
            Self::Chromatic => &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            Self::Major => &[2, 2, 1, 2, 2, 2, 1],
            Self::Dorian => &[2, 1, 2, 2, 2, 1, 2],
            Self::Phrygian => &[1, 2, 2, 2, 1, 2, 2],
            Self::Lydian => &[2, 2, 2, 1, 2, 2, 1],
            Self::Mixolydian => &[2, 2, 1, 2, 2, 1, 2],
            Self::Minor => &[2, 1, 2, 2, 1, 2, 2],
            Self::Locrian => &[1, 2, 2, 1, 2, 2, 2],
            Self::WholeTone => &[2, 2, 2, 2, 2, 2],
            Self::MajorPentatonic => &[2, 2, 3, 2, 3],
            Self::MinorPentatonic => &[3, 2, 2, 3, 2],
            Self::Egyptian => &[2, 3, 2, 3, 2],
            Self::BluesMajor => &[2, 1, 1, 3, 2, 3],
            Self::BluesMinor => &[3, 2, 1, 1, 3, 2],
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Chromatic => "Chromatic",
            Self::Major => "Major",
            Self::Dorian => "Dorian",
            Self::Phrygian => "Phrygian",
            Self::Lydian => "Lydian",
            Self::Mixolydian => "Mixolydian",
            Self::Minor => "Minor",
            Self::Locrian => "Locrian",
            Self::WholeTone => "WholeTone",
            Self::MajorPentatonic => "MajorPentatonic",
            Self::MinorPentatonic => "MinorPentatonic",
            Self::Egyptian => "Egyptian",
            Self::BluesMajor => "BluesMajor",
            Self::BluesMinor => "BluesMinor",
        }
    }

    /// Case-insensitive lookup; also accepts the Ionian/Aeolian mode names
    pub fn lookup(symbol: &str) -> Option<Self> {
        let wanted = symbol.trim();
        if wanted.eq_ignore_ascii_case("Ionian") {
            return Some(Self::Major);
        }
        if wanted.eq_ignore_ascii_case("Aeolian") {
            return Some(Self::Minor);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.symbol().eq_ignore_ascii_case(wanted))
    }

    /// The shared, immutable instance
    pub fn scale(self) -> Arc<Scale> {
        // ALL follows declaration order
        Arc::clone(&SHARED[self as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_spans_an_octave() {
        for preset in StandardScale::ALL {
            let scale = preset.scale();
            assert!(scale.is_standard());
            assert!(!scale.is_systematic());
            assert_eq!(scale.total_width_cents(), 1200.0, "{}", preset.symbol());
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(StandardScale::lookup("dorian"), Some(StandardScale::Dorian));
        assert_eq!(StandardScale::lookup(" WHOLETONE "), Some(StandardScale::WholeTone));
        assert_eq!(StandardScale::lookup("aeolian"), Some(StandardScale::Minor));
        assert_eq!(StandardScale::lookup("Bebop"), None);
    }

    #[test]
    fn test_instances_are_shared() {
        let a = StandardScale::Lydian.scale();
        let b = Scale::standard("lydian").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.symbol(), Some("Lydian"));
    }

    #[test]
    fn test_major_degrees() {
        let major = StandardScale::Major.scale();
        let numbers: Vec<i32> = major.produce_degrees().map(|n| n.number()).collect();
        assert_eq!(numbers, vec![60, 62, 64, 65, 67, 69, 71, 72]);
    }
}
