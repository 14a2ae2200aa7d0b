//! # piano_notes
//!
//! Note identifiers for the finger piano: scientific pitch notation
//! (`"A4"`, `"C#5"`, `"Bb3"`), the five-note [`NoteSet`]s that are laid out
//! across the fingers of one hand, and the General MIDI instrument table used
//! to voice them.
//!
//! ## Quick start
//!
//! ```rust
//! use piano_notes::{NoteName, NoteSet, NoteSetId};
//!
//! let a4: NoteName = "A4".parse().unwrap();
//! assert_eq!(a4.midi(), 69);
//!
//! let set = NoteSet::for_id(NoteSetId::Original);
//! assert_eq!(set.banner(), "A4 B4 C5 D5 E5");
//! assert_eq!(set.midi_pitches(), [69, 71, 72, 74, 76]);
//! ```

use std::fmt;
use std::str::FromStr;

// ════════════════════════════════════════════════════════════════════════════
// General MIDI instrument numbers (Program 0–127)
// ════════════════════════════════════════════════════════════════════════════

/// The General MIDI programs that make sense for short struck notes.
///
/// Use [`GeneralMidi::program`] to get the raw `u8` value sent in a
/// Program Change message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneralMidi {
    // Piano
    AcousticGrandPiano   = 0,
    BrightAcousticPiano  = 1,
    ElectricGrandPiano   = 2,
    HonkyTonkPiano       = 3,
    ElectricPiano1       = 4,
    ElectricPiano2       = 5,
    Harpsichord          = 6,
    Clavinet             = 7,
    // Chromatic Percussion
    Celesta              = 8,
    Glockenspiel         = 9,
    MusicBox             = 10,
    Vibraphone           = 11,
    Marimba              = 12,
    Xylophone            = 13,
    TubularBells         = 14,
    Dulcimer             = 15,
    // Plucked
    AcousticGuitarNylon  = 24,
    PizzicatoStrings     = 45,
    OrchestralHarp       = 46,
    // Ethnic / percussive
    Koto                 = 107,
    Kalimba              = 108,
    TinkleBell           = 112,
    SteelDrums           = 114,
}

impl GeneralMidi {
    const ALL: [GeneralMidi; 23] = [
        GeneralMidi::AcousticGrandPiano,
        GeneralMidi::BrightAcousticPiano,
        GeneralMidi::ElectricGrandPiano,
        GeneralMidi::HonkyTonkPiano,
        GeneralMidi::ElectricPiano1,
        GeneralMidi::ElectricPiano2,
        GeneralMidi::Harpsichord,
        GeneralMidi::Clavinet,
        GeneralMidi::Celesta,
        GeneralMidi::Glockenspiel,
        GeneralMidi::MusicBox,
        GeneralMidi::Vibraphone,
        GeneralMidi::Marimba,
        GeneralMidi::Xylophone,
        GeneralMidi::TubularBells,
        GeneralMidi::Dulcimer,
        GeneralMidi::AcousticGuitarNylon,
        GeneralMidi::PizzicatoStrings,
        GeneralMidi::OrchestralHarp,
        GeneralMidi::Koto,
        GeneralMidi::Kalimba,
        GeneralMidi::TinkleBell,
        GeneralMidi::SteelDrums,
    ];

    /// Raw MIDI program number (0–127).
    pub fn program(self) -> u8 { self as u8 }

    /// Look up a program number; `None` for programs outside this table.
    pub fn from_program(program: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.program() == program)
    }

    /// The next program in this table, wrapping after the last.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&g| g == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            GeneralMidi::AcousticGrandPiano  => "Acoustic Grand Piano",
            GeneralMidi::BrightAcousticPiano => "Bright Acoustic Piano",
            GeneralMidi::ElectricGrandPiano  => "Electric Grand Piano",
            GeneralMidi::HonkyTonkPiano      => "Honky-Tonk Piano",
            GeneralMidi::ElectricPiano1      => "Electric Piano 1",
            GeneralMidi::ElectricPiano2      => "Electric Piano 2",
            GeneralMidi::Harpsichord         => "Harpsichord",
            GeneralMidi::Clavinet            => "Clavinet",
            GeneralMidi::Celesta             => "Celesta",
            GeneralMidi::Glockenspiel        => "Glockenspiel",
            GeneralMidi::MusicBox            => "Music Box",
            GeneralMidi::Vibraphone          => "Vibraphone",
            GeneralMidi::Marimba             => "Marimba",
            GeneralMidi::Xylophone           => "Xylophone",
            GeneralMidi::TubularBells        => "Tubular Bells",
            GeneralMidi::Dulcimer            => "Dulcimer",
            GeneralMidi::AcousticGuitarNylon => "Acoustic Guitar (nylon)",
            GeneralMidi::PizzicatoStrings    => "Pizzicato Strings",
            GeneralMidi::OrchestralHarp      => "Orchestral Harp",
            GeneralMidi::Koto                => "Koto",
            GeneralMidi::Kalimba             => "Kalimba",
            GeneralMidi::TinkleBell          => "Tinkle Bell",
            GeneralMidi::SteelDrums          => "Steel Drums",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteName: scientific pitch notation
// ════════════════════════════════════════════════════════════════════════════

/// Why a note name failed to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteParseError {
    Empty,
    BadLetter(char),
    BadOctave(String),
    /// Parsed, but the pitch falls outside MIDI 0–127.
    OutOfRange(String),
}

impl fmt::Display for NoteParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteParseError::Empty          => write!(f, "empty note name"),
            NoteParseError::BadLetter(c)   => write!(f, "'{}' is not a note letter (A–G)", c),
            NoteParseError::BadOctave(s)   => write!(f, "bad octave in note name \"{}\"", s),
            NoteParseError::OutOfRange(s)  => write!(f, "note \"{}\" is outside MIDI range 0–127", s),
        }
    }
}

impl std::error::Error for NoteParseError {}

/// Raised or lowered by a semitone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

/// A single pitch such as `A4` (MIDI 69) or `C#5`.
///
/// Octave numbering follows scientific pitch notation: C4 is middle C
/// (MIDI 60) and octaves change between B and C.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteName {
    /// Upper-case letter `A`–`G`.
    pub letter:     char,
    pub accidental: Accidental,
    pub octave:     i8,
}

impl NoteName {
    /// MIDI note number.  Always in 0–127 for a parsed name.
    pub fn midi(&self) -> u8 {
        let pitch = (self.octave as i16 + 1) * 12 + self.semitone();
        pitch.clamp(0, 127) as u8
    }

    /// Semitone offset from C within the octave, before wrapping.
    /// `Cb` is -1 and `B#` is 12, so they land in the neighbouring octave.
    fn semitone(&self) -> i16 {
        let natural = match self.letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            _   => 11, // 'B'
        };
        match self.accidental {
            Accidental::Natural => natural,
            Accidental::Sharp   => natural + 1,
            Accidental::Flat    => natural - 1,
        }
    }
}

impl FromStr for NoteName {
    type Err = NoteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(NoteParseError::Empty)?.to_ascii_uppercase();
        if !('A'..='G').contains(&letter) {
            return Err(NoteParseError::BadLetter(letter));
        }

        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') => (Accidental::Sharp, &rest[1..]),
            Some('b') => (Accidental::Flat,  &rest[1..]),
            _         => (Accidental::Natural, rest),
        };

        // Only a minus sign may precede the digits; `i8` parsing alone takes `+4`
        let digits = octave_str.strip_prefix('-').unwrap_or(octave_str);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NoteParseError::BadOctave(s.to_string()));
        }
        let octave: i8 = octave_str.parse()
            .map_err(|_| NoteParseError::BadOctave(s.to_string()))?;
        if !(-1..=9).contains(&octave) {
            return Err(NoteParseError::BadOctave(s.to_string()));
        }

        let note = NoteName { letter, accidental, octave };
        let pitch = (octave as i16 + 1) * 12 + note.semitone();
        if !(0..=127).contains(&pitch) {
            return Err(NoteParseError::OutOfRange(s.to_string()));
        }
        Ok(note)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acc = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp   => "#",
            Accidental::Flat    => "b",
        };
        write!(f, "{}{}{}", self.letter, acc, self.octave)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteSet: five notes, one per finger (thumb..pinky)
// ════════════════════════════════════════════════════════════════════════════

/// Number of notes in a set: one per finger.
pub const NOTES_PER_SET: usize = 5;

/// Which of the two note sets is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NoteSetId {
    #[default]
    Original,
    Alternate,
}

impl NoteSetId {
    pub fn name(self) -> &'static str {
        match self {
            NoteSetId::Original  => "original",
            NoteSetId::Alternate => "alternate",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteSetError {
    /// Got this many names instead of five.
    WrongLength(usize),
    Note(NoteParseError),
}

impl fmt::Display for NoteSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteSetError::WrongLength(n) =>
                write!(f, "a note set needs exactly {} notes, got {}", NOTES_PER_SET, n),
            NoteSetError::Note(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for NoteSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NoteSetError::Note(e) => Some(e),
            NoteSetError::WrongLength(_) => None,
        }
    }
}

impl From<NoteParseError> for NoteSetError {
    fn from(e: NoteParseError) -> Self { NoteSetError::Note(e) }
}

/// An ordered 5-tuple of notes assigned to fingers thumb..pinky.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteSet {
    notes: [NoteName; NOTES_PER_SET],
}

impl NoteSet {
    /// Default set: A4 B4 C5 D5 E5.
    pub fn original() -> Self {
        Self::builtin(["A4", "B4", "C5", "D5", "E5"])
    }

    /// Set selected by an open palm: F4 G4 A4 B4 C5.
    pub fn alternate() -> Self {
        Self::builtin(["F4", "G4", "A4", "B4", "C5"])
    }

    pub fn for_id(id: NoteSetId) -> Self {
        match id {
            NoteSetId::Original  => Self::original(),
            NoteSetId::Alternate => Self::alternate(),
        }
    }

    fn builtin(names: [&str; NOTES_PER_SET]) -> Self {
        let notes = names.map(|n| n.parse().unwrap_or(NoteName {
            letter: 'A', accidental: Accidental::Natural, octave: 4,
        }));
        NoteSet { notes }
    }

    /// Parse exactly five note names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, NoteSetError> {
        if names.len() != NOTES_PER_SET {
            return Err(NoteSetError::WrongLength(names.len()));
        }
        let mut notes = [NoteName { letter: 'C', accidental: Accidental::Natural, octave: 4 };
                         NOTES_PER_SET];
        for (slot, name) in notes.iter_mut().zip(names) {
            *slot = name.as_ref().parse()?;
        }
        Ok(NoteSet { notes })
    }

    /// Display labels, e.g. `["A4", "B4", "C5", "D5", "E5"]`.
    pub fn labels(&self) -> [String; NOTES_PER_SET] {
        self.notes.map(|n| n.to_string())
    }

    /// All five labels joined by single spaces, for the overlay banner.
    pub fn banner(&self) -> String {
        self.labels().join(" ")
    }

    pub fn midi_pitches(&self) -> [u8; NOTES_PER_SET] {
        self.notes.map(|n| n.midi())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> NoteName { s.parse().unwrap() }

    // ── NoteName ─────────────────────────────────────────────────────────
    #[test]
    fn a4_is_69() {
        assert_eq!(note("A4").midi(), 69);
    }

    #[test]
    fn middle_c_is_60() {
        assert_eq!(note("C4").midi(), 60);
        assert_eq!(note("c4").midi(), 60);
    }

    #[test]
    fn accidentals() {
        assert_eq!(note("C#5").midi(), 73);
        assert_eq!(note("Bb3").midi(), 58);
        // Cb4 sits a semitone below C4, i.e. B3
        assert_eq!(note("Cb4").midi(), 59);
    }

    #[test]
    fn octave_extremes() {
        assert_eq!(note("C-1").midi(), 0);
        assert_eq!(note("G9").midi(), 127);
        assert!(matches!("G#9".parse::<NoteName>(), Err(NoteParseError::OutOfRange(_))));
        assert!(matches!("Cb-1".parse::<NoteName>(), Err(NoteParseError::OutOfRange(_))));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<NoteName>(), Err(NoteParseError::Empty));
        assert_eq!("H4".parse::<NoteName>(), Err(NoteParseError::BadLetter('H')));
        assert!(matches!("A".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
        assert!(matches!("A10".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
        assert!(matches!("Ax4".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
        assert!(matches!("A+4".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
        assert!(matches!("C#+5".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
        assert!(matches!("C--1".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
        assert!(matches!("A-".parse::<NoteName>(), Err(NoteParseError::BadOctave(_))));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(note("f#4").to_string(), "F#4");
        assert_eq!(note(" Eb5 ").to_string(), "Eb5");
    }

    // ── NoteSet ──────────────────────────────────────────────────────────
    #[test]
    fn builtin_sets() {
        assert_eq!(NoteSet::original().labels(), ["A4", "B4", "C5", "D5", "E5"]);
        assert_eq!(NoteSet::alternate().labels(), ["F4", "G4", "A4", "B4", "C5"]);
        assert_eq!(NoteSet::alternate().midi_pitches(), [65, 67, 69, 71, 72]);
    }

    #[test]
    fn banner_joins_with_spaces() {
        assert_eq!(NoteSet::alternate().banner(), "F4 G4 A4 B4 C5");
    }

    #[test]
    fn from_names_needs_five() {
        assert_eq!(
            NoteSet::from_names(&["A4", "B4"]),
            Err(NoteSetError::WrongLength(2)),
        );
        let set = NoteSet::from_names(&["C4", "D4", "E4", "F4", "G4"]).unwrap();
        assert_eq!(set.midi_pitches(), [60, 62, 64, 65, 67]);
    }

    #[test]
    fn from_names_reports_bad_note() {
        let err = NoteSet::from_names(&["C4", "D4", "X4", "F4", "G4"]).unwrap_err();
        assert_eq!(err, NoteSetError::Note(NoteParseError::BadLetter('X')));
    }

    #[test]
    fn for_id_matches_constructors() {
        assert_eq!(NoteSet::for_id(NoteSetId::Original), NoteSet::original());
        assert_eq!(NoteSet::for_id(NoteSetId::Alternate), NoteSet::alternate());
        assert_eq!(NoteSetId::default(), NoteSetId::Original);
    }

    // ── GeneralMidi ──────────────────────────────────────────────────────
    #[test]
    fn general_midi_lookup() {
        assert_eq!(GeneralMidi::from_program(0), Some(GeneralMidi::AcousticGrandPiano));
        assert_eq!(GeneralMidi::from_program(108).map(|g| g.name()), Some("Kalimba"));
        assert_eq!(GeneralMidi::from_program(127), None);
    }

    #[test]
    fn general_midi_next_cycles_the_table() {
        assert_eq!(GeneralMidi::AcousticGrandPiano.next(), GeneralMidi::BrightAcousticPiano);
        assert_eq!(GeneralMidi::SteelDrums.next(), GeneralMidi::AcousticGrandPiano);
        let mut g = GeneralMidi::Kalimba;
        for _ in 0..GeneralMidi::ALL.len() {
            g = g.next();
        }
        assert_eq!(g, GeneralMidi::Kalimba);
    }
}
