//! Staff positions to concrete pitches
//!
//! Note-head images only say where on the staff a head sits. The pitch it
//! denotes depends on the active clef and on an alteration written just
//! before it. Staff steps count diatonic degrees upward from step 1.

use serde::Deserialize;
use std::fmt;

/// Highest staff step a note-head image can denote
pub const MAX_STAFF_STEP: u8 = 16;

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    /// G clef: step 1 is B3, step 2 is middle C
    Treble,
    /// F clef: step 1 is C2, step 15 is middle C
    Bass,
}

impl Clef {
    /// Diatonic index (C0 = 0) of staff step 1
    fn base_degree(self) -> u32 {
        match self {
            Clef::Treble => 3 * 7 + 6,
            Clef::Bass => 2 * 7,
        }
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clef::Treble => f.write_str("treble"),
            Clef::Bass => f.write_str("bass"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alteration {
    Sharp,
    Flat,
    Natural,
}

impl Alteration {
    fn sign(self) -> &'static str {
        match self {
            Alteration::Sharp => "#",
            Alteration::Flat => "b",
            Alteration::Natural => "",
        }
    }

    /// Parse a plain-text alteration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sharp" | "#" | "diese" => Some(Alteration::Sharp),
            "flat" | "b" | "bemol" => Some(Alteration::Flat),
            "natural" | "becarre" => Some(Alteration::Natural),
            _ => None,
        }
    }
}

/// A spelled pitch such as `F#4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    letter: char,
    alteration: Option<Alteration>,
    octave: u32,
}

impl Pitch {
    /// Pitch of a note head at `step` under `clef`; `None` if the step is off the staff
    pub fn from_staff_step(clef: Clef, step: u8, alteration: Option<Alteration>) -> Option<Self> {
        if step == 0 || step > MAX_STAFF_STEP {
            return None;
        }
        let degree = clef.base_degree() + (step as u32 - 1);
        Some(Self {
            letter: LETTERS[(degree % 7) as usize],
            alteration: alteration.filter(|a| *a != Alteration::Natural),
            octave: degree / 7,
        })
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn octave(&self) -> u32 {
        self.octave
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.letter,
            self.alteration.map(Alteration::sign).unwrap_or(""),
            self.octave
        )
    }
}
