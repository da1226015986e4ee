//! Tokens extracted from spreadsheet cells

use std::fmt;
use std::str::FromStr;

/// Category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Clef,
    Note,
    Alteration,
    Rest,
    Duration,
    Metadata,
    /// Measure bar or end-of-staff bar
    Bar,
    Unknown,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Clef => "CLEF",
            TokenKind::Note => "NOTE",
            TokenKind::Alteration => "ALTERATION",
            TokenKind::Rest => "REST",
            TokenKind::Duration => "DURATION",
            TokenKind::Metadata => "METADATA",
            TokenKind::Bar => "BAR",
            TokenKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-based cell coordinates, ordered row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellPosition {
    pub row: u32,
    pub column: u32,
}

impl CellPosition {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Spreadsheet column letters (`0` → `A`, `26` → `AA`)
    pub fn column_letters(&self) -> String {
        let mut letters = Vec::new();
        let mut index = self.column as u64 + 1;
        while index > 0 {
            let remainder = ((index - 1) % 26) as u8;
            letters.push((b'A' + remainder) as char);
            index = (index - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row + 1)
    }
}

/// Error returned when an A1-style reference cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCellReference(pub String);

impl fmt::Display for InvalidCellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell reference '{}'", self.0)
    }
}

impl std::error::Error for InvalidCellReference {}

impl FromStr for CellPosition {
    type Err = InvalidCellReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCellReference(s.to_string());
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .filter(|&i| i > 0)
            .ok_or_else(invalid)?;
        let (letters, digits) = s.split_at(split);

        let mut column: u64 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(invalid());
            }
            column = column * 26 + (c.to_ascii_uppercase() as u64 - 'A' as u64 + 1);
            if column > u32::MAX as u64 {
                return Err(invalid());
            }
        }

        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Ok(Self::new(row - 1, (column - 1) as u32))
    }
}

/// One classified unit extracted from a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    value: String,
    position: CellPosition,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: CellPosition) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Literal text for text cells, symbol id for recognized images
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn position(&self) -> CellPosition {
        self.position
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{} at {}", self.kind, self.position)
        } else {
            write!(f, "{} '{}' at {}", self.kind, self.value, self.position)
        }
    }
}
