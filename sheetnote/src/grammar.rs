//! Phrase grammar
//!
//! A phrase is `METADATA CLEF [METADATA] group+` where each group is
//! `[ALTERATION] (NOTE | REST) [DURATION]`, optionally followed by a BAR.
//! A measure bar continues the staff, a staff-end bar closes it.
//!
//! Validation is a single pass over a six-state machine. The first token the
//! current state does not accept fails the phrase with the accepted kinds.
//! While walking, the validator also collects what synthesis needs: the
//! header, the clef, note and rest events with their duration factors, and
//! per-measure meter warnings.

use crate::catalog::{
    checked_sum, parse_ratio, BarKind, DurationFactor, ReferenceCatalog, SymbolRole,
};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::phrase::Phrase;
use crate::pitch::{Alteration, Clef, Pitch};
use crate::token::{CellPosition, Token, TokenKind};
use num_rational::Ratio;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

fn describe_expected(kinds: &[TokenKind]) -> String {
    match kinds {
        [] => "nothing".to_string(),
        [single] => single.to_string(),
        many => format!(
            "one of {}",
            many.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn describe_end(after: &Option<CellPosition>) -> String {
    match after {
        Some(position) => format!("after {}", position),
        None => "before any token".to_string(),
    }
}

/// First grammar violation found in a phrase
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("unexpected {token}, expected {}", describe_expected(.expected))]
    Unexpected {
        token: Token,
        expected: Vec<TokenKind>,
    },

    #[error("phrase ends {}, expected {}", describe_end(.after), describe_expected(.expected))]
    UnexpectedEnd {
        /// Position of the last token, if any
        after: Option<CellPosition>,
        expected: Vec<TokenKind>,
    },
}

impl Violation {
    pub fn position(&self) -> Option<CellPosition> {
        match self {
            Violation::Unexpected { token, .. } => Some(token.position()),
            Violation::UnexpectedEnd { after, .. } => *after,
        }
    }

    pub fn expected(&self) -> &[TokenKind] {
        match self {
            Violation::Unexpected { expected, .. } | Violation::UnexpectedEnd { expected, .. } => {
                expected
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    /// Beat unit when written as a fraction (`3/4`)
    pub unit: Option<u32>,
}

impl TimeSignature {
    /// `4` or `3/4`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (beats, unit) = match text.split_once('/') {
            Some((beats, unit)) => (beats.trim(), Some(unit.trim().parse::<u32>().ok()?)),
            None => (text, None),
        };
        let beats = beats.parse::<u32>().ok().filter(|b| *b > 0)?;
        if unit == Some(0) {
            return None;
        }
        Some(Self { beats, unit })
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{}/{}", self.beats, unit),
            None => write!(f, "{}", self.beats),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Note,
    Rest,
}

/// A sounding note or a rest, in phrase order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: EventKind,
    /// Clip lookup key: resolved pitch (`F#4`), or the symbol id
    pub value: String,
    /// Length relative to the plain clip
    pub duration: DurationFactor,
    pub position: CellPosition,
}

/// A measure whose durations do not add up to the time signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterWarning {
    /// One-based measure number within the phrase
    pub measure: usize,
    /// Position of the bar closing the measure
    pub position: CellPosition,
    pub expected: DurationFactor,
    pub actual: DurationFactor,
}

impl fmt::Display for MeterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "measure {} (bar at {}) lasts {} beats, time signature gives {}",
            self.measure, self.position, self.actual, self.expected
        )
    }
}

/// Output of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPhrase {
    pub header: Header,
    /// Symbol id of the clef token
    pub clef_symbol: String,
    pub clef: Option<Clef>,
    pub time_signature: Option<TimeSignature>,
    pub events: Vec<NoteEvent>,
    pub warnings: Vec<MeterWarning>,
    /// Whether the phrase ended with a staff-end bar
    pub closed: bool,
}

impl ValidatedPhrase {
    /// Sum of all event durations; `None` when the exact sum does not fit
    pub fn total_duration(&self) -> Option<DurationFactor> {
        checked_sum(self.events.iter().map(|e| &e.duration))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Alteration read, note pending
    Altered,
    /// Note or rest read
    Pitched,
    /// Duration read
    Timed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Metadata,
    Clef { signature: bool },
    Group(Stage),
    Barline,
    End,
}

impl State {
    fn expected(self) -> &'static [TokenKind] {
        use TokenKind as K;
        match self {
            State::Start => &[K::Metadata],
            State::Metadata => &[K::Clef],
            State::Clef { signature: false } => &[K::Metadata, K::Alteration, K::Note, K::Rest],
            State::Clef { signature: true } | State::Barline => &[K::Alteration, K::Note, K::Rest],
            State::Group(Stage::Altered) => &[K::Note],
            State::Group(Stage::Pitched) => {
                &[K::Duration, K::Alteration, K::Note, K::Rest, K::Bar]
            }
            State::Group(Stage::Timed) => &[K::Alteration, K::Note, K::Rest, K::Bar],
            State::End => &[K::Clef],
        }
    }

    fn accepts_end(self) -> bool {
        matches!(
            self,
            State::Group(Stage::Pitched) | State::Group(Stage::Timed) | State::End
        )
    }
}

/// Accumulates the semantics of a phrase while the state machine runs
struct Walk {
    header: Header,
    clef_symbol: String,
    clef: Option<Clef>,
    time_signature: Option<TimeSignature>,
    pending_alteration: Option<Alteration>,
    events: Vec<NoteEvent>,
    measure_start: usize,
    measure: usize,
    warnings: Vec<MeterWarning>,
}

impl Walk {
    fn new() -> Self {
        Self {
            header: Header::default(),
            clef_symbol: String::new(),
            clef: None,
            time_signature: None,
            pending_alteration: None,
            events: Vec::new(),
            measure_start: 0,
            measure: 1,
            warnings: Vec::new(),
        }
    }

    fn close_measure(&mut self, position: CellPosition) {
        let events = &self.events[self.measure_start..];
        if let (Some(signature), false) = (self.time_signature, events.is_empty()) {
            let expected = Ratio::from_integer(signature.beats);
            let Some(actual) = checked_sum(events.iter().map(|e| &e.duration)) else {
                warn!(cell = %position, measure = self.measure, "Measure length too fine to check");
                self.measure_start = self.events.len();
                self.measure += 1;
                return;
            };
            if actual != expected {
                let warning = MeterWarning {
                    measure: self.measure,
                    position,
                    expected,
                    actual,
                };
                warn!(cell = %position, "Meter mismatch: {}", warning);
                self.warnings.push(warning);
            }
        }
        self.measure_start = self.events.len();
        self.measure += 1;
    }

    fn finish(self, closed: bool) -> ValidatedPhrase {
        ValidatedPhrase {
            header: self.header,
            clef_symbol: self.clef_symbol,
            clef: self.clef,
            time_signature: self.time_signature,
            events: self.events,
            warnings: self.warnings,
            closed,
        }
    }
}

/// Grammar validator; the catalog gives meaning to symbol ids
pub struct Validator<'c> {
    catalog: Option<&'c ReferenceCatalog>,
}

impl<'c> Validator<'c> {
    pub fn new(catalog: &'c ReferenceCatalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    /// Validator that resolves symbols from token values only
    pub fn without_catalog() -> Self {
        Self { catalog: None }
    }

    fn role(&self, token: &Token) -> Option<SymbolRole> {
        self.catalog
            .and_then(|c| c.symbol(token.value()))
            .map(|s| s.role)
    }

    pub fn validate(&self, phrase: &Phrase) -> Result<ValidatedPhrase> {
        self.validate_tokens(phrase.tokens())
    }

    pub fn validate_tokens(&self, tokens: &[Token]) -> Result<ValidatedPhrase> {
        let mut state = State::Start;
        let mut walk = Walk::new();

        for token in tokens {
            let kind = token.kind();
            if kind == TokenKind::Unknown {
                return Err(Error::UnrecognizedSymbol {
                    position: token.position(),
                    hint: token.value().to_string(),
                });
            }

            state = match (state, kind) {
                (State::Start, TokenKind::Metadata) => {
                    walk.header = Header::parse(token.value());
                    State::Metadata
                }

                (State::Metadata, TokenKind::Clef) => {
                    walk.clef_symbol = token.value().to_string();
                    walk.clef = self.clef(token);
                    State::Clef { signature: false }
                }

                (State::Clef { signature: false }, TokenKind::Metadata) => {
                    walk.time_signature = TimeSignature::parse(token.value());
                    if walk.time_signature.is_none() {
                        warn!(cell = %token.position(), text = %token.value(), "Not a time signature, ignoring");
                    }
                    State::Clef { signature: true }
                }

                (
                    State::Clef { .. }
                    | State::Barline
                    | State::Group(Stage::Pitched)
                    | State::Group(Stage::Timed),
                    TokenKind::Alteration,
                ) => {
                    walk.pending_alteration = self.alteration(token);
                    State::Group(Stage::Altered)
                }

                (
                    State::Clef { .. }
                    | State::Barline
                    | State::Group(Stage::Altered)
                    | State::Group(Stage::Pitched)
                    | State::Group(Stage::Timed),
                    TokenKind::Note,
                ) => {
                    let value = self.note_value(token, walk.clef, walk.pending_alteration.take());
                    walk.events.push(NoteEvent {
                        kind: EventKind::Note,
                        value,
                        duration: Ratio::from_integer(1),
                        position: token.position(),
                    });
                    State::Group(Stage::Pitched)
                }

                (
                    State::Clef { .. }
                    | State::Barline
                    | State::Group(Stage::Pitched)
                    | State::Group(Stage::Timed),
                    TokenKind::Rest,
                ) => {
                    walk.events.push(NoteEvent {
                        kind: EventKind::Rest,
                        value: token.value().to_string(),
                        duration: Ratio::from_integer(1),
                        position: token.position(),
                    });
                    State::Group(Stage::Pitched)
                }

                (State::Group(Stage::Pitched), TokenKind::Duration) => {
                    let factor = self.duration(token)?;
                    if let Some(event) = walk.events.last_mut() {
                        event.duration *= factor;
                    }
                    State::Group(Stage::Timed)
                }

                (State::Group(Stage::Pitched) | State::Group(Stage::Timed), TokenKind::Bar) => {
                    walk.close_measure(token.position());
                    match self.bar_kind(token) {
                        BarKind::Measure => State::Barline,
                        BarKind::StaffEnd => State::End,
                    }
                }

                (state, _) => {
                    return Err(Violation::Unexpected {
                        token: token.clone(),
                        expected: state.expected().to_vec(),
                    }
                    .into());
                }
            };
        }

        if !state.accepts_end() {
            return Err(Violation::UnexpectedEnd {
                after: tokens.last().map(Token::position),
                expected: state.expected().to_vec(),
            }
            .into());
        }

        // A phrase may stop without a bar; its last measure is still checked
        if let (State::Group(_), Some(last)) = (state, tokens.last()) {
            walk.close_measure(last.position());
        }

        let phrase = walk.finish(state == State::End);
        debug!(
            events = phrase.events.len(),
            warnings = phrase.warnings.len(),
            closed = phrase.closed,
            "Phrase validated"
        );
        Ok(phrase)
    }

    fn clef(&self, token: &Token) -> Option<Clef> {
        if let Some(SymbolRole::Clef(clef)) = self.role(token) {
            return Some(clef);
        }
        let value = token.value().to_ascii_lowercase();
        if value.contains("treble") || value.contains("sol") {
            Some(Clef::Treble)
        } else if value.contains("bass") || value.contains("fa") {
            Some(Clef::Bass)
        } else {
            warn!(cell = %token.position(), symbol = %token.value(), "Clef type unknown, notes keep their symbol ids");
            None
        }
    }

    fn alteration(&self, token: &Token) -> Option<Alteration> {
        let alteration = match self.role(token) {
            Some(SymbolRole::Alteration(alteration)) => Some(alteration),
            _ => Alteration::from_name(token.value()),
        };
        if alteration.is_none() {
            warn!(cell = %token.position(), symbol = %token.value(), "Alteration type unknown, ignoring");
        }
        alteration
    }

    fn note_value(
        &self,
        token: &Token,
        clef: Option<Clef>,
        alteration: Option<Alteration>,
    ) -> String {
        let pitch = match (self.role(token), clef) {
            (Some(SymbolRole::Note { step }), Some(clef)) => {
                Pitch::from_staff_step(clef, step, alteration)
            }
            _ => None,
        };

        match pitch {
            Some(pitch) => pitch.to_string(),
            None => {
                if let Some(alteration) = alteration {
                    warn!(
                        cell = %token.position(),
                        symbol = %token.value(),
                        ?alteration,
                        "No pitch for note, alteration not applied"
                    );
                }
                token.value().to_string()
            }
        }
    }

    fn duration(&self, token: &Token) -> Result<DurationFactor> {
        match self.role(token) {
            Some(SymbolRole::Duration(factor)) => Ok(factor),
            _ => parse_ratio(token.value()).ok_or_else(|| Error::UnrecognizedSymbol {
                position: token.position(),
                hint: token.value().to_string(),
            }),
        }
    }

    fn bar_kind(&self, token: &Token) -> BarKind {
        match self.role(token) {
            Some(SymbolRole::Bar(kind)) => kind,
            _ => BarKind::from_name(token.value()).unwrap_or(BarKind::Measure),
        }
    }
}
