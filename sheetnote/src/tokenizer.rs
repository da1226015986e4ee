//! Cell tokenizer
//!
//! Walks a sheet row-major. Within a cell the text comes before the pictures.
//! Text cells become literal tokens:
//!
//! - `FIN` ends the score; later cells are ignored
//! - `*<ratio>` (`*2`, `*1/2`) is a DURATION
//! - anything else is METADATA
//!
//! Pictures are classified against the reference catalog.

use crate::catalog::parse_ratio;
use crate::classifier::{Classification, Classifier};
use crate::token::{CellPosition, Token, TokenKind};
use crate::workbook::SheetContents;
use tracing::{debug, info, warn};

/// Text that ends the score
pub const END_MARKER: &str = "FIN";

/// Prefix of a duration written as text
pub const DURATION_PREFIX: char = '*';

enum TextToken {
    Token(Token),
    End,
}

fn text_token(text: &str, position: CellPosition) -> TextToken {
    let text = text.trim();
    if text.eq_ignore_ascii_case(END_MARKER) {
        return TextToken::End;
    }

    if let Some(ratio) = text.strip_prefix(DURATION_PREFIX) {
        return match parse_ratio(ratio) {
            Some(factor) => TextToken::Token(Token::new(
                TokenKind::Duration,
                factor.to_string(),
                position,
            )),
            None => {
                warn!(cell = %position, text = %text, "Unreadable duration");
                TextToken::Token(Token::new(TokenKind::Unknown, text, position))
            }
        };
    }

    TextToken::Token(Token::new(TokenKind::Metadata, text, position))
}

fn image_token(classification: Classification, position: CellPosition) -> Token {
    match classification {
        Classification::Match {
            symbol_id,
            kind,
            distance,
        } => {
            debug!(cell = %position, symbol = %symbol_id, distance, "Picture recognized");
            Token::new(kind, symbol_id, position)
        }
        Classification::Unknown { nearest } => {
            match &nearest {
                Some((id, distance)) => {
                    warn!(cell = %position, nearest = %id, distance, "Picture not recognized");
                }
                None => warn!(cell = %position, "Picture not recognized"),
            }
            Token::new(
                TokenKind::Unknown,
                nearest.map(|(id, _)| id).unwrap_or_default(),
                position,
            )
        }
    }
}

/// Turn a sheet into one token stream
pub fn tokenize(sheet: &SheetContents, classifier: &Classifier) -> Vec<Token> {
    let mut tokens = Vec::new();

    for (position, cell) in sheet.cells() {
        if let Some(text) = &cell.text {
            match text_token(text, position) {
                TextToken::Token(token) => tokens.push(token),
                TextToken::End => {
                    info!(cell = %position, "End marker reached");
                    break;
                }
            }
        }

        for image in &cell.images {
            tokens.push(image_token(classifier.classify_bytes(&image.bytes), position));
        }
    }

    debug!(sheet = %sheet.name(), tokens = tokens.len(), "Sheet tokenized");
    tokens
}
