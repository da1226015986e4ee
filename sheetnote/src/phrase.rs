//! Phrase splitting
//!
//! A sheet holds one header followed by one or more staves. Leading METADATA
//! tokens are merged into a single header token; every CLEF then opens a new
//! phrase, and each phrase starts with its own copy of the header.

use crate::token::{Token, TokenKind};
use std::fmt;

/// Ordered tokens of one musical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    tokens: Vec<Token>,
}

impl Phrase {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<Vec<Token>> for Phrase {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.tokens.iter().map(|t| t.kind().as_str()).collect();
        write!(f, "[{}]", kinds.join(", "))
    }
}

/// Merge the leading METADATA run into one token
fn merge_header(tokens: &[Token]) -> Option<Token> {
    let first = tokens.first().filter(|t| t.kind() == TokenKind::Metadata)?;
    let text = tokens
        .iter()
        .take_while(|t| t.kind() == TokenKind::Metadata)
        .map(Token::value)
        .collect::<Vec<_>>()
        .join(" ");
    Some(Token::new(TokenKind::Metadata, text, first.position()))
}

/// Split a sheet-wide token stream into phrases
///
/// Tokens before the first CLEF that are not part of the header form a phrase
/// of their own, so validation reports them instead of dropping them.
pub fn split_phrases(tokens: &[Token]) -> Vec<Phrase> {
    let header = merge_header(tokens);
    let body_start = tokens
        .iter()
        .position(|t| t.kind() != TokenKind::Metadata)
        .unwrap_or(tokens.len());
    let body = &tokens[body_start..];

    let mut chunks: Vec<&[Token]> = Vec::new();
    let mut start = 0;
    for (index, token) in body.iter().enumerate() {
        if token.kind() == TokenKind::Clef && index > start {
            chunks.push(&body[start..index]);
            start = index;
        }
    }
    if start < body.len() {
        chunks.push(&body[start..]);
    }

    if chunks.is_empty() {
        return header.map(|h| vec![Phrase::new(vec![h])]).unwrap_or_default();
    }

    chunks
        .into_iter()
        .map(|chunk| {
            let mut phrase = Vec::with_capacity(chunk.len() + 1);
            phrase.extend(header.iter().cloned());
            phrase.extend_from_slice(chunk);
            Phrase::new(phrase)
        })
        .collect()
}
