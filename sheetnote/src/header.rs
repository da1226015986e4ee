//! Score header
//!
//! The header is free text of the form `Nom : <title> ; Instrument : <name> .`
//! Clauses end with `;` or `.`; keys are case-insensitive.

use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub title: Option<String>,
    pub instrument: Option<String>,
    /// Any other `key : value` clauses, keys lowercased
    pub extra: BTreeMap<String, String>,
}

impl Header {
    pub fn parse(text: &str) -> Self {
        let mut header = Header::default();

        for clause in text.split([';', '.']) {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }

            let Some((key, value)) = clause.split_once(':') else {
                warn!(clause = %clause, "Header clause without ':', ignoring");
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                warn!(clause = %clause, "Incomplete header clause, ignoring");
                continue;
            }

            match key.as_str() {
                "nom" | "name" | "title" | "titre" => header.title = Some(value.to_string()),
                "instrument" => header.instrument = Some(value.to_string()),
                _ => {
                    header.extra.insert(key, value.to_string());
                }
            }
        }

        header
    }
}
