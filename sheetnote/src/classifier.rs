//! Image classification against the reference catalog
//!
//! Nearest neighbour by Hamming distance between perceptual hashes. Candidates
//! at equal distance keep catalog insertion order, so the first-registered
//! entry wins a tie; ties between different symbols are logged.

use crate::catalog::{ReferenceCatalog, ReferenceEntry};
use crate::hash::PerceptualHash;
use crate::token::TokenKind;
use image::DynamicImage;
use tracing::{debug, warn};

/// A reference entry with its distance to the classified image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub entry: &'a ReferenceEntry,
    pub distance: u32,
}

/// Outcome of classifying one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Match {
        symbol_id: String,
        kind: TokenKind,
        distance: u32,
    },
    /// Nothing within the threshold; `nearest` is the best candidate, if any
    Unknown { nearest: Option<(String, u32)> },
}

impl Classification {
    pub fn symbol_id(&self) -> Option<&str> {
        match self {
            Classification::Match { symbol_id, .. } => Some(symbol_id),
            Classification::Unknown { .. } => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Classification::Unknown { .. })
    }
}

pub struct Classifier<'c> {
    catalog: &'c ReferenceCatalog,
    threshold: u32,
}

impl<'c> Classifier<'c> {
    /// `threshold` is the largest accepted Hamming distance
    pub fn new(catalog: &'c ReferenceCatalog, threshold: u32) -> Self {
        Self { catalog, threshold }
    }

    pub fn catalog(&self) -> &'c ReferenceCatalog {
        self.catalog
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// All catalog entries ordered by distance, then insertion order
    pub fn rank(&self, image: &DynamicImage) -> Vec<Candidate<'c>> {
        match PerceptualHash::of(image) {
            Some(hash) => self.rank_hash(hash),
            None => Vec::new(),
        }
    }

    pub fn rank_hash(&self, hash: PerceptualHash) -> Vec<Candidate<'c>> {
        let mut candidates: Vec<Candidate<'c>> = self
            .catalog
            .entries()
            .iter()
            .map(|entry| Candidate {
                entry,
                distance: entry.hash.distance(&hash),
            })
            .collect();
        // Stable sort keeps insertion order among equal distances
        candidates.sort_by_key(|c| c.distance);
        candidates
    }

    pub fn classify(&self, image: &DynamicImage) -> Classification {
        match PerceptualHash::of(image) {
            Some(hash) => self.classify_hash(hash),
            None => {
                debug!("Image has no pixels, classifying as unknown");
                Classification::Unknown { nearest: None }
            }
        }
    }

    /// Decode raw image bytes and classify; undecodable data is unknown
    pub fn classify_bytes(&self, bytes: &[u8]) -> Classification {
        match image::load_from_memory(bytes) {
            Ok(image) => self.classify(&image),
            Err(e) => {
                warn!(error = %e, "Failed to decode cell image");
                Classification::Unknown { nearest: None }
            }
        }
    }

    pub fn classify_hash(&self, hash: PerceptualHash) -> Classification {
        let ranked = self.rank_hash(hash);
        let Some(best) = ranked.first() else {
            return Classification::Unknown { nearest: None };
        };

        if best.distance > self.threshold {
            debug!(
                hash = %hash,
                nearest = %best.entry.symbol_id,
                distance = best.distance,
                "No reference within threshold"
            );
            return Classification::Unknown {
                nearest: Some((best.entry.symbol_id.clone(), best.distance)),
            };
        }

        if let Some(rival) = ranked
            .iter()
            .skip(1)
            .take_while(|c| c.distance == best.distance)
            .find(|c| c.entry.symbol_id != best.entry.symbol_id)
        {
            warn!(
                chosen = %best.entry.symbol_id,
                rival = %rival.entry.symbol_id,
                distance = best.distance,
                "Ambiguous match, keeping the first catalog entry"
            );
        }

        Classification::Match {
            symbol_id: best.entry.symbol_id.clone(),
            kind: best.entry.kind,
            distance: best.distance,
        }
    }
}
