//! Reference catalog
//!
//! Maps symbol ids to their musical role and to the perceptual hashes of one
//! or more reference renderings. The catalog is built once at startup and is
//! read-only afterwards; entry order is the tie-break order used by the
//! classifier.
//!
//! On disk the catalog is a directory of images plus an optional
//! `catalog.toml` manifest:
//!
//! ```toml
//! [[symbol]]
//! id = "note-h5"
//! kind = "note"
//! step = 5
//! images = ["Note_H5.JPG"]
//! ```
//!
//! Without a manifest the built-in manifest for the traditional image names
//! is used and absent images are skipped.

use crate::error::{Error, Result};
use crate::hash::PerceptualHash;
use crate::pitch::{Alteration, Clef, MAX_STAFF_STEP};
use crate::token::TokenKind;
use image::{DynamicImage, ImageReader};
use num_rational::Ratio;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Manifest file name inside the reference directory
pub const MANIFEST_FILE: &str = "catalog.toml";

const DEFAULT_MANIFEST: &str = include_str!("../assets/default_catalog.toml");

/// Duration multiplier, e.g. `2` or `1/2`
pub type DurationFactor = Ratio<u32>;

/// Largest numerator or denominator accepted in a duration factor
pub const MAX_DURATION_TERM: u32 = 64;

/// Parse `n` or `n/d` into a positive ratio with terms up to [`MAX_DURATION_TERM`]
pub fn parse_ratio(text: &str) -> Option<DurationFactor> {
    let text = text.trim();
    let (numer, denom) = match text.split_once('/') {
        Some((n, d)) => (n.trim().parse::<u32>().ok()?, d.trim().parse::<u32>().ok()?),
        None => (text.parse::<u32>().ok()?, 1),
    };
    let terms = 1..=MAX_DURATION_TERM;
    if !terms.contains(&numer) || !terms.contains(&denom) {
        return None;
    }
    Some(Ratio::new(numer, denom))
}

/// Sum of duration factors; `None` when the exact sum does not fit
pub fn checked_sum<'a>(
    factors: impl IntoIterator<Item = &'a DurationFactor>,
) -> Option<DurationFactor> {
    factors.into_iter().try_fold(Ratio::from_integer(0), |sum: DurationFactor, f| {
        let denom = sum.denom().checked_mul(*f.denom())?;
        let numer = sum
            .numer()
            .checked_mul(*f.denom())?
            .checked_add(f.numer().checked_mul(*sum.denom())?)?;
        Some(Ratio::new(numer, denom))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarKind {
    /// Separates measures within a staff
    Measure,
    /// Closes the staff
    StaffEnd,
}

impl BarKind {
    /// Parse a bar name as written in manifests and token values
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "measure" | "measure-bar" => Some(BarKind::Measure),
            "staff-end" | "staff-end-bar" => Some(BarKind::StaffEnd),
            _ => None,
        }
    }
}

/// Musical meaning of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRole {
    Clef(Clef),
    /// Note head at a staff step (1 ..= 16)
    Note { step: u8 },
    Alteration(Alteration),
    Rest,
    Duration(DurationFactor),
    Bar(BarKind),
}

impl SymbolRole {
    pub fn token_kind(&self) -> TokenKind {
        match self {
            SymbolRole::Clef(_) => TokenKind::Clef,
            SymbolRole::Note { .. } => TokenKind::Note,
            SymbolRole::Alteration(_) => TokenKind::Alteration,
            SymbolRole::Rest => TokenKind::Rest,
            SymbolRole::Duration(_) => TokenKind::Duration,
            SymbolRole::Bar(_) => TokenKind::Bar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: String,
    pub role: SymbolRole,
}

/// One hashed reference rendering of a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub symbol_id: String,
    pub hash: PerceptualHash,
    pub kind: TokenKind,
    /// Image file the hash was computed from
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default, rename = "symbol")]
    symbols: Vec<ManifestSymbol>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ManifestKind {
    Clef,
    Note,
    Alteration,
    Rest,
    Duration,
    Bar,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestSymbol {
    id: String,
    kind: ManifestKind,
    #[serde(default)]
    images: Vec<String>,
    clef: Option<Clef>,
    step: Option<u8>,
    alteration: Option<Alteration>,
    duration: Option<String>,
    bar: Option<BarKind>,
}

impl ManifestSymbol {
    fn role(&self) -> Result<SymbolRole> {
        let missing = |field: &str| {
            Error::Catalog(format!("symbol '{}' of kind {:?} needs `{}`", self.id, self.kind, field))
        };

        match self.kind {
            ManifestKind::Clef => self.clef.map(SymbolRole::Clef).ok_or_else(|| missing("clef")),
            ManifestKind::Note => {
                let step = self.step.ok_or_else(|| missing("step"))?;
                if step == 0 || step > MAX_STAFF_STEP {
                    return Err(Error::Catalog(format!(
                        "symbol '{}': step {} outside 1..={}",
                        self.id, step, MAX_STAFF_STEP
                    )));
                }
                Ok(SymbolRole::Note { step })
            }
            ManifestKind::Alteration => self
                .alteration
                .map(SymbolRole::Alteration)
                .ok_or_else(|| missing("alteration")),
            ManifestKind::Rest => Ok(SymbolRole::Rest),
            ManifestKind::Duration => {
                let text = self.duration.as_deref().ok_or_else(|| missing("duration"))?;
                parse_ratio(text).map(SymbolRole::Duration).ok_or_else(|| {
                    Error::Catalog(format!("symbol '{}': invalid duration '{}'", self.id, text))
                })
            }
            ManifestKind::Bar => Ok(SymbolRole::Bar(self.bar.unwrap_or(BarKind::Measure))),
        }
    }
}

/// Read-only symbol table plus hashed reference entries
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    symbols: HashMap<String, Symbol>,
    entries: Vec<ReferenceEntry>,
}

impl ReferenceCatalog {
    /// Load the catalog from a reference image directory
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            info!(manifest = %manifest_path.display(), "Loading reference catalog");
            let content =
                fs::read_to_string(&manifest_path).map_err(|e| Error::io(&manifest_path, e))?;
            Self::from_manifest(&content, &manifest_path.display().to_string(), dir, true)
        } else {
            info!(
                dir = %dir.display(),
                "No {} found, using built-in reference names", MANIFEST_FILE
            );
            Self::from_manifest(DEFAULT_MANIFEST, "built-in catalog", dir, false)
        }
    }

    /// Build from manifest text; `strict` turns missing images into errors
    fn from_manifest(content: &str, origin: &str, dir: &Path, strict: bool) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)
            .map_err(|e| Error::Catalog(format!("{}: {}", origin, e)))?;

        let mut builder = CatalogBuilder::new();
        for symbol in &manifest.symbols {
            builder.add_symbol(&symbol.id, symbol.role()?)?;

            for name in &symbol.images {
                let path = match locate_image(dir, name) {
                    Some(path) => path,
                    None if strict => {
                        return Err(Error::io(
                            dir.join(name),
                            std::io::Error::new(
                                std::io::ErrorKind::NotFound,
                                format!("reference image for '{}' not found", symbol.id),
                            ),
                        ));
                    }
                    None => {
                        warn!(symbol = %symbol.id, image = %name, "Reference image not found, skipping");
                        continue;
                    }
                };

                let image = open_image(&path)?;
                builder.add_image(&symbol.id, &image, Some(path))?;
            }
        }

        let catalog = builder.build()?;
        info!(
            symbols = catalog.symbols.len(),
            entries = catalog.entries.len(),
            "Reference catalog loaded"
        );
        Ok(catalog)
    }

    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn symbol(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    /// Reference entries in insertion order
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode by content rather than extension; exported sheets often mislabel JPEG and PNG
fn open_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| Error::io(path, e))?
        .with_guessed_format()
        .map_err(|e| Error::io(path, e))?;
    reader.decode().map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Exact name first, then a case-insensitive match among the directory entries
fn locate_image(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.is_file() {
        return Some(exact);
    }

    let wanted = name.to_lowercase();
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_lowercase() == wanted)
                    .unwrap_or(false)
        })
}

/// Incremental catalog construction
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    symbols: HashMap<String, Symbol>,
    entries: Vec<ReferenceEntry>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol; ids must be unique
    pub fn add_symbol(&mut self, id: &str, role: SymbolRole) -> Result<&mut Self> {
        if self.symbols.contains_key(id) {
            return Err(Error::Catalog(format!("duplicate symbol id '{}'", id)));
        }
        self.symbols.insert(
            id.to_string(),
            Symbol {
                id: id.to_string(),
                role,
            },
        );
        Ok(self)
    }

    /// Hash an image and append it as a rendering of a registered symbol
    pub fn add_image(
        &mut self,
        id: &str,
        image: &DynamicImage,
        source: Option<PathBuf>,
    ) -> Result<&mut Self> {
        let hash = PerceptualHash::of(image).ok_or_else(|| {
            Error::Catalog(format!(
                "reference image for '{}' is empty{}",
                id,
                source
                    .as_ref()
                    .map(|p| format!(" ({})", p.display()))
                    .unwrap_or_default()
            ))
        })?;
        self.add_hash(id, hash, source)
    }

    /// Append a precomputed hash as a rendering of a registered symbol
    pub fn add_hash(
        &mut self,
        id: &str,
        hash: PerceptualHash,
        source: Option<PathBuf>,
    ) -> Result<&mut Self> {
        let symbol = self
            .symbols
            .get(id)
            .ok_or_else(|| Error::Catalog(format!("image added for unknown symbol '{}'", id)))?;
        debug!(symbol = %id, hash = %hash, "Reference entry added");
        self.entries.push(ReferenceEntry {
            symbol_id: id.to_string(),
            hash,
            kind: symbol.role.token_kind(),
            source,
        });
        Ok(self)
    }

    /// Finish; a catalog without entries cannot classify anything
    pub fn build(self) -> Result<ReferenceCatalog> {
        if self.entries.is_empty() {
            return Err(Error::Catalog("catalog has no reference images".to_string()));
        }
        Ok(ReferenceCatalog {
            symbols: self.symbols,
            entries: self.entries,
        })
    }
}
