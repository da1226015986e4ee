//! Recognition tests against a reference catalog written to disk
//!
//! Every fixture glyph must identify itself, also when drawn larger than the
//! reference, and a picture far from all glyphs must stay unrecognized.

mod helpers;

use helpers::{glyph, glyph_bits, upscaled, write_reference_dir, GLYPHS, STRANGER};
use sheetnote::catalog::SymbolRole;
use sheetnote::pitch::{Alteration, Clef};
use sheetnote::{Classification, Classifier, ReferenceCatalog, TokenKind};
use tempfile::TempDir;

const THRESHOLD: u32 = 10;

fn load_catalog() -> (TempDir, ReferenceCatalog) {
    let dir = TempDir::new().unwrap();
    write_reference_dir(dir.path());
    let catalog = ReferenceCatalog::load(dir.path()).unwrap();
    (dir, catalog)
}

#[test]
fn test_catalog_loads_manifest_roles() {
    let (_dir, catalog) = load_catalog();
    assert_eq!(catalog.len(), GLYPHS.len());

    let clef = catalog.symbol("bass-clef").unwrap();
    assert_eq!(clef.role, SymbolRole::Clef(Clef::Bass));
    let sharp = catalog.symbol("sharp").unwrap();
    assert_eq!(sharp.role, SymbolRole::Alteration(Alteration::Sharp));
    assert_eq!(catalog.symbol("note-h5").unwrap().role, SymbolRole::Note { step: 5 });
    assert!(catalog.symbol("note-h9").is_none());
}

#[test]
fn test_every_reference_identifies_itself() {
    let (_dir, catalog) = load_catalog();
    let classifier = Classifier::new(&catalog, THRESHOLD);

    for g in GLYPHS {
        match classifier.classify(&glyph(g.bits)) {
            Classification::Match {
                symbol_id,
                distance,
                ..
            } => {
                assert_eq!(symbol_id, g.id);
                assert_eq!(distance, 0);
            }
            other => panic!("{} not recognized: {:?}", g.id, other),
        }
    }
}

#[test]
fn test_larger_drawings_match() {
    let (_dir, catalog) = load_catalog();
    let classifier = Classifier::new(&catalog, THRESHOLD);

    for scale in [5, 8] {
        for g in GLYPHS {
            let result = classifier.classify(&upscaled(g.bits, scale));
            assert_eq!(result.symbol_id(), Some(g.id), "scale {}", scale);
        }
    }
}

#[test]
fn test_kind_follows_role() {
    let (_dir, catalog) = load_catalog();
    let classifier = Classifier::new(&catalog, THRESHOLD);

    let cases = [
        ("treble-clef", TokenKind::Clef),
        ("note-h2", TokenKind::Note),
        ("flat", TokenKind::Alteration),
        ("rest", TokenKind::Rest),
        ("dot", TokenKind::Duration),
        ("staff-end-bar", TokenKind::Bar),
    ];
    for (id, expected) in cases {
        match classifier.classify(&glyph(glyph_bits(id))) {
            Classification::Match { kind, .. } => assert_eq!(kind, expected, "{}", id),
            other => panic!("{} not recognized: {:?}", id, other),
        }
    }
}

#[test]
fn test_stranger_is_unknown_with_nearest() {
    let (_dir, catalog) = load_catalog();
    let classifier = Classifier::new(&catalog, THRESHOLD);

    match classifier.classify(&glyph(STRANGER)) {
        Classification::Unknown { nearest } => {
            let (_, distance) = nearest.unwrap();
            assert!(distance > THRESHOLD);
        }
        other => panic!("stranger matched: {:?}", other),
    }
}

#[test]
fn test_threshold_is_inclusive() {
    let (_dir, catalog) = load_catalog();
    let bits = glyph_bits("rest") ^ 0b111;

    assert_eq!(
        Classifier::new(&catalog, 3).classify(&glyph(bits)).symbol_id(),
        Some("rest")
    );
    assert!(Classifier::new(&catalog, 2).classify(&glyph(bits)).is_unknown());
}

#[test]
fn test_undecodable_bytes_are_unknown() {
    let (_dir, catalog) = load_catalog();
    let classifier = Classifier::new(&catalog, THRESHOLD);
    assert!(classifier.classify_bytes(b"not a picture").is_unknown());
}

#[test]
fn test_manifest_missing_image_fails() {
    let dir = TempDir::new().unwrap();
    write_reference_dir(dir.path());
    std::fs::remove_file(dir.path().join("sharp.png")).unwrap();

    let err = ReferenceCatalog::load(dir.path()).unwrap_err();
    assert_eq!(err.kind(), sheetnote::ErrorKind::IoFailure);
}
