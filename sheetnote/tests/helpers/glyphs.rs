//! Reference glyph fixtures
//!
//! Each glyph is an 8×8 black and white picture whose average hash equals its
//! bit pattern (white = 1). Patterns are at least 23 bits apart from each
//! other, and STRANGER is at least 25 bits from all of them.

use image::{imageops, DynamicImage, GrayImage, ImageFormat, Luma};
use std::fs;
use std::io::Cursor;
use std::path::Path;

pub struct Glyph {
    pub id: &'static str,
    pub bits: u64,
    /// Manifest lines after `id`, `kind` and `images`
    pub role: &'static str,
}

pub const GLYPHS: &[Glyph] = &[
    Glyph { id: "treble-clef", bits: 0x910a_2dec_8902_5cc1, role: "kind = \"clef\"\nclef = \"treble\"" },
    Glyph { id: "bass-clef", bits: 0x21f1_c19d_9704_58ca, role: "kind = \"clef\"\nclef = \"bass\"" },
    Glyph { id: "note-h2", bits: 0xa5c1_4a6d_8fb8_1df5, role: "kind = \"note\"\nstep = 2" },
    Glyph { id: "note-h3", bits: 0x5f58_ef55_8d2a_35ab, role: "kind = \"note\"\nstep = 3" },
    Glyph { id: "note-h5", bits: 0x7bad_98e0_681e_ec4a, role: "kind = \"note\"\nstep = 5" },
    Glyph { id: "sharp", bits: 0x608c_dc74_3d60_5d33, role: "kind = \"alteration\"\nalteration = \"sharp\"" },
    Glyph { id: "flat", bits: 0x5df3_d3dc_67a5_fae9, role: "kind = \"alteration\"\nalteration = \"flat\"" },
    Glyph { id: "rest", bits: 0xb8a8_f8f4_c7dd_1283, role: "kind = \"rest\"" },
    Glyph { id: "measure-bar", bits: 0xa95b_32e6_ea29_fe40, role: "kind = \"bar\"\nbar = \"measure\"" },
    Glyph { id: "staff-end-bar", bits: 0xf460_3320_bf4d_9481, role: "kind = \"bar\"\nbar = \"staff-end\"" },
    Glyph { id: "dot", bits: 0xf9ec_761b_1a66_2761, role: "kind = \"duration\"\nduration = \"2\"" },
];

/// Pattern far from every glyph
pub const STRANGER: u64 = 0xe26c_f6ef_c83e_2eaa;

pub fn glyph_bits(id: &str) -> u64 {
    GLYPHS
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.bits)
        .unwrap_or_else(|| panic!("no glyph named {id}"))
}

pub fn glyph(bits: u64) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(8, 8, |x, y| {
        if bits >> (63 - (y * 8 + x)) & 1 == 1 {
            Luma([255])
        } else {
            Luma([0])
        }
    }))
}

/// Same picture drawn in `scale`-pixel blocks
pub fn upscaled(bits: u64, scale: u32) -> DynamicImage {
    let small = glyph(bits);
    DynamicImage::ImageLuma8(imageops::resize(
        &small.to_luma8(),
        8 * scale,
        8 * scale,
        imageops::FilterType::Nearest,
    ))
}

pub fn glyph_png(bits: u64) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    glyph(bits).write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Write every glyph as `<id>.png` plus a `catalog.toml` naming them
pub fn write_reference_dir(dir: &Path) {
    let mut manifest = String::new();
    for g in GLYPHS {
        let file = format!("{}.png", g.id);
        glyph(g.bits).save(dir.join(&file)).unwrap();
        manifest.push_str(&format!(
            "[[symbol]]\nid = \"{}\"\n{}\nimages = [\"{}\"]\n\n",
            g.id, g.role, file
        ));
    }
    fs::write(dir.join("catalog.toml"), manifest).unwrap();
}
