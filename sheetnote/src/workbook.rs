//! Spreadsheet access
//!
//! Cell text comes from calamine. Embedded pictures are not exposed by
//! calamine, so they are read from the OOXML package directly:
//! `xl/workbook.xml` maps the sheet name to its part, the sheet's relationships
//! lead to a drawing part, and each drawing anchor names the cell its top-left
//! corner sits in plus the media file holding the picture.

use crate::error::{Error, Result};
use crate::token::CellPosition;
use calamine::{open_workbook, Reader, Xlsx};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::ZipArchive;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WORKBOOK_PART: &str = "xl/workbook.xml";

/// A picture anchored to a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellImage {
    /// Package part the bytes were read from (e.g. `xl/media/image1.png`)
    pub part: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellContent {
    pub text: Option<String>,
    pub images: Vec<CellImage>,
}

/// Non-empty cells of one sheet, in row-major order
#[derive(Debug, Clone, Default)]
pub struct SheetContents {
    name: String,
    cells: BTreeMap<CellPosition, CellContent>,
}

impl SheetContents {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert_text(&mut self, position: CellPosition, text: impl Into<String>) {
        self.cells.entry(position).or_default().text = Some(text.into());
    }

    pub fn insert_image(&mut self, position: CellPosition, image: CellImage) {
        self.cells.entry(position).or_default().images.push(image);
    }

    pub fn get(&self, position: CellPosition) -> Option<&CellContent> {
        self.cells.get(&position)
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellPosition, &CellContent)> {
        self.cells.iter().map(|(pos, content)| (*pos, content))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.cells.values().map(|c| c.images.len()).sum()
    }
}

/// Read one sheet; `None` selects the first sheet
pub fn read_sheet(path: &Path, sheet_name: Option<&str>) -> Result<SheetContents> {
    let workbook_error = |e: calamine::XlsxError| {
        Error::Workbook(format!("{}: {}", path.display(), e))
    };

    let mut workbook: Xlsx<_> = open_workbook(path).map_err(workbook_error)?;
    let names = workbook.sheet_names();
    let name = match sheet_name {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                Error::Workbook(format!(
                    "sheet '{}' not found in {} (available: {})",
                    wanted,
                    path.display(),
                    names.join(", ")
                ))
            })?,
        None => names.first().cloned().ok_or_else(|| {
            Error::Workbook(format!("{} contains no sheets", path.display()))
        })?,
    };

    let mut contents = SheetContents::new(name.clone());

    let range = workbook.worksheet_range(&name).map_err(workbook_error)?;
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    for (row, col, data) in range.used_cells() {
        let text = data.to_string();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let position = CellPosition::new(first_row + row as u32, first_col + col as u32);
        contents.insert_text(position, text);
    }

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut package = Package::new(file, path)?;
    for (position, image) in package.sheet_images(&name)? {
        contents.insert_image(position, image);
    }

    info!(
        sheet = %contents.name(),
        cells = contents.len(),
        images = contents.image_count(),
        "Sheet loaded"
    );
    Ok(contents)
}

#[derive(Debug, Clone)]
struct Relationship {
    rel_type: String,
    target: String,
    external: bool,
}

/// OOXML package (zip archive) reader
struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
    label: String,
}

impl<R: Read + Seek> Package<R> {
    fn new(reader: R, path: &Path) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::Workbook(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            archive,
            label: path.display().to_string(),
        })
    }

    fn read_bytes(&mut self, part: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(part) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Error::Workbook(format!("{} [{}]: {}", self.label, part, e))),
        };
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::Workbook(format!("{} [{}]: {}", self.label, part, e)))?;
        Ok(Some(bytes))
    }

    fn read_xml(&mut self, part: &str) -> Result<Option<String>> {
        match self.read_bytes(part)? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                Error::Workbook(format!("{} [{}]: {}", self.label, part, e))
            }),
            None => Ok(None),
        }
    }

    fn parse_error(&self, part: &str, e: impl std::fmt::Display) -> Error {
        Error::Workbook(format!("{} [{}]: {}", self.label, part, e))
    }

    /// Relationships of a part, keyed by id; empty when the part has none
    fn relationships(&mut self, part: &str) -> Result<HashMap<String, Relationship>> {
        let rels_part = rels_path(part);
        let Some(xml) = self.read_xml(&rels_part)? else {
            return Ok(HashMap::new());
        };
        let doc = roxmltree::Document::parse(&xml).map_err(|e| self.parse_error(&rels_part, e))?;

        let mut rels = HashMap::new();
        for node in doc.descendants().filter(|n| n.tag_name().name() == "Relationship") {
            let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) else {
                continue;
            };
            rels.insert(
                id.to_string(),
                Relationship {
                    rel_type: node.attribute("Type").unwrap_or_default().to_string(),
                    target: target.to_string(),
                    external: node.attribute("TargetMode") == Some("External"),
                },
            );
        }
        Ok(rels)
    }

    /// Part name of a worksheet given its display name
    fn sheet_part(&mut self, sheet_name: &str) -> Result<String> {
        let xml = self
            .read_xml(WORKBOOK_PART)?
            .ok_or_else(|| self.parse_error(WORKBOOK_PART, "missing workbook part"))?;
        let doc =
            roxmltree::Document::parse(&xml).map_err(|e| self.parse_error(WORKBOOK_PART, e))?;

        let rel_id = doc
            .descendants()
            .filter(|n| n.tag_name().name() == "sheet")
            .find(|n| n.attribute("name") == Some(sheet_name))
            .and_then(|n| n.attribute((REL_NS, "id")))
            .ok_or_else(|| {
                self.parse_error(WORKBOOK_PART, format!("no sheet entry for '{}'", sheet_name))
            })?
            .to_string();

        let rels = self.relationships(WORKBOOK_PART)?;
        let rel = rels.get(&rel_id).ok_or_else(|| {
            self.parse_error(WORKBOOK_PART, format!("dangling relationship {}", rel_id))
        })?;
        Ok(resolve_target(WORKBOOK_PART, &rel.target))
    }

    /// Pictures anchored in a sheet, in drawing order
    fn sheet_images(&mut self, sheet_name: &str) -> Result<Vec<(CellPosition, CellImage)>> {
        let sheet_part = self.sheet_part(sheet_name)?;
        let mut drawings: Vec<String> = self
            .relationships(&sheet_part)?
            .into_values()
            .filter(|rel| !rel.external && rel.rel_type.ends_with("/drawing"))
            .map(|rel| resolve_target(&sheet_part, &rel.target))
            .collect();

        drawings.sort();

        let mut images = Vec::new();
        for drawing in drawings {
            images.extend(self.drawing_images(&drawing)?);
        }
        Ok(images)
    }

    fn drawing_images(&mut self, drawing_part: &str) -> Result<Vec<(CellPosition, CellImage)>> {
        let Some(xml) = self.read_xml(drawing_part)? else {
            warn!(part = %drawing_part, "Drawing part referenced but missing");
            return Ok(Vec::new());
        };
        let doc =
            roxmltree::Document::parse(&xml).map_err(|e| self.parse_error(drawing_part, e))?;
        let rels = self.relationships(drawing_part)?;

        let mut anchored = Vec::new();
        for anchor in doc.root_element().children().filter(|n| {
            matches!(n.tag_name().name(), "twoCellAnchor" | "oneCellAnchor")
        }) {
            let Some(position) = anchor_position(&anchor) else {
                warn!(part = %drawing_part, "Drawing anchor without a start cell, skipping");
                continue;
            };

            for blip in anchor.descendants().filter(|n| n.tag_name().name() == "blip") {
                let Some(embed) = blip.attribute((REL_NS, "embed")) else {
                    continue;
                };
                match rels.get(embed) {
                    Some(rel) if !rel.external => {
                        anchored.push((position, resolve_target(drawing_part, &rel.target)));
                    }
                    Some(_) => debug!(cell = %position, "Linked picture skipped"),
                    None => warn!(cell = %position, id = %embed, "Picture relationship missing"),
                }
            }
        }

        let mut images = Vec::with_capacity(anchored.len());
        for (position, part) in anchored {
            match self.read_bytes(&part)? {
                Some(bytes) => {
                    debug!(cell = %position, part = %part, "Picture found");
                    images.push((position, CellImage { part, bytes }));
                }
                None => warn!(cell = %position, part = %part, "Picture part missing"),
            }
        }
        Ok(images)
    }
}

/// Zero-based start cell of a drawing anchor (`<xdr:from>`)
fn anchor_position(anchor: &roxmltree::Node) -> Option<CellPosition> {
    let from = anchor.children().find(|n| n.tag_name().name() == "from")?;
    let field = |name: &str| -> Option<u32> {
        from.children()
            .find(|n| n.tag_name().name() == name)?
            .text()?
            .trim()
            .parse()
            .ok()
    };
    Some(CellPosition::new(field("row")?, field("col")?))
}

/// `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
