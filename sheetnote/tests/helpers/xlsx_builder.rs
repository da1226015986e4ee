//! Minimal .xlsx writer for fixtures
//!
//! Produces just enough of the package for calamine and the drawing reader:
//! workbook, one worksheet, shared strings, and a drawing with one
//! two-cell anchor per picture.

use sheetnote::CellPosition;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XDR_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

enum Value {
    Text(String),
    Number(f64),
}

pub struct XlsxBuilder {
    sheet_name: String,
    values: Vec<(CellPosition, Value)>,
    images: Vec<(CellPosition, Vec<u8>)>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn cell(reference: &str) -> CellPosition {
    reference.parse().unwrap()
}

impl XlsxBuilder {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            values: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn text(mut self, reference: &str, text: &str) -> Self {
        self.values.push((cell(reference), Value::Text(text.to_string())));
        self
    }

    pub fn number(mut self, reference: &str, value: f64) -> Self {
        self.values.push((cell(reference), Value::Number(value)));
        self
    }

    /// Anchor a PNG picture with its top-left corner in `reference`
    pub fn image(mut self, reference: &str, png: Vec<u8>) -> Self {
        self.images.push((cell(reference), png));
        self
    }

    fn shared_strings(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter_map(|(_, v)| match v {
                Value::Text(t) => Some(t.as_str()),
                Value::Number(_) => None,
            })
            .collect()
    }

    fn sheet_xml(&self) -> String {
        let mut cells: Vec<(CellPosition, String)> = Vec::new();
        let mut string_index = 0;
        for (pos, value) in &self.values {
            let xml = match value {
                Value::Text(_) => {
                    let xml = format!(r#"<c r="{}" t="s"><v>{}</v></c>"#, pos, string_index);
                    string_index += 1;
                    xml
                }
                Value::Number(n) => format!(r#"<c r="{}"><v>{}</v></c>"#, pos, n),
            };
            cells.push((*pos, xml));
        }
        cells.sort_by_key(|(pos, _)| *pos);

        let mut rows = String::new();
        let mut current_row: Option<u32> = None;
        for (pos, xml) in &cells {
            if current_row != Some(pos.row) {
                if current_row.is_some() {
                    rows.push_str("</row>");
                }
                rows.push_str(&format!(r#"<row r="{}">"#, pos.row + 1));
                current_row = Some(pos.row);
            }
            rows.push_str(xml);
        }
        if current_row.is_some() {
            rows.push_str("</row>");
        }

        let drawing = if self.images.is_empty() {
            String::new()
        } else {
            r#"<drawing r:id="rId1"/>"#.to_string()
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheetData>{rows}</sheetData>{drawing}</worksheet>"#
        )
    }

    fn drawing_xml(&self) -> String {
        let mut anchors = String::new();
        for (index, (pos, _)) in self.images.iter().enumerate() {
            let id = index + 1;
            anchors.push_str(&format!(
                r#"<xdr:twoCellAnchor editAs="oneCell"><xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:to><xdr:col>{col_to}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row_to}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to><xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{id}" name="Picture {id}"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId{id}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr></xdr:pic><xdr:clientData/></xdr:twoCellAnchor>"#,
                col = pos.column,
                row = pos.row,
                col_to = pos.column + 1,
                row_to = pos.row + 1,
                id = id,
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><xdr:wsDr xmlns:xdr="{XDR_NS}" xmlns:a="{A_NS}" xmlns:r="{REL_NS}">{anchors}</xdr:wsDr>"#
        )
    }

    fn drawing_rels(&self) -> String {
        let mut rels = String::new();
        for index in 1..=self.images.len() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{index}" Type="{REL_NS}/image" Target="../media/image{index}.png"/>"#
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#
        )
    }

    pub fn write(&self, path: &Path) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut put = |name: &str, content: &[u8]| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content).unwrap();
        };

        put(
            "[Content_Types].xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/></Types>"#
            )
            .as_bytes(),
        );
        put(
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            )
            .as_bytes(),
        );
        put(
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                escape(&self.sheet_name)
            )
            .as_bytes(),
        );
        put(
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="{REL_NS}/styles" Target="styles.xml"/></Relationships>"#
            )
            .as_bytes(),
        );

        put(
            "xl/styles.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{MAIN_NS}"><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellXfs></styleSheet>"#
            )
            .as_bytes(),
        );

        let strings = self.shared_strings();
        let items: String = strings
            .iter()
            .map(|s| format!("<si><t>{}</t></si>", escape(s)))
            .collect();
        put(
            "xl/sharedStrings.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NS}" count="{n}" uniqueCount="{n}">{items}</sst>"#,
                n = strings.len()
            )
            .as_bytes(),
        );

        put("xl/worksheets/sheet1.xml", self.sheet_xml().as_bytes());

        if !self.images.is_empty() {
            put(
                "xl/worksheets/_rels/sheet1.xml.rels",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#
                )
                .as_bytes(),
            );
            put("xl/drawings/drawing1.xml", self.drawing_xml().as_bytes());
            put("xl/drawings/_rels/drawing1.xml.rels", self.drawing_rels().as_bytes());
            for (index, (_, png)) in self.images.iter().enumerate() {
                put(&format!("xl/media/image{}.png", index + 1), png.as_slice());
            }
        }

        zip.finish().unwrap();
    }
}
