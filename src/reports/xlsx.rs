//! XLSX product sheet, assembled directly as an OOXML zip package.
//!
//! A single worksheet with inline strings needs only five parts, so the
//! package is written by hand with `zip` and `quick-xml` instead of pulling
//! in a spreadsheet engine.

use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::CompressionMethod;
use zip::write::FileOptions;

use super::{NO_PRODUCTS_XLSX, ReportError};
use crate::models::Product;

pub const SHEET_NAME: &str = "Productos";
const HEADERS: [&str; 4] = ["#", "Nombre", "Precio", "Categoría"];
const COLUMNS: [char; 4] = ['A', 'B', 'C', 'D'];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Spreadsheet with one `Productos` sheet: a header row, then one row per
/// product with its 1-based position, name, price as text with two decimals,
/// and category.
///
/// # Errors
///
/// `Empty` when there are no products; `Xlsx` if the package cannot be written.
pub fn product_sheet_xlsx(products: &[Product]) -> Result<Vec<u8>, ReportError> {
    if products.is_empty() {
        return Err(ReportError::Empty(NO_PRODUCTS_XLSX));
    }

    let workbook = workbook_xml().map_err(xml_error)?;
    let sheet = sheet_xml(products).map_err(xml_error)?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];
    for (name, data) in parts {
        zip.start_file(name, options)
            .map_err(|e| ReportError::Xlsx(e.to_string()))?;
        zip.write_all(data)
            .map_err(|e| ReportError::Xlsx(e.to_string()))?;
    }
    let cursor = zip.finish().map_err(|e| ReportError::Xlsx(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn xml_error(e: quick_xml::Error) -> ReportError {
    ReportError::Xlsx(e.to_string())
}

// =============================================================================
// PARTS
// =============================================================================

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn new_part() -> Result<XmlWriter, quick_xml::Error> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn workbook_xml() -> Result<Vec<u8>, quick_xml::Error> {
    let mut w = new_part()?;
    w.write_event(Event::Start(
        BytesStart::new("workbook").with_attributes([("xmlns", SPREADSHEET_NS), ("xmlns:r", RELATIONSHIP_NS)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheets")))?;
    w.write_event(Event::Empty(
        BytesStart::new("sheet").with_attributes([("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")]),
    ))?;
    w.write_event(Event::End(BytesEnd::new("sheets")))?;
    w.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(w.into_inner().into_inner())
}

fn sheet_xml(products: &[Product]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut w = new_part()?;
    w.write_event(Event::Start(BytesStart::new("worksheet").with_attributes([("xmlns", SPREADSHEET_NS)])))?;
    w.write_event(Event::Start(BytesStart::new("sheetData")))?;

    write_row(&mut w, 1, &HEADERS.map(Cell::Text))?;

    for (index, product) in products.iter().enumerate() {
        let position = index + 1;
        let price = format!("{:.2}", product.price);
        let cells = [
            Cell::Number(position),
            Cell::Text(&product.name),
            Cell::Text(&price),
            Cell::Text(&product.category),
        ];
        write_row(&mut w, position + 1, &cells)?;
    }

    w.write_event(Event::End(BytesEnd::new("sheetData")))?;
    w.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(w.into_inner().into_inner())
}

enum Cell<'a> {
    Number(usize),
    Text(&'a str),
}

fn write_row(w: &mut XmlWriter, row: usize, cells: &[Cell<'_>]) -> Result<(), quick_xml::Error> {
    let row_ref = row.to_string();
    w.write_event(Event::Start(BytesStart::new("row").with_attributes([("r", row_ref.as_str())])))?;
    for (cell, column) in cells.iter().zip(COLUMNS) {
        let reference = format!("{column}{row}");
        match cell {
            Cell::Number(n) => {
                w.write_event(Event::Start(BytesStart::new("c").with_attributes([("r", reference.as_str())])))?;
                w.write_event(Event::Start(BytesStart::new("v")))?;
                w.write_event(Event::Text(BytesText::new(&n.to_string())))?;
                w.write_event(Event::End(BytesEnd::new("v")))?;
            }
            Cell::Text(text) => {
                w.write_event(Event::Start(
                    BytesStart::new("c").with_attributes([("r", reference.as_str()), ("t", "inlineStr")]),
                ))?;
                w.write_event(Event::Start(BytesStart::new("is")))?;
                w.write_event(Event::Start(BytesStart::new("t")))?;
                w.write_event(Event::Text(BytesText::new(text)))?;
                w.write_event(Event::End(BytesEnd::new("t")))?;
                w.write_event(Event::End(BytesEnd::new("is")))?;
            }
        }
        w.write_event(Event::End(BytesEnd::new("c")))?;
    }
    w.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

#[cfg(test)]
#[path = "xlsx_test.rs"]
mod tests;
