use std::io::Read;

use super::*;

fn product(name: &str, price: f64, category: &str) -> Product {
    Product { name: name.into(), price, category: category.into(), ..Product::default() }
}

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

#[test]
fn empty_list_is_refused() {
    let err = product_sheet_xlsx(&[]).unwrap_err();
    assert!(matches!(err, ReportError::Empty(NO_PRODUCTS_XLSX)));
}

#[test]
fn package_has_every_part() {
    let bytes = product_sheet_xlsx(&[product("Martillo", 10.0, "Herramientas")]).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/_rels/workbook.xml.rels",
            "xl/workbook.xml",
            "xl/worksheets/sheet1.xml",
        ]
    );
}

#[test]
fn workbook_names_the_sheet() {
    let bytes = product_sheet_xlsx(&[product("Martillo", 10.0, "Herramientas")]).unwrap();
    assert!(read_part(&bytes, "xl/workbook.xml").contains(r#"<sheet name="Productos" sheetId="1" r:id="rId1"/>"#));
}

#[test]
fn rows_hold_position_name_price_and_category() {
    let bytes = product_sheet_xlsx(&[
        product("Martillo", 10.0, "Herramientas"),
        product("Cable 2x12", 3.456, "Eléctricos"),
    ])
    .unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");

    assert!(sheet.contains(r#"<c r="B1" t="inlineStr"><is><t>Nombre</t></is></c>"#));
    assert!(sheet.contains(r#"<c r="D1" t="inlineStr"><is><t>Categoría</t></is></c>"#));
    assert!(sheet.contains(r#"<c r="A2"><v>1</v></c>"#));
    assert!(sheet.contains(r#"<c r="C2" t="inlineStr"><is><t>10.00</t></is></c>"#));
    assert!(sheet.contains(r#"<c r="A3"><v>2</v></c>"#));
    assert!(sheet.contains(r#"<c r="C3" t="inlineStr"><is><t>3.46</t></is></c>"#));
    assert!(sheet.contains(r#"<c r="D3" t="inlineStr"><is><t>Eléctricos</t></is></c>"#));
}

#[test]
fn markup_in_names_is_escaped() {
    let bytes = product_sheet_xlsx(&[product("Tubo <PVC> & codo", 1.0, "Fontanería")]).unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("Tubo &lt;PVC&gt; &amp; codo"));
}
