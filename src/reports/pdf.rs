//! PDF product reports via `printpdf`.
//!
//! Layout is A4 portrait in millimetres, measured from the bottom-left
//! corner as printpdf expects. Builtin Helvetica has no metrics API, so
//! centred text uses an average glyph width estimate.

use std::io::BufWriter;
use std::ops::Range;

use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb, path::PaintMode,
};

use super::{NO_PRODUCTS_PDF, ReportError};
use crate::models::Product;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const BAND_HEIGHT: f32 = 30.0;
const BAND_COLOR: (u8, u8, u8) = (28, 41, 51);

const TABLE_TOP: f32 = 40.0;
const TABLE_BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 8.0;
const COLUMN_X: [f32; 4] = [14.0, 34.0, 114.0, 154.0];
const COLUMN_CHARS: [usize; 4] = [6, 40, 18, 24];
const HEADERS: [&str; 4] = ["#", "Nombre", "Precio", "Categoría"];

const IMAGE_WIDTH_MM: f32 = 60.0;
const IMAGE_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;
const MM_PER_POINT: f32 = 0.3528;
/// Average Helvetica advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Body rows that fit on one page below the table header row.
#[must_use]
pub fn rows_per_page() -> usize {
    // Truncation is intended: partial rows do not fit.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rows = ((PAGE_HEIGHT - TABLE_TOP - TABLE_BOTTOM) / ROW_HEIGHT) as usize;
    rows - 1
}

/// Index ranges of the products printed on each page.
#[must_use]
pub fn page_ranges(total: usize) -> Vec<Range<usize>> {
    let per_page = rows_per_page();
    (0..total)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(total))
        .collect()
}

/// Tabular product list: header band and title on the first page, a
/// `# / Nombre / Precio / Categoría` table that breaks across pages, and a
/// `Página N` footer on every page.
///
/// # Errors
///
/// `Empty` when there are no products; `Pdf` if the document cannot be written.
pub fn product_list_pdf(products: &[Product]) -> Result<Vec<u8>, ReportError> {
    if products.is_empty() {
        return Err(ReportError::Empty(NO_PRODUCTS_PDF));
    }
    let (doc, page1, layer1) = PdfDocument::new("Lista de Productos", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts::load(&doc)?;

    for (page_index, range) in page_ranges(products.len()).into_iter().enumerate() {
        let layer = if page_index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        if page_index == 0 {
            header_band(&layer, "Lista de Productos", 28.0, &fonts.bold);
        }

        let mut y = PAGE_HEIGHT - TABLE_TOP;
        set_fill(&layer, (230, 230, 230));
        layer.add_rect(
            Rect::new(Mm(COLUMN_X[0]), Mm(y - 2.5), Mm(PAGE_WIDTH - COLUMN_X[0]), Mm(y + ROW_HEIGHT - 2.5))
                .with_mode(PaintMode::Fill),
        );
        set_fill(&layer, (0, 0, 0));
        table_row(&layer, &HEADERS.map(str::to_string), y, &fonts.bold);

        for index in range {
            y -= ROW_HEIGHT;
            let product = &products[index];
            let cells = [
                (index + 1).to_string(),
                product.name.clone(),
                product.price_label(),
                product.category.clone(),
            ];
            table_row(&layer, &cells, y, &fonts.regular);
        }

        let footer = format!("Página {}", page_index + 1);
        layer.use_text(&footer, 10.0, Mm(centered_x(&footer, 10.0)), Mm(10.0), &fonts.regular);
    }

    save(doc)
}

/// Single product sheet: header band with the name, the image (60 mm wide,
/// centred) when one is given, then price and category lines.
///
/// # Errors
///
/// `Pdf` if the document cannot be written.
pub fn product_detail_pdf(product: &Product, image: Option<&DynamicImage>) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) = PdfDocument::new(&product.name, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let fonts = Fonts::load(&doc)?;

    header_band(&layer, &product.name, 22.0, &fonts.bold);

    // Distance from the top of the page to the first text line.
    let mut text_top = 50.0;
    if let Some(rgb) = image.map(DynamicImage::to_rgb8).filter(|i| i.width() > 0 && i.height() > 0) {
        let (width, height_px) = (rgb.width(), rgb.height());
        let height = image_height_mm(width, height_px);
        let transform = image_transform(width, PAGE_HEIGHT - 40.0 - height);
        Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb)).add_to_layer(layer.clone(), transform);
        text_top = 40.0 + height + 10.0;
    }

    let price = format!("Precio: {}", product.price_label());
    let category = format!("Categoría: {}", product.category);
    layer.use_text(&price, 14.0, Mm(centered_x(&price, 14.0)), Mm(PAGE_HEIGHT - text_top), &fonts.regular);
    layer.use_text(
        &category,
        14.0,
        Mm(centered_x(&category, 14.0)),
        Mm(PAGE_HEIGHT - text_top - 10.0),
        &fonts.regular,
    );

    save(doc)
}

// =============================================================================
// LAYOUT HELPERS
// =============================================================================

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, ReportError> {
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?;
        Ok(Self { regular, bold })
    }
}

fn header_band(layer: &PdfLayerReference, title: &str, size: f32, font: &IndirectFontRef) {
    set_fill(layer, BAND_COLOR);
    layer.add_rect(
        Rect::new(Mm(0.0), Mm(PAGE_HEIGHT - BAND_HEIGHT), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT)).with_mode(PaintMode::Fill),
    );
    set_fill(layer, (255, 255, 255));
    layer.use_text(title, size, Mm(centered_x(title, size)), Mm(PAGE_HEIGHT - 18.0), font);
    set_fill(layer, (0, 0, 0));
}

fn table_row(layer: &PdfLayerReference, cells: &[String; 4], y: f32, font: &IndirectFontRef) {
    for ((cell, x), max) in cells.iter().zip(COLUMN_X).zip(COLUMN_CHARS) {
        layer.use_text(fit(cell, max), 10.0, Mm(x + 2.0), Mm(y), font);
    }
}

fn set_fill(layer: &PdfLayerReference, (r, g, b): (u8, u8, u8)) {
    let channel = |c: u8| f32::from(c) / 255.0;
    layer.set_fill_color(Color::Rgb(Rgb::new(channel(r), channel(g), channel(b), None)));
}

/// Clip `text` to `max` characters, marking the cut.
fn fit(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Left x (mm) that centres `text` at `size` points on the page.
fn centered_x(text: &str, size: f32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f32;
    let width = chars * size * AVG_GLYPH_WIDTH * MM_PER_POINT;
    ((PAGE_WIDTH - width) / 2.0).max(0.0)
}

/// Rendered height (mm) of an image scaled to `IMAGE_WIDTH_MM`.
#[allow(clippy::cast_precision_loss)]
fn image_height_mm(width_px: u32, height_px: u32) -> f32 {
    height_px as f32 * IMAGE_WIDTH_MM / width_px as f32
}

#[allow(clippy::cast_precision_loss)]
fn image_transform(width_px: u32, bottom_mm: f32) -> ImageTransform {
    let natural_width_mm = width_px as f32 / IMAGE_DPI * MM_PER_INCH;
    let scale = IMAGE_WIDTH_MM / natural_width_mm;
    ImageTransform {
        translate_x: Some(Mm((PAGE_WIDTH - IMAGE_WIDTH_MM) / 2.0)),
        translate_y: Some(Mm(bottom_mm)),
        scale_x: Some(scale),
        scale_y: Some(scale),
        dpi: Some(IMAGE_DPI),
        ..Default::default()
    }
}

fn save(doc: PdfDocumentReference) -> Result<Vec<u8>, ReportError> {
    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Pdf(format!("buffer error: {e}")))
}

#[cfg(test)]
#[path = "pdf_test.rs"]
mod tests;
