//! Reports — client-side product exports (PDF list, PDF detail, XLSX sheet).
//!
//! DESIGN
//! ======
//! Generators are pure: records in, file bytes out. Nothing touches the
//! backend; the caller decides where the bytes go. File names carry the
//! current local date as `DD-MM-YYYY`.
//!
//! The detail PDF embeds the product image when it can be fetched and
//! decoded. Any failure there degrades to the text-only layout.

pub mod pdf;
pub mod xlsx;

use time::{Date, OffsetDateTime};
use tracing::warn;

pub use pdf::{product_detail_pdf, product_list_pdf};
pub use xlsx::product_sheet_xlsx;

pub const NO_PRODUCTS_PDF: &str = "No hay productos para generar el reporte.";
pub const NO_PRODUCTS_XLSX: &str = "No hay productos para generar el reporte Excel.";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Nothing to export; the message is shown as is.
    #[error("{0}")]
    Empty(&'static str),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("spreadsheet generation failed: {0}")]
    Xlsx(String),
}

/// `{prefix}_{DD-MM-YYYY}.{extension}`
#[must_use]
pub fn report_file_name(prefix: &str, extension: &str, date: Date) -> String {
    format!("{prefix}_{:02}-{:02}-{}.{extension}", date.day(), u8::from(date.month()), date.year())
}

/// Name of a product's detail PDF. Path separators are replaced so the name
/// stays a single file.
#[must_use]
pub fn detail_file_name(product_name: &str) -> String {
    let safe: String = product_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("{safe}.pdf")
}

/// Today's date on the local clock, or UTC when the offset is unknown.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Download and decode a product image. `None` on any failure.
pub async fn fetch_image(http: &reqwest::Client, url: &str) -> Option<image::DynamicImage> {
    let response = match http.get(url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!(url, status = response.status().as_u16(), "reports: image fetch refused");
            return None;
        }
        Err(e) => {
            warn!(url, error = %e, "reports: image fetch failed");
            return None;
        }
    };
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url, error = %e, "reports: image download interrupted");
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(url, error = %e, "reports: image could not be decoded");
            None
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
