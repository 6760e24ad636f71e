//! Catalog records as stored in the hosted collections.
//!
//! Field names on the wire are the Spanish names the collections already
//! hold (`nombreCategoria`, `precio`, `pdfUrl`, ...). The backend-assigned
//! `id` travels next to the fields, never inside them, so it is skipped by
//! serde and filled in by the gateway after a read.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// =============================================================================
// CATEGORY
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "nombreCategoria", default)]
    pub name: String,
    #[serde(rename = "descripcionCategoria", default)]
    pub description: String,
}

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: String::new(), name: name.into(), description: description.into() }
    }
}

// =============================================================================
// PRODUCT
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "nombreProducto", default)]
    pub name: String,
    #[serde(rename = "precio", default)]
    pub price: f64,
    #[serde(rename = "categoria", default)]
    pub category: String,
    /// Image URL. Older documents store an empty string instead of omitting it.
    #[serde(rename = "imagen", default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    /// Price formatted the way every screen and report shows it.
    #[must_use]
    pub fn price_label(&self) -> String {
        format!("C$ {:.2}", self.price)
    }

    /// Row summary produced by the table's copy action.
    #[must_use]
    pub fn clipboard_text(&self) -> String {
        format!("Nombre: {}\nPrecio: C${:.2}\nCategoría: {}", self.name, self.price, self.category)
    }
}

/// Raw product form input. The price is still text, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub image: Option<String>,
}

// =============================================================================
// BOOK
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "autor", default)]
    pub author: String,
    #[serde(rename = "genero", default)]
    pub genre: String,
    #[serde(rename = "pdfUrl", default)]
    pub pdf_url: String,
}

/// A PDF picked for upload alongside a book record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub const CONTENT_TYPE: &'static str = "application/pdf";

    /// `true` when the payload carries the PDF magic header.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF-")
    }

    /// Object path the file is stored under.
    #[must_use]
    pub fn storage_path(&self) -> String {
        format!("libros/{}", self.file_name)
    }
}

// =============================================================================
// CHAT MESSAGE
// =============================================================================

/// Author of a chat entry. Only `"ia"` marks the assistant; any other or
/// missing `emisor` (older clients wrote `"usurio"`) reads as the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Sender {
    #[default]
    #[serde(rename = "usuario")]
    User,
    #[serde(rename = "ia")]
    Assistant,
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(if raw.as_str() == Some("ia") { Self::Assistant } else { Self::User })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "texto", default)]
    pub text: String,
    #[serde(rename = "emisor", default)]
    pub sender: Sender,
    /// Client clock at send time; the log is ordered by this field. Missing or
    /// unreadable values read as the Unix epoch.
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "lenient_timestamp",
        default = "epoch"
    )]
    pub timestamp: OffsetDateTime,
}

impl ChatMessage {
    #[must_use]
    pub fn from_user(text: impl Into<String>) -> Self {
        Self::now(text, Sender::User)
    }

    #[must_use]
    pub fn from_assistant(text: impl Into<String>) -> Self {
        Self::now(text, Sender::Assistant)
    }

    fn now(text: impl Into<String>, sender: Sender) -> Self {
        Self { id: String::new(), text: text.into(), sender, timestamp: OffsetDateTime::now_utc() }
    }

    /// Speaker prefix shown in front of the text.
    #[must_use]
    pub fn speaker_label(&self) -> &'static str {
        match self.sender {
            Sender::User => "Tú: ",
            Sender::Assistant => "IA: ",
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
        .unwrap_or_else(epoch))
}

fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
