//! Catalog — list controllers for categories, products and books.
//!
//! ARCHITECTURE
//! ============
//! One generic [`CatalogController`] drives every list screen: load the
//! collection, filter and page it locally, and run auth-gated mutations
//! through a [`MutationOrchestrator`](crate::mutation::MutationOrchestrator).
//! Books add binary storage on top, so [`BookController`] wraps the generic
//! controller and inserts the upload/delete steps around the record write.
//!
//! Each record type states its noun (for messages), its search fields and
//! its field validation here; forms that are not yet a record (the product
//! form with a textual price) convert through [`Draft`].

pub mod books;
pub mod controller;

use std::collections::BTreeMap;

pub use books::BookController;
pub use controller::CatalogController;

use crate::backend::Record;
use crate::listing::Searchable;
use crate::models::{Book, Category, Product, ProductForm};
use crate::mutation::Noun;

pub const FILL_ALL_FIELDS: &str = "Por favor, completa todos los campos.";
pub const FILL_REQUIRED_FIELDS: &str = "Por favor, completa todos los campos requeridos.";
pub const INVALID_PRICE: &str = "El precio debe ser un número válido mayor a 0.";
pub const FILL_FIELDS_AND_PDF: &str = "Por favor, completa todos los campos y selecciona un PDF.";
pub const SELECT_PDF: &str = "Por favor, selecciona un archivo PDF.";

/// A record type managed by a catalog list screen.
pub trait CatalogRecord: Record + Searchable {
    const NOUN: Noun;

    /// Check required fields. The error is the message shown to the user.
    ///
    /// # Errors
    ///
    /// Returns the validation message when a field is missing or invalid.
    fn validate(&self) -> Result<(), String>;
}

/// Form input that becomes a record once validated.
pub trait Draft<T> {
    /// Id of the record being edited; empty for new records.
    fn target_id(&self) -> &str;

    /// # Errors
    ///
    /// Returns the validation message shown to the user.
    fn into_record(self) -> Result<T, String>;
}

impl<T: CatalogRecord> Draft<T> for T {
    fn target_id(&self) -> &str {
        Record::id(self)
    }

    fn into_record(self) -> Result<T, String> {
        self.validate()?;
        Ok(self)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

// =============================================================================
// CATEGORY
// =============================================================================

impl Searchable for Category {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }
}

impl CatalogRecord for Category {
    const NOUN: Noun = Noun { singular: "categoría", plural: "categorías", feminine: true };

    fn validate(&self) -> Result<(), String> {
        if blank(&self.name) || blank(&self.description) {
            return Err(FILL_ALL_FIELDS.into());
        }
        Ok(())
    }
}

// =============================================================================
// PRODUCT
// =============================================================================

impl Searchable for Product {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl CatalogRecord for Product {
    const NOUN: Noun = Noun { singular: "producto", plural: "productos", feminine: false };

    fn validate(&self) -> Result<(), String> {
        if blank(&self.name) || blank(&self.category) {
            return Err(FILL_REQUIRED_FIELDS.into());
        }
        if !valid_price(self.price) {
            return Err(INVALID_PRICE.into());
        }
        Ok(())
    }
}

impl Draft<Product> for ProductForm {
    fn target_id(&self) -> &str {
        &self.id
    }

    fn into_record(self) -> Result<Product, String> {
        if blank(&self.name) || blank(&self.price) || blank(&self.category) {
            return Err(FILL_REQUIRED_FIELDS.into());
        }
        let price = parse_price(&self.price).ok_or_else(|| INVALID_PRICE.to_string())?;
        Ok(Product {
            id: self.id,
            name: self.name,
            price,
            category: self.category,
            image: self.image.filter(|url| !blank(url)),
        })
    }
}

/// Parse a typed price. Only finite values above zero are accepted.
#[must_use]
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| valid_price(*p))
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

// =============================================================================
// BOOK
// =============================================================================

impl Searchable for Book {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.author.as_str(), self.genre.as_str()]
    }
}

impl CatalogRecord for Book {
    const NOUN: Noun = Noun { singular: "libro", plural: "libros", feminine: false };

    fn validate(&self) -> Result<(), String> {
        if blank(&self.name) || blank(&self.author) || blank(&self.genre) {
            return Err(FILL_REQUIRED_FIELDS.into());
        }
        Ok(())
    }
}

// =============================================================================
// PUBLIC CATALOG
// =============================================================================

/// Products grouped by category name, optionally restricted to one category.
/// Groups are ordered by name; products keep their backend order.
#[must_use]
pub fn group_by_category<'a>(products: &'a [Product], only: Option<&str>) -> BTreeMap<&'a str, Vec<&'a Product>> {
    let mut groups: BTreeMap<&str, Vec<&Product>> = BTreeMap::new();
    for product in products {
        if only.is_some_and(|wanted| wanted != product.category) {
            continue;
        }
        groups.entry(product.category.as_str()).or_default().push(product);
    }
    groups
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
