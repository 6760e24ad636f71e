//! Plain-text rendering of catalog records for the terminal.

use std::collections::BTreeMap;
use std::fmt::Write;

use ferreteria::models::{Book, Category, Product};

const GAP: &str = "  ";

/// Left-aligned table with a header row and a dashed rule.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, headers.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut line = String::new();
    for (i, (cell, &width)) in cells.zip(widths).enumerate() {
        if i > 0 {
            line.push_str(GAP);
        }
        let _ = write!(line, "{cell:<width$}");
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn categories(records: &[&Category]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|c| vec![c.id.clone(), c.name.clone(), c.description.clone()])
        .collect();
    table(&["ID", "Nombre", "Descripción"], &rows)
}

pub fn products(records: &[&Product]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|p| vec![p.id.clone(), p.name.clone(), p.price_label(), p.category.clone()])
        .collect();
    table(&["ID", "Nombre", "Precio", "Categoría"], &rows)
}

pub fn books(records: &[&Book]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|b| vec![b.id.clone(), b.name.clone(), b.author.clone(), b.genre.clone(), b.pdf_url.clone()])
        .collect();
    table(&["ID", "Nombre", "Autor", "Género", "PDF"], &rows)
}

/// Pager line under a list.
pub fn pager(page: usize, pages: usize, matches: usize) -> String {
    if pages == 0 {
        return "Sin resultados.".to_string();
    }
    format!("Página {page} de {pages} · {matches} resultado(s)")
}

/// Chat lines not yet written, given how many were. A shorter log than
/// what was printed means it was replaced, so everything is new again.
pub fn unprinted(lines: &[String], printed: usize) -> &[String] {
    lines.get(printed..).unwrap_or(lines)
}

/// Public catalog: one section per category.
pub fn catalog(groups: &BTreeMap<&str, Vec<&Product>>) -> String {
    if groups.is_empty() {
        return "No hay productos en el catálogo.\n".to_string();
    }
    let mut out = String::new();
    for (category, products) in groups {
        let _ = writeln!(out, "== {category} ==");
        for product in products {
            let _ = writeln!(out, "{GAP}{}{GAP}{}", product.name, product.price_label());
        }
    }
    out
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
