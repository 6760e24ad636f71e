use super::*;

fn product(name: &str, price: f64, category: &str) -> Product {
    Product { name: name.into(), price, category: category.into(), ..Product::default() }
}

#[test]
fn table_pads_columns_to_widest_cell() {
    let out = table(&["ID", "Nombre"], &[vec!["1".into(), "Martillo".into()], vec!["22".into(), "Sierra".into()]]);
    assert_eq!(out, "ID  Nombre\n--  --------\n1   Martillo\n22  Sierra\n");
}

#[test]
fn table_counts_accented_characters_once() {
    let out = table(&["Categoría"], &[vec!["Eléctricos".into()]]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[1].chars().count(), "Eléctricos".chars().count());
}

#[test]
fn products_show_price_label() {
    let taladro = product("Taladro", 1500.0, "Eléctricos");
    assert!(products(&[&taladro]).contains("C$ 1500.00"));
}

#[test]
fn pager_reports_position_or_no_results() {
    assert_eq!(pager(2, 3, 12), "Página 2 de 3 · 12 resultado(s)");
    assert_eq!(pager(1, 0, 0), "Sin resultados.");
}

#[test]
fn unprinted_returns_the_tail_or_everything_after_a_reset() {
    let lines: Vec<String> = ["Tú: Tornillos", "IA: ok", "IA: registrada"].map(String::from).into();
    assert_eq!(unprinted(&lines, 1), &lines[1..]);
    assert!(unprinted(&lines, 3).is_empty());
    assert_eq!(unprinted(&lines[..1], 3), &lines[..1]);
}

#[test]
fn catalog_sections_by_category() {
    let martillo = product("Martillo", 10.0, "Herramientas");
    let cable = product("Cable", 2.5, "Eléctricos");
    let mut groups = BTreeMap::new();
    groups.insert("Herramientas", vec![&martillo]);
    groups.insert("Eléctricos", vec![&cable]);

    assert_eq!(
        catalog(&groups),
        "== Eléctricos ==\n  Cable  C$ 2.50\n== Herramientas ==\n  Martillo  C$ 10.00\n"
    );
}

#[test]
fn empty_catalog_message() {
    assert_eq!(catalog(&BTreeMap::new()), "No hay productos en el catálogo.\n");
}
