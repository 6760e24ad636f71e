use super::*;
use crate::models::{Category, Product, ProductForm};
use crate::mutation::{MutationPhase, Route};
use crate::testing::{MemoryStore, signed_in};

fn categories(store: &Arc<MemoryStore>, session: SessionContext) -> CatalogController<Category> {
    CatalogController::new(store.clone(), session, 5)
}

fn products(store: &Arc<MemoryStore>) -> CatalogController<Product> {
    CatalogController::new(store.clone(), signed_in(), 5)
}

fn form(name: &str, price: &str) -> ProductForm {
    ProductForm { name: name.into(), price: price.into(), category: "Herramientas".into(), ..ProductForm::default() }
}

// =============================================================================
// load / view
// =============================================================================

#[tokio::test]
async fn load_replaces_records_and_assigns_ids() {
    let store = MemoryStore::new();
    let id = store.seed(&Category::new("Tornillos", "Sujetadores"));
    let mut controller = categories(&store, SessionContext::anonymous());

    controller.load().await.unwrap();
    assert_eq!(controller.records().len(), 1);
    assert_eq!(controller.records()[0].id, id);
    assert_eq!(controller.find(&id).map(|c| c.name.as_str()), Some("Tornillos"));
    assert!(controller.notice().is_none());
}

#[tokio::test]
async fn load_failure_keeps_records_and_sets_notice() {
    let store = MemoryStore::new();
    store.seed(&Category::new("Tornillos", "Sujetadores"));
    let mut controller = categories(&store, SessionContext::anonymous());
    controller.load().await.unwrap();

    store.fail_lists(true);
    assert!(controller.load().await.is_err());
    assert_eq!(controller.records().len(), 1);
    assert_eq!(controller.notice(), Some("Error al obtener las categorías. Por favor, intenta de nuevo."));
}

#[tokio::test]
async fn search_resets_page_and_filters_visible_rows() {
    let store = MemoryStore::new();
    for i in 0..7 {
        store.seed(&Category::new(format!("Tornillos {i}"), "Sujetadores"));
    }
    store.seed(&Category::new("Pinturas", "Acrílicas"));
    let mut controller = categories(&store, SessionContext::anonymous());
    controller.load().await.unwrap();

    assert_eq!(controller.page_count(), 2);
    controller.set_page(2);
    assert_eq!(controller.visible().len(), 3);

    controller.set_search_term("acríl");
    assert_eq!(controller.view().page(), 1);
    assert_eq!(controller.filtered().len(), 1);
    assert_eq!(controller.visible()[0].name, "Pinturas");
}

#[tokio::test]
async fn product_search_ignores_category() {
    let store = MemoryStore::new();
    store.seed(&Product { name: "Martillo".into(), price: 10.0, category: "Herramientas".into(), ..Product::default() });
    let mut controller = products(&store);
    controller.load().await.unwrap();

    controller.set_search_term("herramientas");
    assert!(controller.filtered().is_empty());
    assert_eq!(controller.page_count(), 0);

    controller.set_search_term("martillo");
    assert_eq!(controller.visible()[0].name, "Martillo");
}

// =============================================================================
// guards
// =============================================================================

#[tokio::test]
async fn create_without_session_makes_no_remote_call() {
    let store = MemoryStore::new();
    let mut controller = categories(&store, SessionContext::anonymous());

    let err = controller
        .create(Category::new("Tornillos", "Sujetadores"))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Debes iniciar sesión para agregar una categoría.");
    assert_eq!(err.redirect(), Some(Route::Login));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn invalid_product_form_makes_no_remote_call() {
    let store = MemoryStore::new();
    let mut controller = products(&store);
    let mut changes = controller.orchestrator().phase_changes();

    let err = controller.create(form("Martillo", "abc")).await.unwrap_err();
    assert!(matches!(err, MutationError::Validation(ref m) if m == "El precio debe ser un número válido mayor a 0."));

    let err = controller.create(form("", "10")).await.unwrap_err();
    assert_eq!(err.message(), "Por favor, completa todos los campos requeridos.");

    assert_eq!(store.calls(), 0);
    assert_eq!(controller.orchestrator().phase(MutationKind::Create), MutationPhase::Idle);
    let phases: Vec<MutationPhase> = std::iter::from_fn(|| changes.try_recv().ok()).map(|c| c.phase).collect();
    assert!(phases.contains(&MutationPhase::Rejected));
    assert!(!phases.contains(&MutationPhase::InFlight));
}

#[tokio::test]
async fn category_edit_with_blank_field_uses_create_wording() {
    let store = MemoryStore::new();
    let id = store.seed(&Category::new("Tornillos", "Sujetadores"));
    let mut controller = categories(&store, signed_in());

    let mut edited = Category::new("Tornillos", " ");
    edited.id = id;
    let err = controller.update(edited).await.unwrap_err();

    assert_eq!(err.message(), "Por favor, completa todos los campos.");
    assert_eq!(store.write_calls(), 0);
}

#[tokio::test]
async fn update_and_delete_require_a_selection() {
    let store = MemoryStore::new();
    let mut controller = categories(&store, signed_in());

    let err = controller
        .update(Category::new("Tornillos", "Sujetadores"))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "No hay una categoría seleccionada para editar.");

    let err = controller.delete("").await.unwrap_err();
    assert_eq!(err.message(), "No hay una categoría seleccionada para eliminar.");
    assert_eq!(store.calls(), 0);
}

// =============================================================================
// mutations
// =============================================================================

#[tokio::test]
async fn create_writes_once_then_reloads() {
    let store = MemoryStore::new();
    let mut controller = products(&store);

    let id = controller.create(form("Martillo", "12.50")).await.unwrap();

    assert_eq!(store.write_calls(), 1);
    assert_eq!(store.list_calls(), 1);
    assert_eq!(controller.records().len(), 1);
    assert_eq!(controller.records()[0].id, id);
    assert!((controller.records()[0].price - 12.5).abs() < f64::EPSILON);
    assert_eq!(controller.orchestrator().phase(MutationKind::Create), MutationPhase::Idle);
    assert!(!controller.orchestrator().is_animating());
}

#[tokio::test]
async fn update_merges_fields_by_id() {
    let store = MemoryStore::new();
    let id = store.seed(&Category::new("Tornillos", "Viejo"));
    let mut controller = categories(&store, signed_in());
    controller.load().await.unwrap();

    let mut edited = controller.find(&id).cloned().unwrap();
    edited.description = "Sujetadores metálicos".into();
    controller.update(edited).await.unwrap();

    assert_eq!(controller.records()[0].description, "Sujetadores metálicos");
    assert_eq!(store.records::<Category>()[0].description, "Sujetadores metálicos");
}

#[tokio::test]
async fn update_of_missing_document_is_remote_failure() {
    let store = MemoryStore::new();
    let mut controller = categories(&store, signed_in());
    let mut ghost = Category::new("Fantasma", "No existe");
    ghost.id = "nope".into();

    let err = controller.update(ghost).await.unwrap_err();
    assert_eq!(err.message(), "Error al actualizar la categoría. Por favor, intenta de nuevo.");
    assert!(matches!(err, MutationError::Remote { source: RemoteError::Store(StoreError::NotFound { .. }), .. }));
    assert_eq!(store.list_calls(), 0);
}

#[tokio::test]
async fn delete_removes_and_reloads() {
    let store = MemoryStore::new();
    let id = store.seed(&Category::new("Tornillos", "Sujetadores"));
    store.seed(&Category::new("Pinturas", "Acrílicas"));
    let mut controller = categories(&store, signed_in());
    controller.load().await.unwrap();

    controller.delete(&id).await.unwrap();
    assert_eq!(controller.records().len(), 1);
    assert_eq!(controller.records()[0].name, "Pinturas");
}

#[tokio::test]
async fn failed_write_skips_reload() {
    let store = MemoryStore::new();
    store.fail_writes(true);
    let mut controller = products(&store);

    let err = controller.create(form("Martillo", "10")).await.unwrap_err();
    assert_eq!(err.message(), "Error al agregar el producto. Por favor, intenta de nuevo.");
    assert_eq!(store.list_calls(), 0);
    assert!(!controller.orchestrator().is_animating());
}

#[tokio::test]
async fn failed_reload_after_write_still_succeeds_with_notice() {
    let store = MemoryStore::new();
    store.fail_lists(true);
    let mut controller = products(&store);

    controller.create(form("Martillo", "10")).await.unwrap();
    assert_eq!(store.records::<Product>().len(), 1);
    assert_eq!(controller.notice(), Some("Error al obtener los productos. Por favor, intenta de nuevo."));
    assert_eq!(controller.orchestrator().phase(MutationKind::Create), MutationPhase::Idle);
}
