use std::time::Duration;

use futures::StreamExt;
use serde_json::json;

use super::*;
use crate::models::Sender;
use crate::testing::{MemoryStore, MockLlm};

const TORNILLOS: &str = r#"{"nombreCategoria":"Tornillos","descripcionCategoria":"Sujetadores metálicos"}"#;

fn assistant(llm: Arc<MockLlm>, store: &Arc<MemoryStore>) -> CategoryAssistant {
    CategoryAssistant::new(llm, store.clone())
}

fn log_texts(store: &MemoryStore) -> Vec<(Sender, String)> {
    store
        .records::<ChatMessage>()
        .into_iter()
        .map(|m| (m.sender, m.text))
        .collect()
}

// =============================================================================
// interpret
// =============================================================================

#[test]
fn interpret_complete_category() {
    let Extraction::Category { category, .. } = interpret(TORNILLOS) else {
        panic!("expected category");
    };
    assert_eq!(category, Category::new("Tornillos", "Sujetadores metálicos"));
}

#[test]
fn interpret_error_field() {
    assert_eq!(
        interpret(r#"{"error":"El mensaje no contiene la información solicitada."}"#),
        Extraction::Refused { message: "El mensaje no contiene la información solicitada.".into() }
    );
}

#[test]
fn interpret_empty_error_is_ignored() {
    assert!(matches!(interpret(r#"{"error":"","nombreCategoria":"X"}"#), Extraction::Incomplete { .. }));
}

#[test]
fn interpret_non_string_error_is_rendered() {
    assert_eq!(
        interpret(r#"{"error":{"code":3}}"#),
        Extraction::Refused { message: r#"{"code":3}"#.into() }
    );
}

#[test]
fn interpret_missing_or_empty_fields() {
    assert!(matches!(interpret(r#"{"nombreCategoria":"Tornillos"}"#), Extraction::Incomplete { .. }));
    assert!(matches!(
        interpret(r#"{"nombreCategoria":"","descripcionCategoria":"x"}"#),
        Extraction::Incomplete { .. }
    ));
    assert!(matches!(interpret("[1,2]"), Extraction::Incomplete { .. }));
}

#[test]
fn interpret_invalid_json() {
    assert_eq!(interpret("no es json"), Extraction::Invalid { raw: "no es json".into() });
}

#[test]
fn prompt_embeds_user_text_verbatim() {
    let prompt = extraction_prompt("Tornillos: sujetadores");
    assert!(prompt.starts_with(
        "Extrae el nombre y la descripción de categoría en este mensaje: \"Tornillos: sujetadores\". "
    ));
    assert!(prompt.contains(r#"{"nombreCategoria": "...", "descripcionCategoria": "..."}"#));
    assert!(prompt.ends_with(r#"{"error": "El mensaje no contiene la información solicitada."}."#));
}

#[test]
fn llm_failures_map_to_fixed_messages() {
    assert_eq!(llm_failure_message(&LlmError::RateLimited), RATE_LIMITED);
    assert_eq!(llm_failure_message(&LlmError::EmptyResponse), NO_REPLY);
    assert_eq!(
        llm_failure_message(&LlmError::ApiResponse { status: 500, body: String::new() }),
        CONNECTION_FAILED
    );
    assert_eq!(llm_failure_message(&LlmError::ApiRequest("timeout".into())), CONNECTION_FAILED);
}

// =============================================================================
// submit
// =============================================================================

#[tokio::test]
async fn tornillos_registers_category_and_logs_every_step() {
    let store = MemoryStore::new();
    let llm = MockLlm::replying(TORNILLOS);
    let chat = assistant(llm.clone(), &store);

    let outcome = chat.submit("Agrega la categoría Tornillos").await;

    let SubmitOutcome::Registered { id, category } = outcome else {
        panic!("expected registration, got {outcome:?}");
    };
    let stored = store.records::<Category>();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0], Category { id: id.clone(), ..category });
    assert_eq!(stored[0].description, "Sujetadores metálicos");

    assert_eq!(
        log_texts(&store),
        vec![
            (Sender::User, "Agrega la categoría Tornillos".to_string()),
            (Sender::Assistant, format!("ok, vamos a registrar {TORNILLOS} en la base de datos.")),
            (Sender::Assistant, "Categoría \"Tornillos\" registrada con éxito.".to_string()),
        ]
    );
    assert_eq!(llm.prompts(), vec![extraction_prompt("Agrega la categoría Tornillos")]);
}

#[tokio::test]
async fn error_reply_is_appended_without_category() {
    let store = MemoryStore::new();
    let chat = assistant(MockLlm::replying(r#"{"error":"El mensaje no contiene la información solicitada."}"#), &store);

    assert_eq!(chat.submit("hola").await, SubmitOutcome::Replied);
    assert!(store.records::<Category>().is_empty());
    assert_eq!(
        log_texts(&store).last(),
        Some(&(Sender::Assistant, "El mensaje no contiene la información solicitada.".to_string()))
    );
}

#[tokio::test]
async fn rate_limit_appends_exactly_one_message() {
    let store = MemoryStore::new();
    let chat = assistant(MockLlm::new(vec![Err(LlmError::RateLimited)]), &store);

    assert_eq!(chat.submit("Tornillos").await, SubmitOutcome::Replied);

    let replies: Vec<String> = log_texts(&store)
        .into_iter()
        .filter(|(sender, _)| *sender == Sender::Assistant)
        .map(|(_, text)| text)
        .collect();
    assert_eq!(replies, vec![RATE_LIMITED.to_string()]);
    assert!(store.records::<Category>().is_empty());
}

#[tokio::test]
async fn invalid_json_is_echoed() {
    let store = MemoryStore::new();
    let chat = assistant(MockLlm::replying("Claro, aquí tienes"), &store);

    chat.submit("Tornillos").await;
    assert_eq!(
        log_texts(&store).last().map(|(_, t)| t.as_str()),
        Some("La IA devolvió una respuesta inválida: Claro, aquí tienes")
    );
}

#[tokio::test]
async fn incomplete_json_is_acknowledged_then_refused() {
    let store = MemoryStore::new();
    let chat = assistant(MockLlm::replying(r#"{"nombreCategoria":"Tornillos"}"#), &store);

    assert_eq!(chat.submit("Tornillos").await, SubmitOutcome::Replied);
    let texts: Vec<String> = log_texts(&store).into_iter().map(|(_, t)| t).collect();
    assert_eq!(
        texts[1..],
        [
            r#"ok, vamos a registrar {"nombreCategoria":"Tornillos"} en la base de datos."#.to_string(),
            MISSING_CATEGORY_FIELDS.to_string(),
        ]
    );
    assert!(store.records::<Category>().is_empty());
}

#[tokio::test]
async fn blank_input_does_nothing() {
    let store = MemoryStore::new();
    let llm = MockLlm::replying(TORNILLOS);
    let chat = assistant(llm.clone(), &store);

    assert_eq!(chat.submit("   ").await, SubmitOutcome::Ignored);
    assert_eq!(store.calls(), 0);
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn category_write_failure_appends_processing_error() {
    let store = MemoryStore::new();
    store.fail_writes_to("categorias");
    let chat = assistant(MockLlm::replying(TORNILLOS), &store);

    assert_eq!(chat.submit("Tornillos").await, SubmitOutcome::Failed);
    assert_eq!(
        log_texts(&store).last().map(|(_, t)| t.as_str()),
        Some(PROCESSING_FAILED)
    );
}

#[tokio::test]
async fn subscription_replays_log_in_timestamp_order() {
    let store = MemoryStore::new();
    let chat = assistant(MockLlm::replying(TORNILLOS), &store);
    let mut snapshots = chat.subscribe();
    let mut log = MessageLog::default();

    log.apply(snapshots.next().await.unwrap());
    assert!(log.messages().is_empty());

    chat.submit("Tornillos").await;
    while log.messages().len() < 3 {
        let next = tokio::time::timeout(Duration::from_secs(2), snapshots.next())
            .await
            .unwrap()
            .unwrap();
        log.apply(next);
    }
    assert_eq!(log.lines()[0], "Tú: Tornillos");
    assert_eq!(log.lines()[2], "IA: Categoría \"Tornillos\" registrada con éxito.");
}

#[tokio::test]
async fn subscription_reads_legacy_sender_spellings() {
    let store = MemoryStore::new();
    store.seed_fields(
        "chat",
        json!({ "texto": "hola", "emisor": "usurio", "timestamp": "2024-05-01T10:00:00Z" }),
    );
    store.seed_fields("chat", json!({ "texto": "sin fecha", "emisor": "ia" }));
    let chat = assistant(MockLlm::replying(TORNILLOS), &store);
    chat.submit("Tornillos").await;

    let mut log = MessageLog::default();
    log.apply(chat.subscribe().next().await.unwrap());

    assert!(log.error().is_none());
    assert_eq!(log.messages().len(), 5);
    let lines = log.lines();
    assert!(lines.contains(&"Tú: hola".to_string()));
    assert!(lines.contains(&"IA: sin fecha".to_string()));
    assert!(lines.contains(&"Tú: Tornillos".to_string()));
}

#[test]
fn unknown_sender_and_bad_timestamp_decode_leniently() {
    let message: ChatMessage =
        serde_json::from_value(json!({ "texto": "x", "emisor": "usurio", "timestamp": 12 })).unwrap();
    assert_eq!(message.sender, Sender::User);
    assert_eq!(message.timestamp, time::OffsetDateTime::UNIX_EPOCH);
    assert_eq!(message.speaker_label(), "Tú: ");
}

// =============================================================================
// MessageLog
// =============================================================================

#[test]
fn message_log_error_keeps_messages_until_next_snapshot() {
    let mut log = MessageLog::default();
    log.apply(Ok(vec![ChatMessage::from_user("hola")]));
    log.apply(Err(StoreError::Request("offline".into())));
    assert_eq!(log.error(), Some(LOG_UNAVAILABLE));
    assert_eq!(log.messages().len(), 1);

    log.apply(Ok(vec![]));
    assert!(log.error().is_none());
    assert!(log.messages().is_empty());
}

#[test]
fn acknowledgement_keeps_reply_key_order() {
    let json = json!({ "nombreCategoria": "A", "descripcionCategoria": "B" });
    assert_eq!(
        acknowledgement(&json),
        r#"ok, vamos a registrar {"nombreCategoria":"A","descripcionCategoria":"B"} en la base de datos."#
    );
}
