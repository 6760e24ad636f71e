//! Category-extraction chat — natural language in, category record out.
//!
//! DESIGN
//! ======
//! Every outcome of a submit lands in the `chat` collection as a message;
//! nothing is raised to the caller. The model is asked for JSON only, and its
//! reply is classified by [`interpret`]:
//!
//! - not JSON → "respuesta inválida" echo of the raw text
//! - an `error` field → that text verbatim
//! - both category fields present → category written, success message
//! - anything else → "no contiene la información esperada"
//!
//! Failures of the model call itself are folded into the same `error` path
//! with fixed messages (rate limit, empty reply, connection).
//!
//! TRADE-OFFS
//! ==========
//! No session is required: the assistant writes categories directly. There is
//! no retry and no cancellation; a submit always runs to completion.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::backend::{Collection, DocumentStore, Snapshot, StoreError};
use crate::llm::{GenerativeText, LlmError};
use crate::models::{Category, ChatMessage};

pub const RATE_LIMITED: &str = "Has alcanzado el límite de solicitudes. Intenta de nuevo más tarde.";
pub const NO_REPLY: &str = "No hubo respuesta de la IA.";
pub const CONNECTION_FAILED: &str = "No se pudo conectar con la IA. Verifica tu conexión o API Key.";
pub const MISSING_CATEGORY_FIELDS: &str =
    "No se pudo registrar la categoría. El JSON no contiene la información esperada.";
pub const PROCESSING_FAILED: &str = "Hubo un error al procesar tu solicitud. Por favor, intenta de nuevo más tarde.";
pub const LOG_UNAVAILABLE: &str = "No se pudieron cargar los mensajes del chat.";

/// Field the log is ordered by.
pub const ORDER_FIELD: &str = "timestamp";

/// The fixed extraction instruction wrapped around the user's text.
#[must_use]
pub fn extraction_prompt(text: &str) -> String {
    format!(
        "Extrae el nombre y la descripción de categoría en este mensaje: \"{text}\". \
         Si el usuario no provee una descripción, genera una descripción corta basándote en el nombre. \
         Asegúrate que el nombreCategoria y descripcionCategoria comiencen con mayúsculas. \
         Devuélvelo en JSON como {{\"nombreCategoria\": \"...\", \"descripcionCategoria\": \"...\"}}. \
         Si el mensaje no contiene información suficiente, devuelve un mensaje de error en formato JSON \
         como {{\"error\": \"El mensaje no contiene la información solicitada.\"}}."
    )
}

/// Chat message for a failed model call.
#[must_use]
pub fn llm_failure_message(error: &LlmError) -> &'static str {
    match error {
        LlmError::RateLimited => RATE_LIMITED,
        LlmError::EmptyResponse => NO_REPLY,
        _ => CONNECTION_FAILED,
    }
}

// =============================================================================
// INTERPRETATION
// =============================================================================

/// What the model's reply means for the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Not JSON at all.
    Invalid { raw: String },
    /// The model (or the call) reported an error message.
    Refused { message: String },
    /// Valid JSON without both category fields.
    Incomplete { json: Value },
    /// A category ready to be written.
    Category { category: Category, json: Value },
}

/// Classify a raw model reply.
#[must_use]
pub fn interpret(raw: &str) -> Extraction {
    let Ok(json) = serde_json::from_str::<Value>(raw) else {
        return Extraction::Invalid { raw: raw.to_string() };
    };
    if let Some(message) = error_text(&json) {
        return Extraction::Refused { message };
    }
    let name = non_empty_str(&json, "nombreCategoria");
    let description = non_empty_str(&json, "descripcionCategoria");
    match (name, description) {
        (Some(name), Some(description)) => {
            Extraction::Category { category: Category::new(name, description), json }
        }
        _ => Extraction::Incomplete { json },
    }
}

/// A present and non-empty `error` field, rendered as text.
fn error_text(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn non_empty_str<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

// =============================================================================
// ASSISTANT
// =============================================================================

/// How a submit ended. The chat log already holds the user-facing text.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// A category was written with this id.
    Registered { id: String, category: Category },
    /// The assistant replied without writing a category.
    Replied,
    /// A collection write failed part way.
    Failed,
}

pub struct CategoryAssistant {
    llm: Arc<dyn GenerativeText>,
    messages: Collection<ChatMessage>,
    categories: Collection<Category>,
}

impl CategoryAssistant {
    #[must_use]
    pub fn new(llm: Arc<dyn GenerativeText>, store: Arc<dyn DocumentStore>) -> Self {
        Self { llm, messages: Collection::new(Arc::clone(&store)), categories: Collection::new(store) }
    }

    /// Live chat log, ordered by timestamp ascending.
    #[must_use]
    pub fn subscribe(&self) -> Snapshot<ChatMessage> {
        self.messages.subscribe(ORDER_FIELD)
    }

    /// Run the extraction flow for one user message.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        match self.run(text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "chat: failed to process message");
                if let Err(e) = self.say(PROCESSING_FAILED).await {
                    warn!(error = %e, "chat: could not record failure message");
                }
                SubmitOutcome::Failed
            }
        }
    }

    async fn run(&self, text: &str) -> Result<SubmitOutcome, StoreError> {
        self.messages.create(&ChatMessage::from_user(text)).await?;

        let extraction = match self.llm.generate_json(&extraction_prompt(text)).await {
            Ok(raw) => interpret(&raw),
            Err(e) => {
                warn!(error = %e, "chat: generative call failed");
                Extraction::Refused { message: llm_failure_message(&e).to_string() }
            }
        };

        match extraction {
            Extraction::Invalid { raw } => {
                warn!(raw = %raw, "chat: reply is not JSON");
                self.say(&format!("La IA devolvió una respuesta inválida: {raw}")).await?;
                Ok(SubmitOutcome::Replied)
            }
            Extraction::Refused { message } => {
                self.say(&message).await?;
                Ok(SubmitOutcome::Replied)
            }
            Extraction::Incomplete { json } => {
                self.say(&acknowledgement(&json)).await?;
                self.say(MISSING_CATEGORY_FIELDS).await?;
                Ok(SubmitOutcome::Replied)
            }
            Extraction::Category { category, json } => {
                self.say(&acknowledgement(&json)).await?;
                let id = self.categories.create(&category).await?;
                info!(id = %id, name = %category.name, "chat: category registered");
                self.say(&format!("Categoría \"{}\" registrada con éxito.", category.name))
                    .await?;
                Ok(SubmitOutcome::Registered { id, category })
            }
        }
    }

    async fn say(&self, text: &str) -> Result<(), StoreError> {
        self.messages
            .create(&ChatMessage::from_assistant(text))
            .await
            .map(|_| ())
    }
}

fn acknowledgement(json: &Value) -> String {
    format!("ok, vamos a registrar {json} en la base de datos.")
}

// =============================================================================
// MESSAGE LOG
// =============================================================================

/// Local mirror of the chat collection, fed by subscription snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    error: Option<String>,
}

impl MessageLog {
    /// Apply one subscription item: a snapshot replaces the whole list and
    /// clears the error; an error keeps the list and sets the notice.
    pub fn apply(&mut self, snapshot: Result<Vec<ChatMessage>, StoreError>) {
        match snapshot {
            Ok(messages) => {
                self.messages = messages;
                self.error = None;
            }
            Err(e) => {
                error!(error = %e, "chat: failed to load messages");
                self.error = Some(LOG_UNAVAILABLE.to_string());
            }
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Lines as displayed: speaker prefix followed by the text.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| format!("{}{}", m.speaker_label(), m.text))
            .collect()
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
