//! Mutation orchestrator — the auth-gated create/update/delete state machine.
//!
//! DESIGN
//! ======
//! Every catalog write walks the same phases per kind:
//!
//! ```text
//! Idle → Authorizing → InFlight → Reloading → Idle
//! Idle → Authorizing → Rejected → Idle
//! ```
//!
//! `Rejected` is transient: the kind is back at `Idle` as soon as the error
//! is built. Every phase change is also published as a [`PhaseChange`] so a
//! front end can react to the rejection itself. Authorization fails
//! closed: without a session no remote call is made and the caller is told
//! to redirect to the login route. The "animation visible" flag is true from
//! the start of `InFlight` to the end of `Reloading` and carries no other
//! meaning.
//!
//! User-facing messages are composed here from the record's [`Noun`] so every
//! controller words its failures the same way.

use tokio::sync::{broadcast, watch};
use tracing::{error, info};

use crate::auth::SessionContext;
use crate::backend::{StorageError, StoreError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Verb used in authorization and selection messages.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Create => "agregar",
            Self::Update => "editar",
            Self::Delete => "eliminar",
        }
    }

    /// Verb used in remote failure messages.
    #[must_use]
    pub fn failure_verb(self) -> &'static str {
        match self {
            Self::Create => "agregar",
            Self::Update => "actualizar",
            Self::Delete => "eliminar",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Create => 0,
            Self::Update => 1,
            Self::Delete => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationPhase {
    #[default]
    Idle,
    Authorizing,
    InFlight,
    Reloading,
    Rejected,
}

/// One phase entered by one mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub kind: MutationKind,
    pub phase: MutationPhase,
}

/// Navigation targets a failed mutation can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
        }
    }
}

/// Grammatical description of a record type, for composing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Noun {
    pub singular: &'static str,
    pub plural: &'static str,
    pub feminine: bool,
}

impl Noun {
    #[must_use]
    pub fn indefinite(&self) -> String {
        format!("{} {}", if self.feminine { "una" } else { "un" }, self.singular)
    }

    #[must_use]
    pub fn definite(&self) -> String {
        format!("{} {}", if self.feminine { "la" } else { "el" }, self.singular)
    }

    #[must_use]
    pub fn definite_plural(&self) -> String {
        format!("{} {}", if self.feminine { "las" } else { "los" }, self.plural)
    }

    fn selected(&self) -> &'static str {
        if self.feminine { "seleccionada" } else { "seleccionado" }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a backend call made on behalf of a mutation.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("{message}")]
    AuthorizationRequired { message: String, redirect: Route },
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: RemoteError,
    },
}

impl MutationError {
    /// Text to show the user.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::AuthorizationRequired { message, .. } | Self::Remote { message, .. } => message,
            Self::Validation(message) => message,
        }
    }

    #[must_use]
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::AuthorizationRequired { redirect, .. } => Some(*redirect),
            _ => None,
        }
    }
}

#[must_use]
pub fn authorization_message(kind: MutationKind, noun: &Noun) -> String {
    format!("Debes iniciar sesión para {} {}.", kind.verb(), noun.indefinite())
}

#[must_use]
pub fn not_selected_message(kind: MutationKind, noun: &Noun) -> String {
    format!("No hay {} {} para {}.", noun.indefinite(), noun.selected(), kind.verb())
}

#[must_use]
pub fn remote_failure_message(kind: MutationKind, noun: &Noun) -> String {
    format!("Error al {} {}. Por favor, intenta de nuevo.", kind.failure_verb(), noun.definite())
}

#[must_use]
pub fn load_failure_message(noun: &Noun) -> String {
    format!("Error al obtener {}. Por favor, intenta de nuevo.", noun.definite_plural())
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

const PHASE_CHANGE_CAPACITY: usize = 32;

pub struct MutationOrchestrator {
    noun: Noun,
    phases: [MutationPhase; 3],
    animation: watch::Sender<bool>,
    changes: broadcast::Sender<PhaseChange>,
}

impl MutationOrchestrator {
    #[must_use]
    pub fn new(noun: Noun) -> Self {
        let (animation, _rx) = watch::channel(false);
        let (changes, _) = broadcast::channel(PHASE_CHANGE_CAPACITY);
        Self { noun, phases: [MutationPhase::Idle; 3], animation, changes }
    }

    #[must_use]
    pub fn noun(&self) -> &Noun {
        &self.noun
    }

    #[must_use]
    pub fn phase(&self, kind: MutationKind) -> MutationPhase {
        self.phases[kind.index()]
    }

    /// Observe the in-progress animation flag.
    #[must_use]
    pub fn animation(&self) -> watch::Receiver<bool> {
        self.animation.subscribe()
    }

    /// Observe every phase change, including the transient `Rejected`.
    #[must_use]
    pub fn phase_changes(&self) -> broadcast::Receiver<PhaseChange> {
        self.changes.subscribe()
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        *self.animation.borrow()
    }

    /// Enter `Authorizing` and check the session.
    ///
    /// # Errors
    ///
    /// `AuthorizationRequired` with the login redirect when nobody is signed in.
    pub fn authorize(&mut self, kind: MutationKind, session: &SessionContext) -> Result<(), MutationError> {
        self.set(kind, MutationPhase::Authorizing);
        if session.is_logged_in() {
            return Ok(());
        }
        let err = MutationError::AuthorizationRequired {
            message: authorization_message(kind, &self.noun),
            redirect: Route::Login,
        };
        self.settle_rejected(kind);
        Err(err)
    }

    /// Reject the attempt after a failed validation.
    pub fn reject(&mut self, kind: MutationKind, message: impl Into<String>) -> MutationError {
        let err = MutationError::Validation(message.into());
        self.settle_rejected(kind);
        err
    }

    /// Enter `InFlight`; the animation turns on.
    pub fn begin(&mut self, kind: MutationKind) {
        self.set(kind, MutationPhase::InFlight);
        self.animation.send_replace(true);
    }

    /// The remote call failed: log it, return to `Idle` and build the user error.
    pub fn fail(&mut self, kind: MutationKind, source: impl Into<RemoteError>) -> MutationError {
        let source = source.into();
        error!(kind = ?kind, record = self.noun.singular, error = %source, "mutation: remote call failed");
        self.set(kind, MutationPhase::Idle);
        self.animation.send_replace(false);
        MutationError::Remote { message: remote_failure_message(kind, &self.noun), source }
    }

    /// The remote call succeeded; the collection is being re-fetched.
    pub fn reload(&mut self, kind: MutationKind) {
        self.set(kind, MutationPhase::Reloading);
    }

    /// Reload done; back to `Idle` with the animation off.
    pub fn finish(&mut self, kind: MutationKind) {
        info!(kind = ?kind, record = self.noun.singular, "mutation: completed");
        self.set(kind, MutationPhase::Idle);
        self.animation.send_replace(false);
    }

    fn settle_rejected(&mut self, kind: MutationKind) {
        self.set(kind, MutationPhase::Rejected);
        self.set(kind, MutationPhase::Idle);
    }

    fn set(&mut self, kind: MutationKind, phase: MutationPhase) {
        self.phases[kind.index()] = phase;
        // No subscribers is fine.
        let _ = self.changes.send(PhaseChange { kind, phase });
    }
}

#[cfg(test)]
#[path = "mutation_test.rs"]
mod tests;
