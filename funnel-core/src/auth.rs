//! Authentication signal consumed by tracking and navigation
//!
//! Credential handling lives outside this crate. All the core needs is
//! whether someone is signed in and, if so, their id.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

/// The authenticated user on whose behalf events are tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Source of the "who is signed in" signal
pub trait AuthProvider: Send + Sync {
    /// The current actor, if any
    fn current_user(&self) -> Option<Actor>;

    /// Returns true if an actor is signed in
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// In-process holder of the signed-in actor
///
/// Plays the part of the per-browser identity key: set on login, cleared on
/// logout.
#[derive(Debug, Default)]
pub struct LocalIdentity {
    actor: RwLock<Option<Actor>>,
}

impl LocalIdentity {
    /// Create an identity with nobody signed in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create an identity already signed in as `actor`
    pub fn signed_in(actor: Actor) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    pub fn login(&self, actor: Actor) {
        info!(user_id = %actor.id, "actor signed in");
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = Some(actor);
    }

    /// Forget the signed-in actor; returns the actor that was removed
    pub fn logout(&self) -> Option<Actor> {
        let removed = self
            .actor
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(actor) = &removed {
            info!(user_id = %actor.id, "actor signed out");
        }
        removed
    }
}

impl AuthProvider for LocalIdentity {
    fn current_user(&self) -> Option<Actor> {
        self.actor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
