// Source of the current actor's identity.

use std::sync::{Arc, PoisonError, RwLock};

use donelist_common::types::Session;

/// Queried before every mutation. `None` means signed out, and callers must
/// fail closed without contacting the mutation service.
pub trait SessionProvider: Send + Sync + 'static {
    fn current(&self) -> Option<Session>;
}

/// Shared, swappable session slot. Clones observe the same slot, so signing
/// out through one handle is seen by every controller holding another.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    slot: Arc<RwLock<Option<Session>>>,
}

impl SharedSession {
    pub fn signed_in(session: Session) -> Self {
        Self { slot: Arc::new(RwLock::new(Some(session))) }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, session: Session) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn sign_out(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for SharedSession {
    fn current(&self) -> Option<Session> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
