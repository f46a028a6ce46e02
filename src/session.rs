use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Who the current state belongs to. Guest is the single implicit identity
/// of this device; User is an authenticated backend account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest,
    User { id: String, access_token: String },
}

/// Current identity plus an epoch counter. The epoch advances on every
/// sign-in and sign-out; work that started under an older epoch must
/// discard its result instead of applying it to the now-wrong store.
#[derive(Debug, Clone)]
pub struct Session {
    identity: Identity,
    epoch: Arc<AtomicU64>,
}

impl Session {
    pub fn guest() -> Self {
        Self {
            identity: Identity::Guest,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.identity, Identity::User { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match &self.identity {
            Identity::User { id, .. } => Some(id),
            Identity::Guest => None,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match &self.identity {
            Identity::User { access_token, .. } => Some(access_token),
            Identity::Guest => None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn sign_in(&mut self, id: String, access_token: String) {
        self.identity = Identity::User { id, access_token };
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn sign_out(&mut self) {
        self.identity = Identity::Guest;
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}
