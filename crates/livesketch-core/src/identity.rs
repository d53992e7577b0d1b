//! Participant identity.

use crate::event::AuthorId;

/// Source of the current participant's identity.
///
/// Authentication itself lives outside this crate; without an identity every
/// write path is disabled.
pub trait IdentityProvider: Send + Sync {
    fn current_author(&self) -> Option<AuthorId>;
}

/// Fixed identity, e.g. from a command-line flag.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    author: Option<AuthorId>,
}

impl StaticIdentity {
    pub fn new(author: AuthorId) -> Self {
        Self {
            author: Some(author),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_author(&self) -> Option<AuthorId> {
        self.author.clone()
    }
}
