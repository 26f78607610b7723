// ── Identity collaborator ──

use std::sync::RwLock;

use crate::model::UserId;

/// Yields the signed-in user, if any. Authentication itself happens
/// elsewhere; the engine only needs the opaque id.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Identity provider with a settable user, for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<UserId>>,
}

impl StaticIdentity {
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn set(&self, user: Option<UserId>) {
        let mut guard = self
            .user
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = user;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sign_out_clears_user() {
        let identity = StaticIdentity::signed_in(UserId::new("u1").unwrap());
        assert_eq!(identity.current_user_id().unwrap().as_str(), "u1");
        identity.set(None);
        assert!(identity.current_user_id().is_none());
    }
}
