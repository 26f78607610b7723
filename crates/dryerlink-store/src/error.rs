use thiserror::Error;

/// Top-level error type for the `dryerlink-store` crate.
///
/// Covers every failure mode a store backend can report: transport,
/// addressing, subscription revocation, and payload decoding.
/// `dryerlink-core` maps these into user-facing diagnostics.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The backend could not be reached or refused the operation.
    /// Never retried by this crate; retry policy belongs to the backend.
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    // ── Addressing ──────────────────────────────────────────────────
    /// A path segment contains a forbidden character or is empty.
    #[error("Invalid store path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    // ── Subscriptions ───────────────────────────────────────────────
    /// The backend revoked a live subscription (permission change,
    /// server-side cancellation). Terminal for that subscription.
    #[error("Subscription on '{path}' cancelled: {reason}")]
    Cancelled { path: String, reason: String },

    /// The subscription handle is not (or no longer) registered.
    #[error("Unknown subscription {id}")]
    UnknownSubscription { id: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// A snapshot could not be decoded into the requested type.
    #[error("Deserialization error at '{path}': {message}")]
    Deserialization { path: String, message: String },

    // ── Capabilities ────────────────────────────────────────────────
    /// The backend does not offer this primitive.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

impl Error {
    /// Returns `true` if this is a transient transport failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns `true` if the backend lacks the requested primitive.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_transient() {
        let err = Error::Unavailable {
            reason: "socket closed".into(),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn unsupported_is_not_transient() {
        let err = Error::UnsupportedOperation("compare_and_set");
        assert!(err.is_unsupported());
        assert!(!err.is_transient());
    }
}
