// ── Core error types ──
//
// User-facing errors from dryerlink-core. Consumers never see raw store
// errors; the `From<dryerlink_store::Error>` impls translate transport
// failures into domain-appropriate variants.

use thiserror::Error;

use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Store errors ─────────────────────────────────────────────────
    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Subscription on {path} cancelled: {reason}")]
    SubscriptionCancelled { path: String, reason: String },

    #[error("Malformed payload at {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Store operation not supported: {operation}")]
    Unsupported { operation: String },

    // ── Identity errors ──────────────────────────────────────────────
    #[error("No user is signed in")]
    NotSignedIn,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error(transparent)]
    Pairing(#[from] PairingError),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dryerlink_store::Error> for CoreError {
    fn from(err: dryerlink_store::Error) -> Self {
        use dryerlink_store::Error as StoreError;

        match err {
            StoreError::Unavailable { reason } => CoreError::StoreUnavailable { reason },
            StoreError::Cancelled { path, reason } => {
                CoreError::SubscriptionCancelled { path, reason }
            }
            StoreError::Deserialization { path, message } => CoreError::Decode { path, message },
            StoreError::InvalidPath { path, reason } => CoreError::Validation {
                field: "path".into(),
                reason: format!("{path}: {reason}"),
            },
            StoreError::UnsupportedOperation(op) => CoreError::Unsupported {
                operation: op.to_owned(),
            },
            StoreError::UnknownSubscription { id } => {
                CoreError::Internal(format!("unknown subscription {id}"))
            }
        }
    }
}

// ── Pairing errors ───────────────────────────────────────────────────

/// Why a pairing attempt failed. Terminal for that attempt; never retried.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Pairing code must be exactly 6 digits")]
    InvalidCodeFormat { code: String },

    #[error("Device name must be at least 2 characters")]
    InvalidDeviceName { name: String },

    #[error("Invalid pairing code")]
    CodeNotFound,

    #[error("Pairing code already used")]
    CodeAlreadyUsed,

    #[error("Pairing code expired")]
    CodeExpired,

    #[error("Pairing record is malformed: {reason}")]
    MalformedRecord { reason: String },

    #[error("No user is signed in")]
    NotSignedIn,

    /// The code was consumed but a later write failed. The claim stands;
    /// re-apply the remaining writes with `repair_pairing`.
    #[error("Device {device_id} was claimed but pairing did not finish: {reason}")]
    Incomplete { device_id: DeviceId, reason: String },

    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },
}

impl PairingError {
    /// Stable machine-readable code, suitable for UI lookups.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCodeFormat { .. } => "INVALID_CODE_FORMAT",
            Self::InvalidDeviceName { .. } => "INVALID_DEVICE_NAME",
            Self::CodeNotFound => "CODE_NOT_FOUND",
            Self::CodeAlreadyUsed => "CODE_ALREADY_USED",
            Self::CodeExpired => "CODE_EXPIRED",
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::NotSignedIn => "NOT_SIGNED_IN",
            Self::Incomplete { .. } => "INCOMPLETE",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }
}

impl From<dryerlink_store::Error> for PairingError {
    fn from(err: dryerlink_store::Error) -> Self {
        match err {
            dryerlink_store::Error::Deserialization { message, .. } => {
                PairingError::MalformedRecord { reason: message }
            }
            other => PairingError::StoreUnavailable {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_maps_to_core_variant() {
        let err: CoreError = dryerlink_store::Error::Unavailable {
            reason: "offline".into(),
        }
        .into();
        assert!(matches!(err, CoreError::StoreUnavailable { ref reason } if reason == "offline"));
    }

    #[test]
    fn deserialization_maps_to_decode() {
        let err: CoreError = dryerlink_store::Error::Deserialization {
            path: "devices/d/current".into(),
            message: "invalid type".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Decode { .. }));
    }

    #[test]
    fn pairing_codes_are_stable() {
        assert_eq!(PairingError::CodeNotFound.code(), "CODE_NOT_FOUND");
        assert_eq!(PairingError::CodeAlreadyUsed.code(), "CODE_ALREADY_USED");
        assert_eq!(PairingError::CodeExpired.code(), "CODE_EXPIRED");
        assert_eq!(
            PairingError::MalformedRecord {
                reason: "deviceId missing".into()
            }
            .code(),
            "MALFORMED_RECORD"
        );
    }

    #[test]
    fn pairing_reasons_are_human_readable() {
        assert_eq!(PairingError::CodeAlreadyUsed.to_string(), "Pairing code already used");
        let wrapped = CoreError::from(PairingError::CodeExpired);
        assert_eq!(wrapped.to_string(), "Pairing code expired");
    }
}
