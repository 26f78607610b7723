//! Pairing, telemetry and command engine for remote grain dryers.
//!
//! The engine sits between a realtime key-value store (the transport
//! shared with dryer firmware) and UI consumers:
//!
//! - **[`Controller`]**: Central facade. Owns one instance of every
//!   component below, wired to an injected [`KvStore`](dryerlink_store::KvStore),
//!   [`IdentityProvider`] and [`Clock`].
//!
//! - **Pairing** ([`PairingService`]): Validates six-digit one-time codes
//!   and claims them with a compare-and-set on `used`, so concurrent
//!   claims of one code succeed exactly once.
//!
//! - **[`DeviceDirectory`]**: Reactive device records built on
//!   `EntityCollection<K, T>` (`DashMap` + `tokio::sync::watch`), fed by the
//!   user's device listing, one-shot metadata fetches and telemetry hints.
//!   Skipped entries and failed fetches are reported as [`DirectoryEvent`]s.
//!
//! - **[`TelemetryManager`]**: One tracked subscription per device.
//!   Publishes the latest [`SensorReading`] per device and a typed
//!   [`TelemetryEvent`] feed that surfaces decode failures and lost
//!   subscriptions.
//!
//! - **[`CommandChannel`]**: Single-slot command writes plus
//!   acknowledgment observation.
//!
//! - **[`liveness`]**: Online/offline inference from write staleness.
//!
//! - **[`paths`]**: The wire layout, the only place store paths are built.

pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod history;
pub mod identity;
pub mod liveness;
pub mod model;
pub mod pairing;
pub mod paths;
pub mod stream;
pub mod telemetry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{AckOutcome, CommandChannel};
pub use config::EngineConfig;
pub use controller::Controller;
pub use directory::{DeviceDirectory, DirectoryEvent, ListingState};
pub use error::{CoreError, PairingError};
pub use identity::{IdentityProvider, StaticIdentity};
pub use liveness::{Liveness, is_offline};
pub use pairing::PairingService;
pub use stream::{EntityStream, ReadingStream};
pub use telemetry::{ListenOutcome, TelemetryEvent, TelemetryManager};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Command, CommandAction, Device, DeviceId, DeviceInfo, HistoryEntry, HistoryPage, MacAddress,
    PairingCode, PairingRecord, SensorReading, TimeRange, User, UserDeviceLink, UserId,
};
