//! Realtime key-value store contract for dryerlink.
//!
//! The pairing and telemetry engine in `dryerlink-core` never talks to a
//! database directly. It depends on the [`KvStore`] trait defined here:
//! path-addressed reads and writes, change subscriptions that deliver the
//! current value on subscribe, and an optional compare-and-set primitive.
//!
//! [`MemoryStore`] is a complete in-process backend, used when embedding
//! the engine and as the fake store in tests.

pub mod error;
pub mod memory;
pub mod path;
pub mod snapshot;
pub mod store;

pub use error::Error;
pub use memory::MemoryStore;
pub use path::{StorePath, validate_key};
pub use snapshot::Snapshot;
pub use store::{CasOutcome, ChangeEvent, KvStore, Subscription, SubscriptionId};
