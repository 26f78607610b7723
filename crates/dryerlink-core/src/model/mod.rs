// ── Domain model ──

pub mod command;
pub mod device;
pub mod history;
pub mod ids;
pub mod pairing;
pub mod reading;
pub mod user;

pub use command::{Command, CommandAction};
pub use device::{Device, DeviceInfo, UserDeviceLink};
pub use history::{HistoryEntry, HistoryPage, TimeRange};
pub use ids::{DeviceId, MacAddress, PairingCode, UserId};
pub use pairing::PairingRecord;
pub use reading::SensorReading;
pub use user::User;
