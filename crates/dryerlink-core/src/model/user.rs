// ── User profile ──

use serde::{Deserialize, Serialize};

/// Wire shape of the profile fields at `users/{uid}`.
///
/// The same node also holds the `devices` map, which is read through
/// the device directory and ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub created_at: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ignores_device_map() {
        let user: User = serde_json::from_value(json!({
            "userId": "u1",
            "email": "a@b.c",
            "name": "Ana",
            "createdAt": 5,
            "devices": { "dev-1": { "deviceName": "D" } }
        }))
        .unwrap();
        assert_eq!(user.name, "Ana");
        assert_eq!(user.created_at, 5);
    }
}
