use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A device as reported by the registry's device endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub hostname: String,
    /// Fully qualified name inside the tailnet
    #[serde(default)]
    pub name: Option<String>,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub client_version: Option<String>,
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub authorized: Option<bool>,
    #[serde(default)]
    pub user: Option<String>,
}

impl Device {
    /// Time elapsed since the device last contacted the control plane.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_seen)
    }

    /// A device is stale once its age strictly exceeds `days` whole days.
    pub fn is_stale(&self, now: DateTime<Utc>, days: u32) -> bool {
        self.age(now) > Duration::days(i64::from(days))
    }

    /// Case-insensitive substring match against the hostname.
    pub fn hostname_matches(&self, term: &str) -> bool {
        self.hostname
            .to_lowercase()
            .contains(&term.to_lowercase())
    }
}

/// Body of `GET /tailnet/-/devices`. A body without `devices` is malformed, not empty.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DeviceList {
    pub devices: Vec<Device>,
}

/// Body of `POST /device/{id}/tags`. Replaces the whole tag list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SetTagsBody {
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn device(hostname: &str, last_seen: DateTime<Utc>) -> Device {
        Device {
            id: "1".to_string(),
            hostname: hostname.to_string(),
            name: None,
            last_seen,
            os: "linux".to_string(),
            tags: vec![],
            addresses: vec![],
            client_version: None,
            update_available: false,
            authorized: None,
            user: None,
        }
    }

    #[test]
    fn test_deserialize_registry_payload() {
        let json = r#"{
            "id": "12345",
            "nodeId": "nXYZ",
            "hostname": "build-box",
            "name": "build-box.tail1234.ts.net",
            "lastSeen": "2024-03-01T10:00:00+02:00",
            "os": "linux",
            "tags": ["tag:ci"],
            "addresses": ["100.64.0.1"],
            "clientVersion": "1.62.0",
            "updateAvailable": true
        }"#;

        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "12345");
        assert_eq!(device.hostname, "build-box");
        assert_eq!(device.tags, vec!["tag:ci".to_string()]);
        assert!(device.update_available);
        // offsets are normalized to UTC
        assert_eq!(
            device.last_seen,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_tags_default_to_empty() {
        let json = r#"{"id":"1","hostname":"a","lastSeen":"2024-03-01T10:00:00Z","os":"macOS"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert!(device.tags.is_empty());
        assert!(device.addresses.is_empty());
    }

    #[test]
    fn test_device_list_requires_devices_key() {
        assert!(serde_json::from_str::<DeviceList>("{}").is_err());
        assert!(serde_json::from_str::<DeviceList>(r#"{"error":"busy"}"#).is_err());

        let list: DeviceList = serde_json::from_str(r#"{"devices":[]}"#).unwrap();
        assert!(list.devices.is_empty());
    }

    #[test]
    fn test_is_stale_is_strict() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

        let exactly = device("a", now - Duration::days(7));
        assert!(!exactly.is_stale(now, 7));

        let older = device("b", now - Duration::days(7) - Duration::seconds(1));
        assert!(older.is_stale(now, 7));

        let fresh = device("c", now - Duration::hours(3));
        assert!(fresh.is_stale(now, 0));
        assert!(!fresh.is_stale(now, 1));
    }

    #[test]
    fn test_future_last_seen_is_never_stale() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let skewed = device("a", now + Duration::minutes(5));
        assert!(!skewed.is_stale(now, 0));
    }

    #[test]
    fn test_hostname_matches_case_insensitive() {
        let now = Utc::now();
        assert!(device("ABCdef", now).hostname_matches("abc"));
        assert!(device("abcdef", now).hostname_matches("CDE"));
        assert!(!device("xyz", now).hostname_matches("abc"));
    }
}
