// Task record type

use serde::{Deserialize, Serialize};

/// One to-do entry
///
/// `sort_index` is the task's position in the list: across all stored
/// tasks the values are always exactly `0..n-1`, and listing returns
/// tasks in ascending `sort_index` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// Opaque attachment bytes (e.g. a photo); never inspected or decoded
    #[serde(with = "blob_base64", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
    pub sort_index: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Serde adapter storing the image blob as base64 text in JSON output
mod blob_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => STANDARD.encode(b).serialize(ser),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(de)?;
        match encoded {
            Some(s) => STANDARD
                .decode(s.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Current timestamp in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before Unix epoch")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: "task-1".to_string(),
            title: "Buy milk".to_string(),
            description: "Two liters".to_string(),
            completed: false,
            image: None,
            sort_index: 0,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        assert!(ts > 0);
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }

    #[test]
    fn test_task_json_round_trip() {
        let task = sample();
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_absent_image_omitted_from_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("image"));
    }

    #[test]
    fn test_image_encodes_as_base64_text() {
        let mut task = sample();
        task.image = Some(vec![0x00, 0xff, 0x10, 0x80]);

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"image\":\"AP8QgA==\""));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image, task.image);
    }
}
