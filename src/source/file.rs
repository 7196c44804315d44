//! Seed rows from a JSON file.
//!
//! The file holds a JSON array of measurement rows in any order, e.g. a dump
//! of the measurement table.

use std::path::Path;

use crate::data::Measurement;
use crate::error::FetchError;

/// Load the newest `limit` rows from a JSON file, newest first.
pub async fn load_seed(path: &Path, limit: usize) -> Result<Vec<Measurement>, FetchError> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut rows: Vec<Measurement> =
        serde_json::from_str(&content).map_err(|e| FetchError::Decode(e.to_string()))?;

    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    rows.truncate(limit);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"[
            {"id": 1, "created_at": "2024-05-01T12:00:00Z", "device_id": "a",
             "sensor_data": {"distance_cm": 10.0, "alert": false}},
            {"id": 3, "created_at": "2024-05-01T12:02:00Z", "device_id": "a",
             "sensor_data": {"distance_cm": 30.0, "alert": true}},
            {"id": 2, "created_at": "2024-05-01T12:01:00Z", "device_id": "a",
             "sensor_data": {"distance_cm": 20.0, "alert": false}}
        ]"#
    }

    #[tokio::test]
    async fn test_load_seed_sorts_and_limits() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let rows = load_seed(file.path(), 2).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_load_seed_missing_file() {
        let result = load_seed(Path::new("/nonexistent/seed.json"), 50).await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_seed_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_seed(file.path(), 50).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }
}
