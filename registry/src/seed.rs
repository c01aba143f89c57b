use crate::errors::Result;
use crate::model::{now, Reading, SensorStatus, SensorType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// One entry of the seed fixture. Ids and reading times are kept as given.
#[derive(Debug, Deserialize)]
struct SeedSensor {
    id: String,
    name: String,
    #[serde(rename = "type")]
    sensor_type: SensorType,
    location: String,
    value: Reading,
    unit: String,
    status: SensorStatus,
    last_reading: DateTime<Utc>,
}

/// Loads the fixture at `path` into an empty `sensors` table.
///
/// Returns the number of inserted rows. A non-empty table or a missing file
/// is not an error and inserts nothing; unreadable or malformed fixtures are.
pub async fn seed_from_file(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sensors")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Database already has {} sensors, skipping seed", existing);
        return Ok(0);
    }

    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Seed file not found: {}", path.display());
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let sensors: Vec<SeedSensor> = serde_json::from_slice(&data)?;
    let ts = now();

    let mut tx = pool.begin().await?;
    for sensor in &sensors {
        sqlx::query(
            r#"
            INSERT INTO sensors (id, name, type, location, value, unit, status, last_reading, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sensor.id)
        .bind(&sensor.name)
        .bind(sensor.sensor_type)
        .bind(&sensor.location)
        .bind(sensor.value.as_f64())
        .bind(&sensor.unit)
        .bind(sensor.status)
        .bind(sensor.last_reading)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Seeded database with {} sensors from {}", sensors.len(), path.display());
    Ok(sensors.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::errors::Error;
    use crate::repository::{SensorRepository, SqliteSensorRepository};
    use std::path::PathBuf;

    fn write_fixture(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    const FIXTURE: &str = r#"[
        {"id": "sensor-001", "name": "Hall", "type": "temperature", "location": "hall",
         "value": 21.5, "unit": "celsius", "status": "active", "last_reading": "2024-01-15T10:30:00Z"},
        {"id": "sensor-007", "name": "Door", "type": "contact", "location": "front",
         "value": true, "unit": "boolean", "status": "inactive", "last_reading": "2024-01-15T09:00:00Z"},
        {"id": "sensor-003", "name": "Hall PIR", "type": "motion", "location": "hall",
         "value": false, "unit": "boolean", "status": "error", "last_reading": "2024-01-14T23:59:59Z"}
    ]"#;

    #[tokio::test]
    async fn test_seed_empty_table() {
        let pool = memory_pool().await.unwrap();
        let path = write_fixture(FIXTURE);

        assert_eq!(seed_from_file(&pool, &path).await.unwrap(), 3);

        let repo = SqliteSensorRepository::new(pool);
        let door = repo.get("sensor-007").await.unwrap().unwrap();
        assert_eq!(door.value, 1.0);
        assert_eq!(door.sensor_type, SensorType::Contact);
        assert_eq!(door.last_reading.to_rfc3339(), "2024-01-15T09:00:00+00:00");
        assert_eq!(door.created_at, door.updated_at);

        let pir = repo.get("sensor-003").await.unwrap().unwrap();
        assert_eq!(pir.value, 0.0);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_seed_skips_non_empty_table() {
        let pool = memory_pool().await.unwrap();
        let path = write_fixture(FIXTURE);

        seed_from_file(&pool, &path).await.unwrap();
        assert_eq!(seed_from_file(&pool, &path).await.unwrap(), 0);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_fatal() {
        let pool = memory_pool().await.unwrap();
        let path = std::env::temp_dir().join("does-not-exist-sensors.json");
        assert_eq!(seed_from_file(&pool, &path).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_file_is_fatal() {
        let pool = memory_pool().await.unwrap();
        let path = write_fixture(r#"[{"id": "sensor-001", "value": "hot"}]"#);

        assert!(matches!(
            seed_from_file(&pool, &path).await,
            Err(Error::Json(_))
        ));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_create_after_seed_continues_numbering() {
        let pool = memory_pool().await.unwrap();
        let path = write_fixture(FIXTURE);
        seed_from_file(&pool, &path).await.unwrap();

        let repo = SqliteSensorRepository::new(pool);
        let input = serde_json::from_str(
            r#"{"name":"New","type":"light","location":"attic","value":300,"unit":"lux","status":"active"}"#,
        )
        .unwrap();
        let created = repo.create(&input).await.unwrap();
        assert_eq!(created.id, "sensor-008");

        let _ = std::fs::remove_file(path);
    }
}
