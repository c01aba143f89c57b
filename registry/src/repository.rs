use crate::errors::{Error, Result};
use crate::model::{now, Sensor, SensorInput, ID_PREFIX};
use crate::validate::{validate_create, validate_update};
use sqlx::SqlitePool;
use std::future::Future;
use tracing::debug;

/// Storage capability the HTTP layer is written against.
///
/// `create` and `update` validate their input and fail with
/// [`Error::InvalidValue`]; `update` and `delete` fail with
/// [`Error::NotFound`] for unknown ids. `get` reports a missing id as `None`.
pub trait SensorRepository: Clone + Send + Sync + 'static {
    /// All sensors ordered by id.
    fn list(&self) -> impl Future<Output = Result<Vec<Sensor>>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Sensor>>> + Send;

    /// Assigns the next `sensor-NNN` id and stamps all timestamps with now.
    fn create(&self, input: &SensorInput) -> impl Future<Output = Result<Sensor>> + Send;

    /// Applies the supplied fields; `updated_at` and `last_reading` are
    /// refreshed even when nothing else changes.
    fn update(&self, id: &str, input: &SensorInput)
        -> impl Future<Output = Result<Sensor>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

const COLUMNS: &str =
    "id, name, type, location, value, unit, status, last_reading, created_at, updated_at";

/// Matches ids of the form `sensor-<digits>`, case-sensitively, the same ids
/// [`sensor_id_number`](crate::model::sensor_id_number) accepts.
const NUMBERED_ID: &str = "id GLOB 'sensor-[0-9]*' AND SUBSTR(id, 8) NOT GLOB '*[^0-9]*'";

#[derive(Debug, Clone)]
pub struct SqliteSensorRepository {
    pool: SqlitePool,
}

impl SqliteSensorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SensorRepository for SqliteSensorRepository {
    async fn list(&self) -> Result<Vec<Sensor>> {
        let query = format!("SELECT {} FROM sensors ORDER BY id", COLUMNS);
        let sensors = sqlx::query_as::<_, Sensor>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(sensors)
    }

    async fn get(&self, id: &str) -> Result<Option<Sensor>> {
        let query = format!("SELECT {} FROM sensors WHERE id = ?", COLUMNS);
        let sensor = sqlx::query_as::<_, Sensor>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sensor)
    }

    async fn create(&self, input: &SensorInput) -> Result<Sensor> {
        let new = validate_create(input)?;
        let ts = now();

        // Id assignment and insert must stay a single statement.
        let query = format!(
            r#"
            INSERT INTO sensors ({columns})
            SELECT printf('{prefix}%03d', COALESCE(MAX(CAST(SUBSTR(id, {offset}) AS INTEGER)), 0) + 1),
                   ?, ?, ?, ?, ?, ?, ?, ?, ?
            FROM sensors
            WHERE {numbered}
            RETURNING {columns}
            "#,
            columns = COLUMNS,
            prefix = ID_PREFIX,
            offset = ID_PREFIX.len() + 1,
            numbered = NUMBERED_ID,
        );
        let sensor = sqlx::query_as::<_, Sensor>(&query)
            .bind(&new.name)
            .bind(new.sensor_type)
            .bind(&new.location)
            .bind(new.value)
            .bind(&new.unit)
            .bind(new.status)
            .bind(ts)
            .bind(ts)
            .bind(ts)
            .fetch_one(&self.pool)
            .await?;

        debug!("Created sensor {}", sensor.id);
        Ok(sensor)
    }

    async fn update(&self, id: &str, input: &SensorInput) -> Result<Sensor> {
        let changes = match validate_update(input) {
            Ok(changes) => changes,
            Err(e) => {
                // An unknown id reports as not found even when the body is invalid.
                return match self.get(id).await? {
                    Some(_) => Err(e),
                    None => Err(Error::NotFound(id.to_string())),
                };
            }
        };
        if changes.is_empty() {
            debug!("Empty update for sensor {}, refreshing timestamps only", id);
        }
        let ts = now();

        let query = format!(
            r#"
            UPDATE sensors
            SET name = COALESCE(?, name),
                type = COALESCE(?, type),
                location = COALESCE(?, location),
                value = COALESCE(?, value),
                unit = COALESCE(?, unit),
                status = COALESCE(?, status),
                last_reading = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            COLUMNS
        );
        let sensor = sqlx::query_as::<_, Sensor>(&query)
            .bind(changes.name)
            .bind(changes.sensor_type)
            .bind(changes.location)
            .bind(changes.value)
            .bind(changes.unit)
            .bind(changes.status)
            .bind(ts)
            .bind(ts)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        debug!("Updated sensor {}", id);
        Ok(sensor)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sensors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        debug!("Deleted sensor {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::model::{Reading, SensorStatus, SensorType};

    fn input(name: &str) -> SensorInput {
        SensorInput {
            name: Some(name.to_string()),
            sensor_type: Some("temperature".to_string()),
            location: Some("room".to_string()),
            value: Some(Reading::Number(72.5)),
            unit: Some("f".to_string()),
            status: Some("active".to_string()),
        }
    }

    async fn repo() -> SqliteSensorRepository {
        SqliteSensorRepository::new(memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_list_empty() {
        let repo = repo().await;
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = repo().await;

        let first = repo.create(&input("a")).await.unwrap();
        let second = repo.create(&input("b")).await.unwrap();
        assert_eq!(first.id, "sensor-001");
        assert_eq!(second.id, "sensor-002");
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(first.created_at, first.last_reading);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_below_max() {
        let repo = repo().await;
        for name in ["a", "b", "c"] {
            repo.create(&input(name)).await.unwrap();
        }
        repo.delete("sensor-002").await.unwrap();

        let next = repo.create(&input("d")).await.unwrap();
        assert_eq!(next.id, "sensor-004");
    }

    #[tokio::test]
    async fn test_next_id_ignores_foreign_ids() {
        let pool = memory_pool().await.unwrap();
        let ts = now();
        for id in ["SENSOR-900", "sensor-12abc", "sensor-+50", "sensor-005"] {
            sqlx::query(
                "INSERT INTO sensors (id, name, type, location, value, unit, status, \
                 last_reading, created_at, updated_at) \
                 VALUES (?, 'x', 'light', 'hall', 0, 'lux', 'active', ?, ?, ?)",
            )
            .bind(id)
            .bind(ts)
            .bind(ts)
            .bind(ts)
            .execute(&pool)
            .await
            .unwrap();
        }

        let repo = SqliteSensorRepository::new(pool);
        let next = repo.create(&input("a")).await.unwrap();
        assert_eq!(next.id, "sensor-006");
    }

    #[tokio::test]
    async fn test_get_matches_create() {
        let repo = repo().await;
        let created = repo.create(&input("lab")).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = repo().await;
        assert!(repo.get("sensor-999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_invalid_type_persists_nothing() {
        let repo = repo().await;
        let bad = SensorInput {
            sensor_type: Some("bogus".to_string()),
            ..input("x")
        };
        assert!(matches!(
            repo.create(&bad).await,
            Err(Error::InvalidValue { field: "type", .. })
        ));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let repo = repo().await;
        let created = repo.create(&input("Test")).await.unwrap();

        let patch = SensorInput {
            value: Some(Reading::Number(75.5)),
            status: Some("inactive".to_string()),
            ..Default::default()
        };
        let updated = repo.update(&created.id, &patch).await.unwrap();

        assert_eq!(updated.value, 75.5);
        assert_eq!(updated.status, SensorStatus::Inactive);
        assert_eq!(updated.name, "Test");
        assert_eq!(updated.sensor_type, SensorType::Temperature);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.updated_at, updated.last_reading);

        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_empty_update_refreshes_timestamps_only() {
        let repo = repo().await;
        let created = repo.create(&input("Test")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let updated = repo
            .update(&created.id, &SensorInput::default())
            .await
            .unwrap();

        assert!(updated.updated_at > created.updated_at);
        assert!(updated.last_reading > created.last_reading);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.value, created.value);
        assert_eq!(updated.status, created.status);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_and_invalid() {
        let repo = repo().await;
        assert!(matches!(
            repo.update("sensor-404", &SensorInput::default()).await,
            Err(Error::NotFound(_))
        ));

        let created = repo.create(&input("Test")).await.unwrap();
        let bad = SensorInput {
            status: Some("melted".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(&created.id, &bad).await,
            Err(Error::InvalidValue { field: "status", .. })
        ));
        assert_eq!(repo.get(&created.id).await.unwrap().unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_unknown_id_wins_over_invalid_body() {
        let repo = repo().await;
        let bad = SensorInput {
            sensor_type: Some("bogus".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update("sensor-404", &bad).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        let created = repo.create(&input("Test")).await.unwrap();

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get(&created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&created.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
