//! In-memory sensor repository used as a test double for the HTTP layer.

use crate::errors::{Error, Result};
use crate::model::{format_sensor_id, now, sensor_id_number, Sensor, SensorInput};
use crate::repository::SensorRepository;
use crate::validate::{validate_create, validate_update};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Sensors keyed by id; the `BTreeMap` keeps them in id order like the SQL backend.
#[derive(Debug, Clone, Default)]
pub struct MemorySensorRepository {
    sensors: Arc<Mutex<BTreeMap<String, Sensor>>>,
}

impl MemorySensorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Sensor>> {
        self.sensors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SensorRepository for MemorySensorRepository {
    async fn list(&self) -> Result<Vec<Sensor>> {
        Ok(self.lock().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Sensor>> {
        Ok(self.lock().get(id).cloned())
    }

    async fn create(&self, input: &SensorInput) -> Result<Sensor> {
        let new = validate_create(input)?;
        let ts = now();

        let mut sensors = self.lock();
        let max = sensors.keys().filter_map(|id| sensor_id_number(id)).max();
        let sensor = Sensor {
            id: format_sensor_id(max.unwrap_or(0) + 1),
            name: new.name,
            sensor_type: new.sensor_type,
            location: new.location,
            value: new.value,
            unit: new.unit,
            status: new.status,
            last_reading: ts,
            created_at: ts,
            updated_at: ts,
        };
        sensors.insert(sensor.id.clone(), sensor.clone());
        Ok(sensor)
    }

    async fn update(&self, id: &str, input: &SensorInput) -> Result<Sensor> {
        let mut sensors = self.lock();
        let sensor = sensors
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let changes = validate_update(input)?;
        changes.apply(sensor, now());
        Ok(sensor.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}
