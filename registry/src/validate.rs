use crate::errors::{Error, Result};
use crate::model::{NewSensor, SensorChanges, SensorInput, SensorStatus, SensorType};

const NAME_MAX: usize = 100;
const LOCATION_MAX: usize = 100;
const UNIT_MAX: usize = 50;

/// Validates a create request. Every field must be present.
pub fn validate_create(input: &SensorInput) -> Result<NewSensor> {
    let name = input.name.as_deref().ok_or(Error::MissingField("name"))?;
    let sensor_type = input
        .sensor_type
        .as_deref()
        .ok_or(Error::MissingField("type"))?;
    let location = input
        .location
        .as_deref()
        .ok_or(Error::MissingField("location"))?;
    let value = input.value.ok_or(Error::MissingField("value"))?;
    let unit = input.unit.as_deref().ok_or(Error::MissingField("unit"))?;
    let status = input.status.as_deref().ok_or(Error::MissingField("status"))?;

    Ok(NewSensor {
        name: check_length("name", name, NAME_MAX)?,
        sensor_type: sensor_type.parse::<SensorType>()?,
        location: check_length("location", location, LOCATION_MAX)?,
        value: value.as_f64(),
        unit: check_length("unit", unit, UNIT_MAX)?,
        status: status.parse::<SensorStatus>()?,
    })
}

/// Validates an update request. Absent fields pass untouched.
pub fn validate_update(input: &SensorInput) -> Result<SensorChanges> {
    Ok(SensorChanges {
        name: input
            .name
            .as_deref()
            .map(|n| check_length("name", n, NAME_MAX))
            .transpose()?,
        sensor_type: input
            .sensor_type
            .as_deref()
            .map(str::parse::<SensorType>)
            .transpose()?,
        location: input
            .location
            .as_deref()
            .map(|l| check_length("location", l, LOCATION_MAX))
            .transpose()?,
        value: input.value.map(|v| v.as_f64()),
        unit: input
            .unit
            .as_deref()
            .map(|u| check_length("unit", u, UNIT_MAX))
            .transpose()?,
        status: input
            .status
            .as_deref()
            .map(str::parse::<SensorStatus>)
            .transpose()?,
    })
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<String> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(Error::invalid(
            field,
            format!("length {} out of range [1, {}]", len, max),
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;

    fn full_input() -> SensorInput {
        SensorInput {
            name: Some("Test".to_string()),
            sensor_type: Some("temperature".to_string()),
            location: Some("room".to_string()),
            value: Some(Reading::Number(72.5)),
            unit: Some("f".to_string()),
            status: Some("active".to_string()),
        }
    }

    #[test]
    fn test_valid_create() {
        let sensor = validate_create(&full_input()).unwrap();
        assert_eq!(sensor.name, "Test");
        assert_eq!(sensor.sensor_type, SensorType::Temperature);
        assert_eq!(sensor.value, 72.5);
        assert_eq!(sensor.status, SensorStatus::Active);
    }

    #[test]
    fn test_zero_value_is_not_missing() {
        let input = SensorInput {
            value: Some(Reading::Number(0.0)),
            ..full_input()
        };
        assert_eq!(validate_create(&input).unwrap().value, 0.0);
    }

    #[test]
    fn test_bogus_type_rejected() {
        let input = SensorInput {
            sensor_type: Some("bogus".to_string()),
            ..full_input()
        };
        match validate_create(&input) {
            Err(Error::InvalidValue { field, value }) => {
                assert_eq!(field, "type");
                assert_eq!(value, "bogus");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_bogus_status_rejected() {
        let input = SensorInput {
            status: Some("broken".to_string()),
            ..full_input()
        };
        assert!(matches!(
            validate_create(&input),
            Err(Error::InvalidValue { field: "status", .. })
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let input = SensorInput {
            unit: None,
            ..full_input()
        };
        assert!(matches!(
            validate_create(&input),
            Err(Error::MissingField("unit"))
        ));
    }

    #[test]
    fn test_length_limits() {
        let input = SensorInput {
            name: Some(String::new()),
            ..full_input()
        };
        assert!(validate_create(&input).is_err());

        let input = SensorInput {
            unit: Some("u".repeat(51)),
            ..full_input()
        };
        assert!(validate_create(&input).is_err());

        // limits count characters, not bytes
        let input = SensorInput {
            location: Some("é".repeat(100)),
            ..full_input()
        };
        assert!(validate_create(&input).is_ok());
    }

    #[test]
    fn test_empty_update_is_valid() {
        let changes = validate_update(&SensorInput::default()).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_update_validates_only_supplied_fields() {
        let input = SensorInput {
            value: Some(Reading::Flag(true)),
            status: Some("inactive".to_string()),
            ..Default::default()
        };
        let changes = validate_update(&input).unwrap();
        assert_eq!(changes.value, Some(1.0));
        assert_eq!(changes.status, Some(SensorStatus::Inactive));
        assert_eq!(changes.name, None);

        let input = SensorInput {
            sensor_type: Some("bogus".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&input).is_err());
    }
}
