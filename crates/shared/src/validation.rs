//! Common validation utilities.

use validator::ValidationError;

/// Longest instance identifier accepted by the relay.
pub const MAX_INSTANCE_ID_LENGTH: usize = 64;

/// Oldest plausible age on a feedback form.
const MAX_AGE: i32 = 150;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates an instance identifier: non-blank, bounded, no whitespace.
///
/// Clients generate UUIDs, but the relay treats the value as opaque and
/// does not insist on the UUID format.
pub fn validate_instance_id(instance_id: &str) -> Result<(), ValidationError> {
    if instance_id.trim().is_empty() {
        let mut err = ValidationError::new("instance_id_empty");
        err.message = Some("Instance id is required".into());
        return Err(err);
    }
    if instance_id.len() > MAX_INSTANCE_ID_LENGTH {
        let mut err = ValidationError::new("instance_id_length");
        err.message = Some("Instance id cannot exceed 64 characters".into());
        return Err(err);
    }
    if instance_id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("instance_id_format");
        err.message = Some("Instance id cannot contain whitespace".into());
        return Err(err);
    }
    Ok(())
}

/// Validates an age reported on the feedback form (0 to 150).
pub fn validate_age(age: i32) -> Result<(), ValidationError> {
    if (0..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        let mut err = ValidationError::new("age_range");
        err.message = Some("Age must be between 0 and 150".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_latitude_error_message() {
        let err = validate_latitude(100.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Latitude must be between -90 and 90"
        );
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_validate_longitude_nan() {
        assert!(validate_longitude(f64::NAN).is_err());
        assert!(validate_latitude(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_instance_id() {
        assert!(validate_instance_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_instance_id("X").is_ok());
        assert!(validate_instance_id("").is_err());
        assert!(validate_instance_id("   ").is_err());
        assert!(validate_instance_id("has space").is_err());
        assert!(validate_instance_id(&"a".repeat(65)).is_err());
        assert!(validate_instance_id(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_instance_id_error_message() {
        let err = validate_instance_id("").unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "Instance id is required");
    }

    #[test]
    fn test_validate_age() {
        assert!(validate_age(0).is_ok());
        assert!(validate_age(42).is_ok());
        assert!(validate_age(150).is_ok());
        assert!(validate_age(-1).is_err());
        assert!(validate_age(151).is_err());
    }
}
