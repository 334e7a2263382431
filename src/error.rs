use thiserror::Error;

/// Errors raised when a component is configured with values it cannot run with.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("the road network has no lanes")]
    EmptyNetwork,
    #[error("{field} must be between 0 and 1 (got {value})")]
    Probability { field: &'static str, value: f64 },
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("at least one incident kind must have a positive weight")]
    NoIncidentKinds,
}

/// Checks that `value` is a usable probability.
pub(crate) fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { field, value })
    }
}

/// Checks that `value` is strictly positive.
pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}
