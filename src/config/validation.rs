use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Store name must not be empty")]
    EmptyStoreName,

    #[error("Store name '{0}' must not contain path separators")]
    InvalidStoreName(String),

    #[error("Retention duration must be positive: {field}")]
    NonPositiveDuration { field: String },

    #[error("sweep_interval ({interval}) exceeds ledger_ttl ({ttl})")]
    SweepLongerThanTtl { interval: String, ttl: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_store(config)?;
    validate_retention(config)?;
    Ok(())
}

fn validate_store(config: &Config) -> Result<(), ValidationError> {
    let name = config.store.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyStoreName);
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ValidationError::InvalidStoreName(config.store.name.clone()));
    }
    Ok(())
}

/// Both retention durations must be positive and the sweep must run at
/// least once per retention window
fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    let retention = &config.retention;

    if retention.ledger_ttl.as_secs() == 0 {
        return Err(ValidationError::NonPositiveDuration {
            field: "ledger_ttl".to_string(),
        });
    }

    if retention.sweep_interval.as_secs() == 0 {
        return Err(ValidationError::NonPositiveDuration {
            field: "sweep_interval".to_string(),
        });
    }

    if retention.sweep_interval > retention.ledger_ttl {
        return Err(ValidationError::SweepLongerThanTtl {
            interval: retention.sweep_interval.to_string(),
            ttl: retention.ledger_ttl.to_string(),
        });
    }

    Ok(())
}
