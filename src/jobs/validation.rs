use thiserror::Error;

use super::models::{FilterKind, JobSpec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required job field '{0}' is missing")]
    MissingField(&'static str),
}

/// Required creation fields, extracted from a [`JobSpec`] that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredFields {
    pub name: String,
    pub source: i64,
    pub target: i64,
    pub start_id: i64,
    pub end_id: i64,
    pub batch_size: u32,
    pub recurring_time: u32,
    pub delete_time: i64,
    pub filter_type: FilterKind,
}

fn require<T: Copy>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

/// Reject a `JobSpec` that lacks any required field
///
/// A name made only of whitespace counts as missing. Fields are checked in
/// declaration order and the first gap is reported.
pub fn validate_spec(spec: &JobSpec) -> Result<RequiredFields, ValidationError> {
    let name = match spec.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ValidationError::MissingField("name")),
    };

    Ok(RequiredFields {
        name,
        source: require(spec.source, "source")?,
        target: require(spec.target, "target")?,
        start_id: require(spec.start_id, "start_id")?,
        end_id: require(spec.end_id, "end_id")?,
        batch_size: require(spec.batch_size, "batch_size")?,
        recurring_time: require(spec.recurring_time, "recurring_time")?,
        delete_time: require(spec.delete_time, "delete_time")?,
        filter_type: require(spec.filter_type, "filter_type")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_spec_accepts_complete_spec() {
        let fields = validate_spec(&sample_spec()).unwrap();
        assert_eq!(fields.name, "mirror");
        assert_eq!(fields.end_id, 50);
    }

    #[test]
    fn validate_spec_trims_name() {
        let mut spec = sample_spec();
        spec.name = Some("  mirror  ".to_string());
        assert_eq!(validate_spec(&spec).unwrap().name, "mirror");
    }

    #[test]
    fn validate_spec_rejects_blank_name() {
        let mut spec = sample_spec();
        spec.name = Some("   ".to_string());

        let err = validate_spec(&spec).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("name"));
    }

    #[test]
    fn validate_spec_reports_first_missing_field() {
        let mut spec = sample_spec();
        spec.delete_time = None;
        spec.filter_type = None;

        let err = validate_spec(&spec).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("delete_time"));
    }

    #[test]
    fn validate_spec_ignores_optional_overrides() {
        let mut spec = sample_spec();
        spec.caption = None;
        spec.button_text = None;
        spec.button_url = None;
        assert!(validate_spec(&spec).is_ok());
    }

    fn sample_spec() -> JobSpec {
        JobSpec {
            name: Some("mirror".to_string()),
            source: Some(-100111),
            target: Some(-100222),
            start_id: Some(1),
            end_id: Some(50),
            batch_size: Some(5),
            recurring_time: Some(60),
            delete_time: Some(0),
            filter_type: Some(FilterKind::All),
            caption: Some("hello".to_string()),
            button_text: None,
            button_url: None,
        }
    }
}
