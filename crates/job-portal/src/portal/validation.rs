use thiserror::Error;

/// Longest statement of purpose or recruiter bio accepted, in words.
pub const MAX_STATEMENT_WORDS: usize = 250;

/// Malformed input, rejected before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn ensure_word_limit(
    field: &'static str,
    text: &str,
    limit: usize,
) -> Result<(), ValidationError> {
    let words = word_count(text);
    if words > limit {
        return Err(ValidationError::new(
            field,
            format!("must not exceed {limit} words (found {words})"),
        ));
    }
    Ok(())
}

pub fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

/// JSON numbers arrive as floats; counters and money fields must be whole and non-negative.
pub fn whole_number(field: &'static str, value: f64) -> Result<u32, ValidationError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ValidationError::new(field, "must be a whole number"));
    }
    if value < 0.0 {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    if value > f64::from(u32::MAX) {
        return Err(ValidationError::new(field, "is too large"));
    }
    Ok(value as u32)
}

pub fn positive_whole_number(field: &'static str, value: f64) -> Result<u32, ValidationError> {
    let number = whole_number(field, value)?;
    if number == 0 {
        return Err(ValidationError::new(field, "must be greater than 0"));
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_ignores_repeated_whitespace() {
        assert_eq!(word_count("  ship   it\n\tnow "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn whole_number_rejects_fractions_and_negatives() {
        assert_eq!(whole_number("salary", 1200.0), Ok(1200));
        assert_eq!(
            whole_number("salary", 12.5).unwrap_err().reason,
            "must be a whole number"
        );
        assert_eq!(
            whole_number("salary", -1.0).unwrap_err().reason,
            "must not be negative"
        );
        assert!(whole_number("salary", f64::NAN).is_err());
        assert!(positive_whole_number("max_positions", 0.0).is_err());
    }
}
