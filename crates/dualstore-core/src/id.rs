// Object name handling (DNS-1123 subdomain rules).
use std::sync::LazyLock;

use thiserror::Error;

/// Maximum length of an object name.
pub const MAX_NAME_LENGTH: usize = 253;

/// Number of random characters appended by [`generate_name`].
const GENERATED_SUFFIX_LENGTH: usize = 5;

static NAME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid name regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("name must not be empty")]
    Empty,
    #[error("name is {0} characters long, must be no more than 253")]
    TooLong(usize),
    #[error("invalid name '{0}': must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character")]
    Invalid(String),
}

/// Validates an object name.
pub fn validate_name(name: &str) -> Result<(), IdError> {
    if name.is_empty() {
        return Err(IdError::Empty);
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(IdError::TooLong(name.len()));
    }
    if !NAME_REGEX.is_match(name) {
        return Err(IdError::Invalid(name.to_string()));
    }
    Ok(())
}

/// Generates a name from a prefix by appending a short random suffix.
pub fn generate_name(prefix: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(GENERATED_SUFFIX_LENGTH)
        .collect();
    format!("{prefix}{suffix}")
}

pub fn generate_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}
