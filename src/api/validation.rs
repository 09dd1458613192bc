use super::ApiError;

pub const MAX_ID_LENGTH: usize = 50;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_EVENT_LOG_LIMIT: u64 = 1;
pub const MAX_EVENT_LOG_LIMIT: u64 = 2000;

pub fn validate_user_id(user_id: &str) -> Result<&str, ApiError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("User ID cannot be empty"));
    }

    if trimmed.chars().count() > MAX_ID_LENGTH {
        return Err(ApiError::validation(format!(
            "User ID must be {MAX_ID_LENGTH} characters or less"
        )));
    }

    Ok(trimmed)
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }

    if trimmed.chars().count() > MAX_ID_LENGTH {
        return Err(ApiError::validation(format!(
            "Username must be {MAX_ID_LENGTH} characters or less"
        )));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(ApiError::validation("Username cannot contain whitespace"));
    }

    Ok(trimmed)
}

pub fn validate_organization(organization: Option<String>) -> Result<Option<String>, ApiError> {
    match organization {
        Some(org) if org.chars().count() > MAX_NAME_LENGTH => Err(ApiError::validation(format!(
            "Organization must be {MAX_NAME_LENGTH} characters or less"
        ))),
        other => Ok(other),
    }
}

/// Trims every entry and drops blanks and repeats, keeping the first occurrence.
pub fn normalize_names(kind: &str, names: &[String]) -> Result<Vec<String>, ApiError> {
    let mut normalized: Vec<String> = Vec::with_capacity(names.len());

    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_NAME_LENGTH {
            return Err(ApiError::validation(format!(
                "{kind} name must be {MAX_NAME_LENGTH} characters or less: {trimmed}"
            )));
        }
        if !normalized.iter().any(|n| n == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }

    Ok(normalized)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    if !(MIN_EVENT_LOG_LIMIT..=MAX_EVENT_LOG_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {MIN_EVENT_LOG_LIMIT} and {MAX_EVENT_LOG_LIMIT}"
        )));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert_eq!(validate_user_id("  alice ").unwrap(), "alice");
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_user_id(&"u".repeat(50)).is_ok());
        assert!(validate_user_id(&"u".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("mama").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_normalize_names() {
        let names = vec![
            " gpt-4o ".to_string(),
            String::new(),
            "gpt-4o".to_string(),
            "claude".to_string(),
        ];
        assert_eq!(
            normalize_names("Model", &names).unwrap(),
            vec!["gpt-4o".to_string(), "claude".to_string()]
        );
        assert!(normalize_names("Model", &["m".repeat(101)]).is_err());
    }

    #[test]
    fn test_validate_organization() {
        assert_eq!(validate_organization(None).unwrap(), None);
        let max = "o".repeat(MAX_NAME_LENGTH);
        assert_eq!(validate_organization(Some(max.clone())).unwrap(), Some(max));
        assert!(validate_organization(Some("o".repeat(MAX_NAME_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(2000).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(2001).is_err());
    }
}
