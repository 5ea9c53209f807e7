use crate::error::{AppError, Result};

use super::{Config, QueryLimits};

/// One week; the backend's duplicate detector never looks back further.
const MAX_COOLDOWN_MINUTES: i64 = 7 * 24 * 60;

/// Validate a loaded configuration and surface every problem at once.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_limits(&config.limits, &mut issues);
    validate_endpoint(&config.endpoint, &mut issues);

    if config.timeout_secs == 0 {
        issues.push("timeout_secs must be greater than zero".to_string());
    }
    if config.history_file.as_os_str().is_empty() {
        issues.push("history_file must not be empty".to_string());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "configuration invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_limits(limits: &QueryLimits, issues: &mut Vec<String>) {
    if limits.row_limit == 0 {
        issues.push("limits.row_limit must be greater than zero".to_string());
    }
    if u64::from(limits.repeat_base) >= limits.row_limit {
        issues.push(format!(
            "limits.repeat_base {} must be smaller than limits.row_limit {}",
            limits.repeat_base, limits.row_limit
        ));
    }
    if limits.cooldown_minutes <= 0 {
        issues.push("limits.cooldown_minutes must be positive".to_string());
    } else if limits.cooldown_minutes > MAX_COOLDOWN_MINUTES {
        issues.push(format!(
            "limits.cooldown_minutes {} exceeds the maximum of {}",
            limits.cooldown_minutes, MAX_COOLDOWN_MINUTES
        ));
    }
}

// An empty endpoint is allowed so that offline commands (history) still work.
fn validate_endpoint(endpoint: &str, issues: &mut Vec<String>) {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return;
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        issues.push(format!("endpoint `{trimmed}` must be an http(s) URL"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_defaults() {
        validate_config(&Config::default()).expect("defaults should be valid");
    }

    #[test]
    fn rejects_base_not_below_row_limit() {
        let mut config = Config::default();
        config.limits.row_limit = 10;
        config.limits.repeat_base = 10;

        let err = validate_config(&config).expect_err("validation should fail");
        let message = err.to_string();
        assert!(
            message.contains("repeat_base"),
            "unexpected error message: {message}"
        );
    }

    #[test]
    fn rejects_out_of_range_cooldown() {
        let mut config = Config::default();
        config.limits.cooldown_minutes = i64::MAX;

        let message = validate_config(&config)
            .expect_err("validation should fail")
            .to_string();
        assert!(message.contains("exceeds the maximum"), "{message}");

        config.limits.cooldown_minutes = MAX_COOLDOWN_MINUTES;
        validate_config(&config).expect("a week is allowed");
        assert_eq!(config.limits.cooldown(), chrono::Duration::days(7));
    }

    #[test]
    fn aggregates_multiple_issues() {
        let mut config = Config::default();
        config.limits.cooldown_minutes = 0;
        config.endpoint = "ftp://example.org".to_string();
        config.timeout_secs = 0;

        let message = validate_config(&config)
            .expect_err("validation should fail")
            .to_string();
        assert!(message.contains("cooldown_minutes"), "{message}");
        assert!(message.contains("http(s) URL"), "{message}");
        assert!(message.contains("timeout_secs"), "{message}");
    }
}
