//! Custom validation functions for configuration.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static DIRECTIVE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_:]*=)?(?i:off|error|warn|info|debug|trace)$").ok()
});

/// Accepts `tracing` filter directives such as `info` or
/// `nostime_core=debug,warn`: comma-separated `target=level` or `level`
/// entries.
pub fn validate_log_filter(filter: &str) -> Result<(), ValidationError> {
    let directive = DIRECTIVE
        .as_ref()
        .ok_or_else(|| ValidationError::new("invalid_regex"))?;

    if !filter.is_empty() && filter.split(',').all(|d| directive.is_match(d.trim())) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}
