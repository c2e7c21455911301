//! Semantic checks that TOML parsing alone cannot express.

use std::fmt;

use crate::schema::FastRecallConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path of the offending key, e.g. `cache.capacity`.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate(config: &FastRecallConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut push = |severity, field, message: &str| {
        out.push(Diagnostic {
            severity,
            field,
            message: message.to_string(),
        })
    };

    if config.search.default_limit == 0 {
        push(Severity::Error, "search.default_limit", "must be at least 1");
    }
    if config.search.max_limit == 0 {
        push(Severity::Error, "search.max_limit", "must be at least 1");
    }
    if config.search.default_limit > config.search.max_limit {
        push(
            Severity::Warning,
            "search.default_limit",
            "exceeds search.max_limit and will be clamped",
        );
    }
    if config.cache.capacity == 0 {
        push(Severity::Error, "cache.capacity", "must be at least 1");
    }
    if config.cache.max_age_secs == 0 {
        push(
            Severity::Warning,
            "cache.max_age_secs",
            "is 0; cached results expire immediately",
        );
    }
    if config.import.extensions.is_empty() {
        push(
            Severity::Warning,
            "import.extensions",
            "is empty; import will not pick up any file",
        );
    }

    out
}
