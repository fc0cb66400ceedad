//! Error types for pattern compilation and clause dispatch
//!
//! Construction errors are raised while a pattern or clause list is being
//! compiled; the no-match error is raised when every clause has been tried.
//! Nothing here is recovered internally: every error reaches the caller of
//! the dispatch entry point unchanged.

/// Result type for all matching operations
pub type MatchResult<T> = Result<T, MatchError>;

/// Error type for pattern compilation and dispatch
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("no matching clause (badarg)")]
    NoMatchingClause,

    #[error("unsupported pattern: {0}")]
    UnsupportedPattern(String),

    #[error("{0} pattern requires at least one alternative")]
    EmptyAlternatives(&'static str),

    #[error("clause {index} has a pattern but no handler")]
    MissingHandler { index: usize },

    #[error("expected a pattern at position {position}, found a handler")]
    UnexpectedHandler { position: usize },

    #[error("pattern nesting exceeds the configured limit of {limit}")]
    PatternTooDeep { limit: usize },

    #[error("unknown matcher kind: {0}")]
    UnknownMatcherKind(String),

    #[error("invalid argument for matcher '{kind}': {reason}")]
    InvalidMatcherArgument { kind: String, reason: String },

    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broad grouping of [`MatchError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A pattern or clause list was malformed
    Construction,
    /// Every clause was tried and none matched
    NoMatch,
    /// Configuration or input data could not be parsed
    Configuration,
}

impl MatchError {
    /// Create an unsupported-pattern error
    pub fn unsupported(what: impl Into<String>) -> Self {
        MatchError::UnsupportedPattern(what.into())
    }

    /// Create an invalid-argument error for a registered matcher kind
    pub fn invalid_argument(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        MatchError::InvalidMatcherArgument {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Get the category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            MatchError::NoMatchingClause => ErrorCategory::NoMatch,
            MatchError::Config(_) | MatchError::Json(_) => ErrorCategory::Configuration,
            MatchError::UnsupportedPattern(_)
            | MatchError::EmptyAlternatives(_)
            | MatchError::MissingHandler { .. }
            | MatchError::UnexpectedHandler { .. }
            | MatchError::PatternTooDeep { .. }
            | MatchError::UnknownMatcherKind(_)
            | MatchError::InvalidMatcherArgument { .. }
            | MatchError::InvalidRegex(_) => ErrorCategory::Construction,
        }
    }

    /// Check whether this is the no-match error
    pub fn is_no_match(&self) -> bool {
        matches!(self, MatchError::NoMatchingClause)
    }
}

impl From<toml::de::Error> for MatchError {
    fn from(err: toml::de::Error) -> Self {
        MatchError::Config(err.to_string())
    }
}
