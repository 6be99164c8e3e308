/// Error types for the machine translation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MtError {
    /// Missing or unusable provider configuration (API key, endpoint)
    ConfigError(String),
    /// Transport failure talking to the provider
    NetworkError(String),
    /// The provider answered, but not with a usable translation
    TranslationError(String),
    /// Locale code that cannot be sent to a provider
    InvalidLocale(String),
}

impl std::fmt::Display for MtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MtError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            MtError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            MtError::TranslationError(msg) => write!(f, "Translation error: {}", msg),
            MtError::InvalidLocale(msg) => write!(f, "Invalid locale: {}", msg),
        }
    }
}

impl std::error::Error for MtError {}

impl From<reqwest::Error> for MtError {
    fn from(e: reqwest::Error) -> Self {
        MtError::NetworkError(e.to_string())
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;
