use std::fmt;

use crate::provider::ProviderError;

#[derive(Debug)]
pub enum ReconError {
    /// JSON parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing format column, bad threshold, etc.).
    ConfigValidation(String),
    /// Coordinate tokens are used but no API key is configured.
    MissingApiKey,
    /// The commercial provider rejected our credentials.
    ProviderAuth(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingApiKey => {
                write!(f, "an API key (api.key) is required to fill {{lat}} / {{long}} columns")
            }
            Self::ProviderAuth(msg) => write!(f, "geocoding provider rejected the API key: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<ProviderError> for ReconError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Auth(msg) => Self::ProviderAuth(msg),
            // Non-fatal errors are degraded by the lookup layer before they get here.
            other => Self::Io(other.to_string()),
        }
    }
}
