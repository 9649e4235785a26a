//! Seams between the engine and the geocoding services.
//!
//! HTTP implementations live in `geonorm-geocode`; tests use in-memory
//! fakes.

use crate::model::{Coordinate, ProviderId};

/// Error from a single provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Credentials rejected. Aborts the whole run.
    Auth(String),
    /// Connection, timeout, or TLS failure
    Transport(String),
    /// Non-success HTTP status or provider status string
    Status(String),
    /// Response body did not have the expected shape
    Parse(String),
}

impl ProviderError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status(msg) => write!(f, "unexpected status: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Forward geocoding: address text to a point.
pub trait Geocoder: Send + Sync {
    fn provider(&self) -> ProviderId;

    /// `Ok(None)` means the provider answered but found nothing.
    fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ProviderError>;
}

/// Reverse geocoding: a point to a formatted address.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse_geocode(&self, at: Coordinate) -> Result<Option<String>, ProviderError>;
}
