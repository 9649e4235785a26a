//! `geonorm-geocode` — network providers and durable cache.
//!
//! Blocking reqwest clients (no Tokio runtime required) for the Google
//! Geocoding API and the GSI address search, plus the SQLite-backed
//! [`SqliteCache`]. Everything here plugs into the traits defined in
//! `geonorm-recon`.

mod http;

pub mod google;
pub mod gsi;
pub mod sqlite_cache;

pub use google::GoogleClient;
pub use gsi::GsiClient;
pub use sqlite_cache::{CacheStats, SqliteCache, DEFAULT_CACHE_FILE};
