//! `geonorm-recon` — dual-source geocoding reconciliation.
//!
//! Pure engine crate: the HTTP providers and the on-disk cache are injected
//! through the [`provider`] and [`cache`] traits. No CLI or network
//! dependencies.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod lookup;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod template;

pub use cache::{CacheError, GeocodeCache, MemoryCache};
pub use config::{ApiSettings, FormatConfig, GeoConfig, GsiCheck, Mode, Priority};
pub use engine::{Providers, Reconciler};
pub use error::ReconError;
pub use lookup::{CachedLookup, Throttle};
pub use model::{CacheKey, CachedValue, Coordinate, CoordinateResult, ProviderId, RunSummary, Source};
pub use pipeline::{RenderedRow, RowPipeline};
pub use provider::{Geocoder, ProviderError, ReverseGeocoder};
