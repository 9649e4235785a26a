//! GSI (国土地理院) address search client.
//!
//! The endpoint answers with a GeoJSON feature array; coordinates are
//! `[lon, lat]`. No key is needed.

use tracing::debug;

use geonorm_recon::{Coordinate, Geocoder, ProviderError, ProviderId};

use crate::http::HttpClient;

pub const GSI_SEARCH_URL: &str = "https://msearch.gsi.go.jp/address-search/AddressSearch";

pub struct GsiClient {
    client: HttpClient,
    url: String,
}

impl GsiClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_url(GSI_SEARCH_URL.to_string())
    }

    pub fn with_url(url: String) -> Result<Self, ProviderError> {
        Ok(Self { client: HttpClient::new("GSI", false)?, url })
    }
}

fn parse_features(body: &serde_json::Value) -> Result<Option<Coordinate>, ProviderError> {
    let features = body
        .as_array()
        .ok_or_else(|| ProviderError::Parse("GSI response is not a feature array".into()))?;
    let Some(first) = features.first() else {
        return Ok(None);
    };
    let coordinates = &first["geometry"]["coordinates"];
    match (coordinates[0].as_f64(), coordinates[1].as_f64()) {
        (Some(lon), Some(lat)) => Ok(Some(Coordinate::new(lat, lon))),
        _ => Err(ProviderError::Parse("GSI feature missing geometry.coordinates".into())),
    }
}

impl Geocoder for GsiClient {
    fn provider(&self) -> ProviderId {
        ProviderId::Gsi
    }

    fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
        let body = self.client.get_json(&self.url, &[("q", address)])?;
        let found = parse_features(&body)?;
        if found.is_none() {
            debug!(address, "GSI: no features");
        }
        Ok(found)
    }
}
