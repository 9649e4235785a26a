//! Google Geocoding API client (forward and reverse).

use tracing::debug;

use geonorm_recon::{Coordinate, Geocoder, ProviderError, ProviderId, ReverseGeocoder};

use crate::http::HttpClient;

pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const LANGUAGE: &str = "ja";

pub struct GoogleClient {
    client: HttpClient,
    api_key: String,
    url: String,
}

impl GoogleClient {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_url(api_key, GOOGLE_GEOCODE_URL.to_string())
    }

    /// Point the client at another endpoint (tests, proxies).
    pub fn with_url(api_key: String, url: String) -> Result<Self, ProviderError> {
        Ok(Self { client: HttpClient::new("Google", true)?, api_key, url })
    }

    fn request(&self, param: (&str, &str)) -> Result<Option<serde_json::Value>, ProviderError> {
        let body = self
            .client
            .get_json(&self.url, &[param, ("key", self.api_key.as_str()), ("language", LANGUAGE)])?;
        first_result(&body)
    }
}

/// Classify the `status` field and return the first result, if any.
fn first_result(body: &serde_json::Value) -> Result<Option<serde_json::Value>, ProviderError> {
    let status = body["status"].as_str().unwrap_or("");
    match status {
        "OK" => Ok(body["results"].as_array().and_then(|r| r.first()).cloned()),
        "ZERO_RESULTS" => Ok(None),
        "REQUEST_DENIED" => {
            let msg = body["error_message"].as_str().unwrap_or("request denied");
            Err(ProviderError::Auth(format!("Google REQUEST_DENIED: {msg}")))
        }
        "" => Err(ProviderError::Parse("Google response missing 'status'".into())),
        other => {
            let msg = body["error_message"].as_str().unwrap_or("");
            Err(ProviderError::Status(format!("Google {other} {msg}").trim_end().to_string()))
        }
    }
}

fn parse_location(result: &serde_json::Value) -> Result<Coordinate, ProviderError> {
    let location = &result["geometry"]["location"];
    match (location["lat"].as_f64(), location["lng"].as_f64()) {
        (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
        _ => Err(ProviderError::Parse("Google result missing geometry.location".into())),
    }
}

impl Geocoder for GoogleClient {
    fn provider(&self) -> ProviderId {
        ProviderId::Google
    }

    fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
        let Some(result) = self.request(("address", address))? else {
            debug!(address, "Google: no results");
            return Ok(None);
        };
        parse_location(&result).map(Some)
    }
}

impl ReverseGeocoder for GoogleClient {
    fn reverse_geocode(&self, at: Coordinate) -> Result<Option<String>, ProviderError> {
        let latlng = format!("{},{}", at.lat, at.lon);
        let Some(result) = self.request(("latlng", latlng.as_str()))? else {
            return Ok(None);
        };
        Ok(result["formatted_address"].as_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> GoogleClient {
        GoogleClient::with_url("test_key".into(), server.url("/maps/api/geocode/json")).unwrap()
    }

    #[test]
    fn geocode_returns_first_location() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/maps/api/geocode/json")
                .query_param("address", "東京都渋谷区神南1-2-3")
                .query_param("key", "test_key")
                .query_param("language", "ja");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "status": "OK",
                    "results": [
                        {"geometry": {"location": {"lat": 35.6618, "lng": 139.7041}}},
                        {"geometry": {"location": {"lat": 1.0, "lng": 2.0}}}
                    ]
                }));
        });

        let found = client(&server).geocode("東京都渋谷区神南1-2-3").unwrap();
        mock.assert();
        assert_eq!(found, Some(Coordinate::new(35.6618, 139.7041)));
    }

    #[test]
    fn zero_results_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!({"status": "ZERO_RESULTS", "results": []}));
        });
        assert_eq!(client(&server).geocode("nowhere").unwrap(), None);
    }

    #[test]
    fn request_denied_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            }));
        });
        let err = client(&server).geocode("x").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("The provided API key is invalid."), "{err}");
    }

    #[test]
    fn http_403_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(403).body("forbidden");
        });
        assert!(matches!(client(&server).geocode("x"), Err(ProviderError::Auth(_))));
    }

    #[test]
    fn over_query_limit_is_recoverable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!({"status": "OVER_QUERY_LIMIT"}));
        });
        let err = client(&server).geocode("x").unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, ProviderError::Status(_)));
    }

    #[test]
    fn server_error_and_garbage_are_recoverable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).query_param("address", "500");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).query_param("address", "garbage");
            then.status(200).body("<html>");
        });
        let c = client(&server);
        assert!(matches!(c.geocode("500"), Err(ProviderError::Status(_))));
        assert!(matches!(c.geocode("garbage"), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn reverse_geocode_returns_formatted_address() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).query_param("latlng", "35.6618,139.7041");
            then.status(200).json_body(serde_json::json!({
                "status": "OK",
                "results": [{"formatted_address": "日本、〒150-0041 東京都渋谷区神南１丁目２−３"}]
            }));
        });
        let found = client(&server).reverse_geocode(Coordinate::new(35.6618, 139.7041)).unwrap();
        mock.assert();
        assert_eq!(found.as_deref(), Some("日本、〒150-0041 東京都渋谷区神南１丁目２−３"));
    }
}
