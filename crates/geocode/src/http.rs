//! Shared blocking HTTP plumbing for the provider clients.

use std::time::Duration;

use geonorm_recon::ProviderError;

pub(crate) const USER_AGENT: &str = concat!("geonorm/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_SECS: u64 = 30;

/// Blocking client plus the provider name used in error messages.
#[derive(Clone)]
pub(crate) struct HttpClient {
    http: reqwest::blocking::Client,
    source_name: &'static str,
    /// Whether 401/403 means bad credentials. Keyless sources get a
    /// recoverable status error instead.
    auth_is_fatal: bool,
}

impl HttpClient {
    pub(crate) fn new(source_name: &'static str, auth_is_fatal: bool) -> Result<Self, ProviderError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, source_name, auth_is_fatal })
    }

    /// GET `url` with `query` and decode the JSON body.
    ///
    /// 401/403 are credential failures for keyed sources; any other non-2xx
    /// is a status error.
    pub(crate) fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<serde_json::Value, ProviderError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|e| ProviderError::Transport(format!("{}: {e}", self.source_name)))?;

        let status = resp.status().as_u16();
        if self.auth_is_fatal && (status == 401 || status == 403) {
            let body = resp.text().unwrap_or_default();
            return Err(ProviderError::Auth(format!("{} auth failed ({status}): {body}", self.source_name)));
        }
        if !resp.status().is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ProviderError::Status(format!("{} HTTP {status}: {body}", self.source_name)));
        }

        resp.json::<serde_json::Value>()
            .map_err(|e| ProviderError::Parse(format!("{}: {e}", self.source_name)))
    }
}
