use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ReconError;
use crate::template::Template;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: FormatConfig,
    #[serde(default)]
    pub normalize_address_digits: bool,
    /// Durable geocode cache. Defaults to a file next to the config.
    #[serde(default)]
    pub cache: Option<PathBuf>,
    #[serde(default)]
    pub api: ApiSettings,
}

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// Output columns in file order, each with its template.
///
/// Deserialized from a JSON object; key order is column order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Map<String, serde_json::Value>")]
pub struct FormatConfig {
    columns: Vec<(String, String)>,
}

pub const ADDRESS_COLUMN: &str = "address";
pub const PREFECTURE_COLUMN: &str = "prefecture";
pub const CITY_COLUMN: &str = "city";
pub const NOTE_COLUMN: &str = "note";

impl TryFrom<serde_json::Map<String, serde_json::Value>> for FormatConfig {
    type Error = String;

    fn try_from(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let columns = map
            .into_iter()
            .map(|(name, value)| match value {
                serde_json::Value::String(template) => Ok((name, template)),
                other => Err(format!("format.{name}: template must be a string, got {other}")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }
}

impl FormatConfig {
    pub fn new(columns: Vec<(String, String)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, template)| template.as_str())
    }

    /// CSV header: format keys, plus `note` when the format lacks it.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self.columns.iter().map(|(name, _)| name.clone()).collect();
        if self.get(NOTE_COLUMN).is_none() {
            header.push(NOTE_COLUMN.to_string());
        }
        header
    }

    /// True when any rendered column references `{lat}` or `{long}`.
    pub fn needs_coordinates(&self) -> bool {
        self.columns
            .iter()
            .filter(|(name, _)| name != ADDRESS_COLUMN)
            .any(|(_, template)| Template::parse(template).uses_coordinates())
    }

    /// 0-based input column named by the first `{N}` of the address template.
    pub fn address_column(&self) -> Option<usize> {
        self.get(ADDRESS_COLUMN)
            .and_then(|template| Template::parse(template).first_column())
    }
}

// ---------------------------------------------------------------------------
// API settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default)]
    pub key: Option<String>,
    /// Pause after every uncached provider call, in milliseconds.
    #[serde(default = "default_sleep_ms")]
    pub sleep: u64,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub reverse_geocode_check: bool,
    #[serde(default)]
    pub gsi_check: GsiCheck,
}

fn default_sleep_ms() -> u64 {
    200
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            key: None,
            sleep: default_sleep_ms(),
            mode: Mode::default(),
            reverse_geocode_check: false,
            gsi_check: GsiCheck::default(),
        }
    }
}

impl ApiSettings {
    /// The configured key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// How the two providers' answers are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Compare both coordinates; arbitrate by distance.
    #[default]
    Distance,
    /// Check the Google coordinate by reverse geocoding it.
    ReverseGeocode,
    /// Google if found, otherwise GSI.
    Simple,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Distance => write!(f, "distance"),
            Self::ReverseGeocode => write!(f, "reverse_geocode"),
            Self::Simple => write!(f, "simple"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GsiCheck {
    #[serde(default = "default_check")]
    pub check: bool,
    /// Disagreement threshold in meters.
    #[serde(default = "default_distance_m")]
    pub distance: f64,
    #[serde(default)]
    pub priority: Priority,
}

fn default_check() -> bool {
    true
}

fn default_distance_m() -> f64 {
    200.0
}

impl Default for GsiCheck {
    fn default() -> Self {
        Self {
            check: default_check(),
            distance: default_distance_m(),
            priority: Priority::default(),
        }
    }
}

/// Which provider wins when the two disagree beyond the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Gsi,
    Google,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gsi => write!(f, "gsi"),
            Self::Google => write!(f, "google"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl GeoConfig {
    /// Parse and validate in one step.
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let config = Self::parse(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize without validating, so callers can fill in the API key
    /// from the environment first.
    pub fn parse(input: &str) -> Result<Self, ReconError> {
        serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for required in [ADDRESS_COLUMN, PREFECTURE_COLUMN, CITY_COLUMN] {
            if self.format.get(required).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "format must define the '{required}' column"
                )));
            }
        }

        let distance = self.api.gsi_check.distance;
        if !distance.is_finite() || distance < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "api.gsi_check.distance must be a non-negative number of meters, got {distance}"
            )));
        }

        if self.format.needs_coordinates() && self.api.api_key().is_none() {
            return Err(ReconError::MissingApiKey);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
