use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Which provider's coordinate ended up in the output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Google,
    Gsi,
    None,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Gsi => write!(f, "gsi"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Note attached whenever a row's coordinate should be double-checked.
pub const SUSPECT_NOTE: &str = "coordinates look suspect";

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// The single coordinate decision for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateResult {
    pub coordinate: Option<Coordinate>,
    pub source: Source,
    pub notes: Vec<String>,
}

impl CoordinateResult {
    /// No lookup was made (the format has no coordinate columns).
    pub fn empty() -> Self {
        Self { coordinate: None, source: Source::None, notes: Vec::new() }
    }

    pub fn accepted(coordinate: Coordinate, source: Source) -> Self {
        Self { coordinate: Some(coordinate), source, notes: Vec::new() }
    }

    pub fn suspect(coordinate: Coordinate, source: Source, note: impl Into<String>) -> Self {
        Self { coordinate: Some(coordinate), source, notes: vec![note.into()] }
    }

    /// Neither provider produced a usable coordinate.
    pub fn unresolved(note: impl Into<String>) -> Self {
        Self { coordinate: None, source: Source::None, notes: vec![note.into()] }
    }

    pub fn lat(&self) -> Option<f64> {
        self.coordinate.map(|c| c.lat)
    }

    pub fn lon(&self) -> Option<f64> {
        self.coordinate.map(|c| c.lon)
    }

    pub fn is_suspect(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Value of the `note` output column.
    pub fn note(&self) -> String {
        self.notes.join("; ")
    }
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

/// Namespace of a cached lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderId {
    Google,
    Gsi,
    GoogleReverse,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Gsi => "gsi",
            Self::GoogleReverse => "google_reverse",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key = (provider, exact lookup input).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub provider: ProviderId,
    pub key: String,
}

impl CacheKey {
    pub fn new(provider: ProviderId, key: impl Into<String>) -> Self {
        Self { provider, key: key.into() }
    }

    /// Key for a reverse lookup. Full precision so distinct points never
    /// share an entry.
    pub fn reverse(at: Coordinate) -> Self {
        Self::new(ProviderId::GoogleReverse, format!("{},{}", at.lat, at.lon))
    }
}

/// A cached provider answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Coordinate(Coordinate),
    Address(String),
    NotFound,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub google: usize,
    pub gsi: usize,
    pub unresolved: usize,
    pub suspect: usize,
}

impl RunSummary {
    pub fn record(&mut self, result: &CoordinateResult) {
        self.rows += 1;
        match (result.source, result.coordinate) {
            (Source::Google, Some(_)) => self.google += 1,
            (Source::Gsi, Some(_)) => self.gsi += 1,
            _ => self.unresolved += 1,
        }
        if result.is_suspect() {
            self.suspect += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_joins_accumulated_entries() {
        let mut result = CoordinateResult::unresolved(SUSPECT_NOTE);
        assert_eq!(result.note(), SUSPECT_NOTE);
        result.notes.push("second".into());
        assert_eq!(result.note(), "coordinates look suspect; second");
    }

    #[test]
    fn reverse_key_keeps_full_precision() {
        let key = CacheKey::reverse(Coordinate::new(35.6581234, 139.7017));
        assert_eq!(key.provider, ProviderId::GoogleReverse);
        assert_eq!(key.key, "35.6581234,139.7017");
    }

    #[test]
    fn summary_counts_sources() {
        let mut summary = RunSummary::default();
        summary.record(&CoordinateResult::accepted(Coordinate::new(35.0, 139.0), Source::Google));
        summary.record(&CoordinateResult::suspect(Coordinate::new(35.0, 139.0), Source::Gsi, SUSPECT_NOTE));
        summary.record(&CoordinateResult::unresolved(SUSPECT_NOTE));
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.google, 1);
        assert_eq!(summary.gsi, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.suspect, 2);
    }
}
