//! Per-row orchestration: extract → canonicalize → reconcile once → render.

use tracing::info;

use geonorm_core::{build_search_address, canonicalize, trim_cell};

use crate::config::{FormatConfig, GeoConfig, ADDRESS_COLUMN, CITY_COLUMN, NOTE_COLUMN, PREFECTURE_COLUMN};
use crate::engine::Reconciler;
use crate::error::ReconError;
use crate::model::{CoordinateResult, RunSummary};
use crate::template::Template;

#[derive(Debug, Clone)]
enum Column {
    /// The row's address, canonicalized when digit normalization is on.
    Address,
    /// The reconciliation note.
    Note,
    Template(Template),
}

/// One output row plus the decision that filled its coordinate columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub values: Vec<String>,
    pub result: CoordinateResult,
}

pub struct RowPipeline {
    header: Vec<String>,
    columns: Vec<Column>,
    address_index: Option<usize>,
    prefecture: Template,
    city: Template,
    normalize_digits: bool,
    reconciler: Option<Reconciler>,
    rows_seen: usize,
    summary: RunSummary,
}

impl RowPipeline {
    /// `reconciler` may be `None` only when no column uses `{lat}`/`{long}`.
    pub fn new(config: &GeoConfig, reconciler: Option<Reconciler>) -> Result<Self, ReconError> {
        let format = &config.format;
        let reconciler = if format.needs_coordinates() {
            Some(reconciler.ok_or(ReconError::MissingApiKey)?)
        } else {
            None
        };

        let template = |name: &str| -> Result<Template, ReconError> {
            format
                .get(name)
                .map(Template::parse)
                .ok_or_else(|| ReconError::ConfigValidation(format!("format must define the '{name}' column")))
        };

        Ok(Self {
            header: format.header(),
            columns: columns(format),
            address_index: format.address_column(),
            prefecture: template(PREFECTURE_COLUMN)?,
            city: template(CITY_COLUMN)?,
            normalize_digits: config.normalize_address_digits,
            reconciler,
            rows_seen: 0,
            summary: RunSummary::default(),
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn reconciler(&self) -> Option<&Reconciler> {
        self.reconciler.as_ref()
    }

    /// The address value written to the `address` column.
    pub fn address_for(&self, row: &[String]) -> String {
        let raw = self
            .address_index
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("");
        if self.normalize_digits {
            canonicalize(raw)
        } else {
            trim_cell(raw).to_string()
        }
    }

    /// Process one input row. Only provider auth failures are errors.
    pub fn process(&mut self, row: &[String]) -> Result<RenderedRow, ReconError> {
        self.rows_seen += 1;
        info!(row = self.rows_seen, "processing row {}", self.rows_seen);

        let address = self.address_for(row);
        let result = match &self.reconciler {
            Some(reconciler) => {
                let prefecture = self.prefecture.render(row, &CoordinateResult::empty());
                let city = self.city.render(row, &CoordinateResult::empty());
                let search = build_search_address(&address, &prefecture, &city);
                let result = reconciler.reconcile(&search)?;
                self.summary.record(&result);
                result
            }
            None => {
                self.summary.rows += 1;
                CoordinateResult::empty()
            }
        };

        let values = self
            .columns
            .iter()
            .map(|column| match column {
                Column::Address => address.clone(),
                Column::Note => result.note(),
                Column::Template(template) => template.render(row, &result),
            })
            .collect();

        Ok(RenderedRow { values, result })
    }
}

fn columns(format: &FormatConfig) -> Vec<Column> {
    let mut columns: Vec<Column> = format
        .columns()
        .iter()
        .map(|(name, template)| match name.as_str() {
            ADDRESS_COLUMN => Column::Address,
            NOTE_COLUMN => Column::Note,
            _ => Column::Template(Template::parse(template)),
        })
        .collect();
    if format.get(NOTE_COLUMN).is_none() {
        columns.push(Column::Note);
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::cache::MemoryCache;
    use crate::engine::Providers;
    use crate::lookup::{CachedLookup, Throttle};
    use crate::model::{Coordinate, ProviderId, Source};
    use crate::provider::{Geocoder, ProviderError, ReverseGeocoder};

    struct Recording {
        id: ProviderId,
        answer: Option<Coordinate>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Geocoder for Recording {
        fn provider(&self) -> ProviderId {
            self.id
        }

        fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
            self.seen.lock().unwrap().push(address.to_string());
            Ok(self.answer)
        }
    }

    struct NoReverse(AtomicUsize);

    impl ReverseGeocoder for NoReverse {
        fn reverse_geocode(&self, _at: Coordinate) -> Result<Option<String>, ProviderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    const CONFIG: &str = r#"{
        "input": "in.csv",
        "output": "out.csv",
        "format": {
            "prefecture": "東京都",
            "city": "渋谷区",
            "address": "{3}",
            "name": "{1}",
            "lat": "{lat}",
            "long": "{long}"
        },
        "normalize_address_digits": true,
        "api": {"key": "k", "sleep": 0}
    }"#;

    fn pipeline(config: &str, google: Option<Coordinate>, gsi: Option<Coordinate>) -> (RowPipeline, Arc<Mutex<Vec<String>>>) {
        let config = GeoConfig::from_json(config).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let providers = Providers {
            google: Box::new(Recording { id: ProviderId::Google, answer: google, seen: seen.clone() }),
            gsi: Box::new(Recording { id: ProviderId::Gsi, answer: gsi, seen: seen.clone() }),
            reverse: Box::new(NoReverse(AtomicUsize::new(0))),
        };
        let lookup = Arc::new(CachedLookup::new(Arc::new(MemoryCache::new()), Throttle::from_millis(0)));
        let reconciler = Reconciler::new(config.api.clone(), providers, lookup);
        (RowPipeline::new(&config, Some(reconciler)).unwrap(), seen)
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_appends_note() {
        let (p, _) = pipeline(CONFIG, None, None);
        assert_eq!(p.header(), ["prefecture", "city", "address", "name", "lat", "long", "note"]);
    }

    #[test]
    fn row_is_rendered_with_one_reconciliation() {
        let c = Coordinate::new(35.6618, 139.7041);
        let (mut p, seen) = pipeline(CONFIG, Some(c), Some(c));
        let out = p
            .process(&row(&[" 渋谷タワー ", "x", "東京都渋谷区神南一丁目二番三号 ３F"]))
            .unwrap();

        assert_eq!(
            out.values,
            ["東京都", "渋谷区", "東京都渋谷区神南1-2-3", "渋谷タワー", "35.6618", "139.7041", ""]
        );
        assert_eq!(out.result.source, Source::Google);
        // One Google and one GSI call, both with the full search address.
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, ["東京都渋谷区神南1-2-3", "東京都渋谷区神南1-2-3"]);
    }

    #[test]
    fn search_address_gets_jurisdiction_prefix() {
        let (mut p, seen) = pipeline(CONFIG, None, None);
        p.process(&row(&["a", "b", "神南1-2-3"])).unwrap();
        assert_eq!(seen.lock().unwrap()[0], "東京都渋谷区神南1-2-3");
    }

    #[test]
    fn unresolved_row_carries_note() {
        let (mut p, _) = pipeline(CONFIG, None, None);
        let out = p.process(&row(&["a", "b", "神南1-2-3"])).unwrap();
        assert_eq!(out.values[4], "");
        assert_eq!(out.values[5], "");
        assert_eq!(out.values[6], "coordinates look suspect");
        assert_eq!(p.summary().unresolved, 1);
    }

    #[test]
    fn short_row_renders_empty_columns() {
        let (mut p, _) = pipeline(CONFIG, None, None);
        let out = p.process(&row(&["only"])).unwrap();
        assert_eq!(out.values[2], "");
        assert_eq!(out.values[3], "only");
    }

    #[test]
    fn address_is_only_trimmed_without_digit_normalization() {
        let config = CONFIG.replace(r#""normalize_address_digits": true"#, r#""normalize_address_digits": false"#);
        let (p, _) = pipeline(&config, None, None);
        assert_eq!(p.address_for(&row(&["", "", "\u{3000}神南一丁目 "])), "神南一丁目");
    }

    #[test]
    fn no_coordinate_columns_means_no_lookups() {
        let config = GeoConfig::from_json(
            r#"{"input":"i","output":"o","format":{"prefecture":"東京都","city":"渋谷区","address":"{1}"}}"#,
        )
        .unwrap();
        let mut p = RowPipeline::new(&config, None).unwrap();
        assert!(p.reconciler().is_none());
        let out = p.process(&row(&["神南１−２−３"])).unwrap();
        assert_eq!(out.values, ["東京都", "渋谷区", "神南１−２−３", ""]);
        assert_eq!(out.result, CoordinateResult::empty());
        assert_eq!(p.summary().rows, 1);
    }

    #[test]
    fn coordinate_columns_require_a_reconciler() {
        let config = GeoConfig::from_json(CONFIG).unwrap();
        assert!(matches!(RowPipeline::new(&config, None), Err(ReconError::MissingApiKey)));
    }
}
