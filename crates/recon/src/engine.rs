use std::sync::Arc;

use tracing::{debug, warn};

use geonorm_core::addresses_roughly_match;

use crate::config::{ApiSettings, Mode, Priority};
use crate::error::ReconError;
use crate::geo::distance_m;
use crate::lookup::CachedLookup;
use crate::model::{Coordinate, CoordinateResult, Source, SUSPECT_NOTE};
use crate::provider::{Geocoder, ProviderError, ReverseGeocoder};

/// The three provider operations the reconciler can call.
pub struct Providers {
    pub google: Box<dyn Geocoder>,
    pub gsi: Box<dyn Geocoder>,
    pub reverse: Box<dyn ReverseGeocoder>,
}

/// Decides one coordinate per search address.
pub struct Reconciler {
    settings: ApiSettings,
    providers: Providers,
    lookup: Arc<CachedLookup>,
}

impl Reconciler {
    pub fn new(settings: ApiSettings, providers: Providers, lookup: Arc<CachedLookup>) -> Self {
        Self { settings, providers, lookup }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn lookup(&self) -> &CachedLookup {
        &self.lookup
    }

    /// Run the configured reconciliation policy for one search address.
    ///
    /// Provider lookups are made lazily; each goes through the shared cache.
    pub fn reconcile(&self, search_address: &str) -> Result<CoordinateResult, ReconError> {
        let result = match self.settings.mode {
            Mode::Distance => self.by_distance(search_address)?,
            Mode::ReverseGeocode if self.settings.reverse_geocode_check => {
                self.by_reverse_geocode(search_address)?
            }
            Mode::ReverseGeocode | Mode::Simple => self.google_then_gsi(search_address)?,
        };
        debug!(address = search_address, source = %result.source, note = %result.note(), "reconciled");
        Ok(result)
    }

    fn google(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
        self.lookup.geocode(self.providers.google.as_ref(), address)
    }

    fn gsi(&self, address: &str) -> Result<Option<Coordinate>, ProviderError> {
        self.lookup.geocode(self.providers.gsi.as_ref(), address)
    }

    fn by_distance(&self, address: &str) -> Result<CoordinateResult, ProviderError> {
        let google = self.google(address)?;
        let gsi = self.gsi(address)?;

        let (google, gsi) = match (google, gsi) {
            (None, None) => return Ok(CoordinateResult::unresolved(SUSPECT_NOTE)),
            (Some(g), None) => return Ok(CoordinateResult::accepted(g, Source::Google)),
            (None, Some(s)) => return Ok(CoordinateResult::accepted(s, Source::Gsi)),
            (Some(g), Some(s)) => (g, s),
        };

        let check = &self.settings.gsi_check;
        let distance = distance_m(google, gsi);
        if check.check && distance >= check.distance {
            let note = format!("{SUSPECT_NOTE}: providers disagree by {distance:.0} m");
            warn!(address, distance_m = distance, priority = %check.priority, "providers disagree");
            return Ok(match check.priority {
                Priority::Gsi => CoordinateResult::suspect(gsi, Source::Gsi, note),
                Priority::Google => CoordinateResult::suspect(google, Source::Google, note),
            });
        }

        // Agreement (or no check): Google wins regardless of priority.
        Ok(CoordinateResult::accepted(google, Source::Google))
    }

    fn by_reverse_geocode(&self, address: &str) -> Result<CoordinateResult, ProviderError> {
        let Some(google) = self.google(address)? else {
            return self.gsi_or_unresolved(address, SUSPECT_NOTE.to_string());
        };

        let reversed = self.lookup.reverse_geocode(self.providers.reverse.as_ref(), google)?;
        let note = match reversed.as_deref() {
            Some(found) if addresses_roughly_match(address, found) => {
                return Ok(CoordinateResult::accepted(google, Source::Google));
            }
            Some(found) => format!("{SUSPECT_NOTE}: reverse geocode gave {found}"),
            None => format!("{SUSPECT_NOTE}: reverse geocode failed"),
        };
        warn!(address, reversed = ?reversed, "reverse geocode does not match");
        self.gsi_or_unresolved(address, note)
    }

    fn gsi_or_unresolved(&self, address: &str, note: String) -> Result<CoordinateResult, ProviderError> {
        Ok(match self.gsi(address)? {
            Some(s) => CoordinateResult::suspect(s, Source::Gsi, note),
            None => CoordinateResult::unresolved(note),
        })
    }

    fn google_then_gsi(&self, address: &str) -> Result<CoordinateResult, ProviderError> {
        if let Some(g) = self.google(address)? {
            return Ok(CoordinateResult::accepted(g, Source::Google));
        }
        Ok(match self.gsi(address)? {
            Some(s) => CoordinateResult::accepted(s, Source::Gsi),
            None => CoordinateResult::unresolved(SUSPECT_NOTE),
        })
    }
}
