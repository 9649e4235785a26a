//! `geonorm-core` — Japanese address normalization.
//!
//! Pure text crate: kanji numeral reading, the canonical address pipeline,
//! and the fuzzy matcher used to sanity-check reverse geocoding. No IO.

pub mod canonical;
pub mod fuzzy;
pub mod numeral;

pub use canonical::{build_search_address, canonicalize, strip_jurisdiction, trim_cell};
pub use fuzzy::addresses_roughly_match;
pub use numeral::kanji_to_number;
