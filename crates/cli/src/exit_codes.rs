//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                   |
//! |------|-----------|-----------------------------------------------|
//! | 0    | Universal | Success                                       |
//! | 1    | Universal | General error (unspecified)                   |
//! | 2    | Universal | Usage error, unreadable/unwritable file       |
//! | 3    | run       | Invalid config (parse, unknown enum, columns) |
//! | 4    | run       | Coordinate columns used but no API key        |
//! | 5    | run       | Geocoding provider rejected the API key       |
//! | 6    | concat    | Empty input file or header mismatch           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use geonorm_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unwritable files.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// run / validate (3-5)
// =============================================================================

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// `{lat}` / `{long}` used without `api.key` or `GEONORM_API_KEY`.
pub const EXIT_MISSING_API_KEY: u8 = 4;

/// Google answered REQUEST_DENIED or HTTP 401/403.
pub const EXIT_PROVIDER_AUTH: u8 = 5;

// =============================================================================
// concat (6)
// =============================================================================

/// A part file is empty or its header differs from the expected one.
pub const EXIT_CONCAT_INPUT: u8 = 6;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingApiKey => EXIT_MISSING_API_KEY,
        ReconError::ProviderAuth(_) => EXIT_PROVIDER_AUTH,
        ReconError::Io(_) => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_MISSING_API_KEY,
            EXIT_PROVIDER_AUTH,
            EXIT_CONCAT_INPUT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn recon_errors_map_to_registry() {
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(recon_exit_code(&ReconError::MissingApiKey), EXIT_MISSING_API_KEY);
        assert_eq!(recon_exit_code(&ReconError::ProviderAuth("denied".into())), EXIT_PROVIDER_AUTH);
    }
}
