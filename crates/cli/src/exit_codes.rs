//! CLI Exit Code Registry
//!
//! Single source of truth for `mbook` exit codes. Scripts rely on these.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (output could not be written, etc.)         |
//! | 2    | Usage error (bad arguments, unreadable argument file)     |
//! | 3    | Invalid matching config                                   |
//! | 4    | Input exceeds a size limit (rows or comparisons)          |
//! | 5    | Source or request could not be read or parsed             |
//! | 6    | Unmatched transactions remain (`--fail-on-unmatched`)     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `recon_exit_code` if it comes from an engine error

use matchbook_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing file named on the command line.
pub const EXIT_USAGE: u8 = 2;

/// Matching config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Run rejected before matching: too many rows or comparisons.
pub const EXIT_SIZE_LIMIT: u8 = 4;

/// A source CSV, staged file or request document could not be read.
pub const EXIT_INPUT: u8 = 5;

/// Run succeeded but left transactions unmatched and the caller asked to fail on that.
pub const EXIT_UNMATCHED: u8 = 6;

/// Exit code for an engine error.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::TooManyComparisons { .. } | ReconError::TooManyRows { .. } => EXIT_SIZE_LIMIT,
        ReconError::RequestParse(_) | ReconError::Csv { .. } | ReconError::StagedFetch { .. } => {
            EXIT_INPUT
        }
    }
}
