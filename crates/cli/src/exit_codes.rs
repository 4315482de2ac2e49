//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success                                       |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | CLI usage error (bad args, missing region)    |
//! | 3-9     | recon     | Config, input, model and drift codes          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for`

use asbuilt_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required inputs.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// Config file unreadable, unparseable or failing validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// Scan directory, region cloud or output path could not be read or written.
pub const EXIT_RECON_IO: u8 = 4;

/// Model document malformed or internally inconsistent.
pub const EXIT_RECON_MODEL: u8 = 5;

/// Engine failure during a run (empty cloud, store mutation).
pub const EXIT_RECON_RUNTIME: u8 = 6;

/// `check --fail-on-drift`: the model disagrees with the scans.
pub const EXIT_RECON_DRIFT: u8 = 7;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingRegion => EXIT_USAGE,
        ReconError::Io(_) => EXIT_RECON_IO,
        ReconError::ModelFormat(_)
        | ReconError::UnknownFloor(_)
        | ReconError::DuplicateElement(_) => EXIT_RECON_MODEL,
        ReconError::EmptyPointSet { .. } | ReconError::UnknownElement(_) => EXIT_RECON_RUNTIME,
    }
}
