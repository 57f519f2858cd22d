//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `rmerge` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                   |
//! |---------|------------|-----------------------------------------------|
//! | 0       | Universal  | Success                                       |
//! | 1       | Universal  | General error (unspecified)                   |
//! | 2       | Universal  | CLI usage error (bad args, unknown column)    |
//! | 3       | Universal  | Local file I/O (`--input`, `--output`, load)  |
//! | 10-19   | session    | Session store codes                           |
//! | 20-29   | pairs      | Merge configuration codes                     |
//! | 30-39   | service    | Upload / merge service codes                  |
//! | 40-49   | export     | CSV export codes                              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use rostermerge_client::ClientError;
use rostermerge_config::SessionError;
use rostermerge_recon::ReconError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, index out of range, unknown column.
pub const EXIT_USAGE: u8 = 2;

/// Local file could not be read, parsed or written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Session (10-19)
// =============================================================================

/// Session directory could not be read or written.
pub const EXIT_SESSION_IO: u8 = 10;

/// A session entry holds data that does not decode.
pub const EXIT_SESSION_CORRUPT: u8 = 11;

/// A required dataset was never uploaded in this session.
pub const EXIT_SESSION_MISSING_DATA: u8 = 12;

// =============================================================================
// Pairs (20-29)
// =============================================================================

/// No complete merge pair: reconciliation refused before any request.
pub const EXIT_PAIRS_NONE_VALID: u8 = 20;

// =============================================================================
// Service (30-39)
// =============================================================================

/// Service unreachable (connection refused, reset, timeout).
pub const EXIT_SERVICE_NETWORK: u8 = 30;

/// Service answered with a non-success status.
pub const EXIT_SERVICE_HTTP: u8 = 31;

/// Service answered 2xx with a body that does not decode.
pub const EXIT_SERVICE_PARSE: u8 = 32;

/// Input rejected (400/422, or wrong file type caught locally).
pub const EXIT_SERVICE_REJECTED: u8 = 33;

// =============================================================================
// Export (40-49)
// =============================================================================

/// A category file could not be written.
pub const EXIT_EXPORT_FAILED: u8 = 40;

// =============================================================================
// Error mapping
// =============================================================================

/// Map a SessionError to its exit code.
pub fn session_exit_code(err: &SessionError) -> u8 {
    match err {
        SessionError::InvalidKey(_) => EXIT_ERROR,
        SessionError::Io { .. } => EXIT_SESSION_IO,
        SessionError::Corrupt { .. } => EXIT_SESSION_CORRUPT,
        SessionError::Serialize { .. } => EXIT_ERROR,
    }
}

/// Map a ClientError to its exit code.
pub fn client_exit_code(err: &ClientError) -> u8 {
    match err {
        ClientError::Network(_) => EXIT_SERVICE_NETWORK,
        ClientError::Http(_, _) => EXIT_SERVICE_HTTP,
        ClientError::Parse(_) => EXIT_SERVICE_PARSE,
        ClientError::Io(_) => EXIT_IO,
        ClientError::Validation(_) => EXIT_SERVICE_REJECTED,
    }
}

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Session(e) => session_exit_code(e),
        ReconError::NoValidPairs => EXIT_PAIRS_NONE_VALID,
        ReconError::Export { .. } => EXIT_EXPORT_FAILED,
        ReconError::Io(_) => EXIT_EXPORT_FAILED,
    }
}
