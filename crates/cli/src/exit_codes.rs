//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                                 |
//! |---------|------------------|---------------------------------------------|
//! | 0       | Universal        | Success                                     |
//! | 1       | Universal        | General error (unspecified)                 |
//! | 2       | Universal        | CLI usage error (bad args)                  |
//! | 3-4     | Input            | Reading or parsing record files             |
//! | 10-19   | analysis         | Configuration and batch outcome codes       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use curricula_analysis::AnalysisError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-4)
// =============================================================================

/// A records, config or output file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// A records file is not valid JSON or does not hold program records.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Analysis (10-19)
// =============================================================================

/// Configuration rejected (TOML syntax, weights not summing to 1.0,
/// thematic without keywords, unknown required field).
/// Raised before any program is analyzed.
pub const EXIT_INVALID_CONFIG: u8 = 10;

/// Batch completed but at least one program could not be analyzed.
/// Output is still written; failed programs appear as marker rows.
pub const EXIT_FAILED_PROGRAMS: u8 = 11;

/// Map an engine error to its exit code.
pub fn analysis_exit_code(err: &AnalysisError) -> u8 {
    if err.is_config() {
        return EXIT_INVALID_CONFIG;
    }
    match err {
        AnalysisError::InvalidRecord { .. } => EXIT_PARSE,
        _ => EXIT_ERROR,
    }
}

/// Structured error output for `--json` runs, printed to stderr.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub exit_code: u8,
}

impl ErrorOutput {
    pub fn print(&self) {
        if let Ok(output) = serde_json::to_string(self) {
            eprintln!("{}", output);
        }
    }
}
