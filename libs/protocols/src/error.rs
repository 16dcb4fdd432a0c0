//! Tracker error types
//!
//! Parsing and stitching never fail: their problems are reported as counts in
//! [`ParseSummary`](crate::parse::ParseSummary) and
//! [`RecordsWithErrorCount`](crate::RecordsWithErrorCount). The errors here
//! come from setting a tracker up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment source could not be read or merged
    #[error("Failed to load tracker configuration: {0}")]
    Load(#[from] config_crate::ConfigError),

    /// A value parsed but makes no sense for a tracker
    #[error("Invalid tracker configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
