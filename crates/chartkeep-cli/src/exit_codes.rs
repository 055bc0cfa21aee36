//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - assembled bundle or values failed a structural check
pub const VALIDATION_ERROR: i32 = 2;

/// Not found - chart, version, artifact or values document is not stored
pub const NOT_FOUND: i32 = 3;

/// Composition error - values documents could not be fetched or merged
pub const COMPOSITION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Timeout - the operation deadline elapsed
pub const TIMEOUT: i32 = 6;

/// Network error - repository or archive download failed
pub const NETWORK_ERROR: i32 = 7;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
