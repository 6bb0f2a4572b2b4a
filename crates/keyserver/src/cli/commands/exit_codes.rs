//! Exit code constants for CLI commands.

/// Successful operation.
pub const EXIT_SUCCESS: i32 = 0;

/// Any failure: configuration, I/O, an unreachable server or a non-2xx
/// response.
pub const EXIT_ERROR: i32 = 2;
