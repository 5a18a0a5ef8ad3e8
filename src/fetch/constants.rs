//! Constants for the fetch module (timeouts).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Upper bound accepted for the optional whole-request deadline (1 hour).
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;
