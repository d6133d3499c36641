use thiserror::Error;

/// Failures inside the sync core.
///
/// Session operations never return these: each one is caught where it
/// happens, logged, and replaced by a safe default. Only conversions from
/// foreign input (`QueryMap::from_json`) hand them to the caller.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No addressable location (server or headless context).
    #[error("location unavailable")]
    Unavailable,

    /// The current location string is not a valid URL.
    #[error("malformed url {href:?}: {reason}")]
    MalformedUrl { href: String, reason: String },

    /// A value the query string cannot represent (objects, booleans).
    #[error("unsupported value: {0}")]
    Unsupported(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
