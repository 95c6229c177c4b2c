use thiserror::Error;

/// Unified error type for the staging map.
///
/// Every error is returned before any shared state is touched, so a failed
/// call has no effect on the map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed index set, out-of-range index, double fill of a slot,
    /// mismatched index/value counts, or a key that is already staged.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A single tuple is larger than the configured memory limit.
    #[error(
        "Resource exhausted: attempted to insert tuple of {bytes} bytes into \
         staging area with a memory limit of {limit} bytes"
    )]
    ResourceExhausted { bytes: usize, limit: usize },
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// True for `InvalidArgument`.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// True for `ResourceExhausted`.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Error::ResourceExhausted { .. })
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
