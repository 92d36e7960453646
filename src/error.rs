//! Error types for the dispatcher.

use thiserror::Error;

/// Result type alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the dispatcher.
#[derive(Error, Debug)]
pub enum Error {
    /// Hash ring errors.
    #[error("ring error: {0}")]
    Ring(#[from] RingError),

    /// Instance or consumer catalog errors.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resync transport errors.
    #[error("resync transport error: {0}")]
    Transport(String),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
}

/// Hash ring errors.
#[derive(Error, Debug)]
pub enum RingError {
    /// The ring has no members; no key can be located.
    #[error("hash ring is empty")]
    Empty,
}

/// Errors returned by the instance and consumer catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog backend could not serve the listing.
    #[error("listing unavailable: {0}")]
    Unavailable(String),

    /// The listing did not complete in time.
    #[error("listing timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(RingError::Empty);
        assert_eq!(err.to_string(), "ring error: hash ring is empty");

        let err = Error::from(CatalogError::Unavailable("db down".into()));
        assert_eq!(err.to_string(), "catalog error: listing unavailable: db down");
    }
}
