//! Public error type: a small `thiserror`-derived enum of library-local
//! error kinds with one `#[error("...")]` message each.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Malformed images, `n < 1`, non-positive width/height, or
    /// `max_attempts < 1`.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Presets alone (no randomness involved) leave no consistent wave.
    #[error("unsatisfiable: presets leave no consistent wave")]
    Unsatisfiable,
}
