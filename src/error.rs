use thiserror::Error;

use crate::Bias;

/// Errors returned by set operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Two replicas resolve add/remove ties differently and cannot be merged.
    #[error("cannot merge sets with different biases: local is {local}, remote is {remote}")]
    BiasMismatch {
        /// Bias of the set being merged into.
        local: Bias,
        /// Bias of the set being merged from.
        remote: Bias,
    },

    /// A configuration value did not name a bias.
    #[error("unknown bias {0:?}, expected \"add\" or \"remove\"")]
    UnknownBias(String),
}

/// Result type for set operations.
pub type Result<T> = std::result::Result<T, Error>;
