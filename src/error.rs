//! Typed failures returned by the quiz core.
//!
//! Only the Strict parsing path, the sampler and the scorer return these.
//! FreeText parsing never fails; its anomalies are reported as
//! [`crate::reference::RangeWarning`] values instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// No canonical book matched the input.
    #[error("unknown book: {0:?}")]
    UnknownBook(String),

    /// More than one canonical book matched at the same matching stage.
    #[error("ambiguous book {input:?}: could be {}", candidates.join(", "))]
    AmbiguousBook {
        input: String,
        candidates: Vec<String>,
    },

    /// Strict-mode input is not shaped like `<book> <chapter>:<verse>`.
    #[error("expected a reference like \"John 3:16\", got {0:?}")]
    InvalidFormat(String),

    /// Syntactically valid reference that the corpus does not contain.
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("cannot sample from an empty pool")]
    EmptyPool,
}

pub type Result<T> = std::result::Result<T, ReviewError>;
