use thiserror::Error;

/// Rejected form edits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("invalid lattice size '{0}'")]
    InvalidSize(String),

    #[error("invalid dimension '{0}'")]
    InvalidDimension(String),

    #[error("no weights at position {0}")]
    UnknownWeights(usize),

    #[error("{kind} weights have no {array} array")]
    NoSuchArray { kind: String, array: String },

    #[error("{kind} weights are not edited as text")]
    NotTextWeights { kind: String },

    #[error("index {index} out of range for a collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("construction method '{method}' is not selectable: {reason}")]
    MethodNotSelectable { method: String, reason: String },

    #[error("figure of merit '{0}' does not support coordinate-uniform evaluation")]
    CoordUniformUnavailable(String),

    #[error("unknown {what} '{name}'")]
    Unknown { what: &'static str, name: String },
}

impl FormError {
    pub fn unknown(what: &'static str, name: impl Into<String>) -> Self {
        Self::Unknown {
            what,
            name: name.into(),
        }
    }
}

/// Reasons a search request is refused before anything is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error(
        "There are invalid values in the input boxes; please check: {}",
        .0.join(", ")
    )]
    InvalidFields(Vec<String>),

    #[error("No weights are specified; please add at least one type of weights.")]
    NoWeights,
}

/// Failures of a backend call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Cannot communicate with the Lattice Builder service: {0}")]
    Transport(String),

    #[error("{message}")]
    Remote { message: String },

    #[error("Malformed response from the Lattice Builder service: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("a search is already running")]
    AlreadyRunning,

    #[error("Search unavailable: {0}")]
    BackendUnavailable(String),
}

#[derive(Debug, Error)]
pub enum LatwebError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}
