use std::fmt;

/// Errors reported by network construction and training.
///
/// Every failure is fatal to the call that produced it; there are no
/// retries or partial results.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A construction or training parameter was invalid.
    InvalidConfig(String),
    /// The provided dataset was malformed (e.g. data/label length mismatch).
    InvalidData(String),
    /// A class label fell outside `[0, classes)`.
    LabelOutOfRange { label: usize, classes: usize },
    /// Training was invoked on an empty dataset.
    EmptyDataset,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            Error::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            Error::LabelOutOfRange { label, classes } => {
                write!(f, "label {} out of range for {} classes", label, classes)
            }
            Error::EmptyDataset => write!(f, "dataset is empty"),
        }
    }
}

impl std::error::Error for Error {}
