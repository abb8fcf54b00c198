//! Errors
//!
//! Custom error types used throughout the `eifair` crate.
use thiserror::Error;

/// Errors that can occur while training or evaluating an `EIModel`.
#[derive(Debug, Error)]
pub enum EIError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// Two row or column counts that must agree do not.
    #[error("Shape mismatch for {0}: expected {1}, found {2}.")]
    ShapeMismatch(String, usize, usize),
    /// A parameter arena does not match the layout of the model it is loaded into.
    #[error("Parameter layout mismatch: {0}")]
    ParameterLayout(String),
    /// The dataset has no rows.
    #[error("The dataset is empty.")]
    EmptyDataset,
    /// Unable to write object to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read object from file.
    #[error("Unable to read from file {0}")]
    UnableToRead(String),
}
