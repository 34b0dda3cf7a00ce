use crate::edit::EditError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("invalid selector: {reason}")]
    InvalidSelector { reason: String },

    #[error("failed to find element matching {selector}")]
    ElementNotFound { selector: String },

    #[error("attribute \"{name}\" does not exist")]
    AttributeNotFound { name: String },

    #[error("{operation} does not support {reason}")]
    UnsupportedOperation {
        operation: &'static str,
        reason: String,
    },

    #[error("edit error: {0}")]
    Edit(#[from] EditError),
}
