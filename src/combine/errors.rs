use crate::edit::EditError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("cannot replace <{tag}>: the source document has no <{tag}> section")]
    MissingReplaceTarget { tag: String },

    #[error("unknown merge directive {value:?} on <{tag}> (expected \"merge\" or \"replace\")")]
    UnknownDirective { tag: String, value: String },

    #[error("edit error: {0}")]
    Edit(#[from] EditError),
}
