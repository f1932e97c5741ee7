use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "truncated input: needed {needed} byte(s) at offset {offset}, {remaining} remaining"
    )]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("skin not found: {name}")]
    MissingSkin { name: String },

    #[error("parent mesh not found: '{name}' (skin '{skin}', slot {slot_index})")]
    MissingParentAttachment {
        skin: String,
        slot_index: usize,
        name: String,
    },

    #[error("bone {bone} references parent {parent}, parents must precede their children")]
    InvalidBoneParent { bone: usize, parent: usize },

    #[error("{kind} index {index} out of range (len={len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("failed to parse Spine binary: {message}")]
    BinaryParse { message: String },

    #[error("failed to parse Spine atlas: {message}")]
    AtlasParse { message: String },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::BinaryParse {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by running past the end of the buffer.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::TruncatedInput { .. })
    }
}
