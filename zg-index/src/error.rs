//! The crate-wide error type.
//!
//! All error-prone work (query parsing, pattern compilation, ingestion)
//! reports through [`Error`]; iterators never fail once constructed.
//! Internal invariant violations (a binary search landing outside bounds, a
//! state object of the wrong type) are bugs and panic instead.

use thiserror::Error;

use crate::fields::FieldTag;
use crate::types::ZgramId;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed query text. `position` is a byte offset into the query.
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// A new zgram's id did not strictly exceed the previous one.
    #[error("nonincreasing zgram ids: went from {previous} to {offered}")]
    NonMonotonicZgramId { previous: ZgramId, offered: ZgramId },

    /// A per-field word count did not fit its bit width.
    #[error("word count overflowed for field {field}: {count}")]
    FieldCountOverflow { field: FieldTag, count: usize },

    /// The word table can no longer address its owning zgram.
    #[error("zgram offset {0} does not fit in a word descriptor")]
    ZgramOffsetOverflow(u32),

    /// A metadata record referred to a zgram the index does not have.
    #[error("unknown zgram id {0}")]
    UnknownZgramId(ZgramId),

    /// The external zgram resolver could not produce a body.
    #[error("resolving zgram {id}: {message}")]
    Resolve { id: ZgramId, message: String },

    /// A frozen index blob failed validation on open.
    #[error("malformed frozen index blob: {0}")]
    BadBlob(String),

    /// Checkpointing is only defined for an index whose frozen side is empty;
    /// merging two tiers is the offline builder's job.
    #[error("cannot freeze an index that already has a frozen segment")]
    CannotRefreeze,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
