use bstr::BString;

use thiserror::Error;

/// Errors signalled at the core boundaries of the graph store.
///
/// `SegmentNotFound` is non-fatal: whether a caller skips the name
/// (subgraph extraction) or aborts (explicit deletion) is call-site
/// policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("segment not found: {0}")]
    SegmentNotFound(BString),

    #[error("stable sequence not found: {0}")]
    StableNotFound(BString),

    #[error("invalid region selector: {0}")]
    InvalidRegion(String),
}
