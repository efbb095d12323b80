use thiserror::Error as ThisError;

/// Error enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq, ThisError)]
pub enum Error<K> {
    /// Argument outside the domain of the operation, like an
    /// out-of-range rank passed to `select()`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// `min`, `max`, `delete_min`, `delete_max`, `floor` or `ceiling`
    /// called on an empty table.
    #[error("operation on empty table")]
    EmptyTable,
    /// No key qualifies, floor is too small or ceiling is too large.
    #[error("not found: {0}")]
    NotFound(String),
    /// Returned by create() API when key is already present.
    #[error("key already present")]
    OverwriteKey,
    /// Fatal case, two red links in a row on a path.
    #[error("consecutive red links")]
    ConsecutiveReds,
    /// Fatal case, a red link hangs off the right child.
    #[error("red link leaning right")]
    RightLeaningRed,
    /// Fatal case, breaking black balance. The String component of this
    /// variant can be used for debugging.
    #[error("unbalanced black links, {0}")]
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    #[error("keys out of order: {0:?} {1:?}")]
    SortError(K, K),
    /// Fatal case, (key, stored size, computed size) of a node whose
    /// subtree count is stale.
    #[error("size mismatch at {0:?}: stored {1}, computed {2}")]
    SizeMismatch(K, usize, usize),
    /// Fatal case, `rank(select(i)) != i` for position i.
    #[error("rank mismatch at position {0}")]
    RankMismatch(usize),
}
