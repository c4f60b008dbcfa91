use thiserror::Error;

/// An error returned by [`Resolver::resolve`](crate::Resolver::resolve).
///
/// `NotFound` can originate from a fresh lookup as well as from a still-valid
/// negative cache mark; callers cannot (and should not need to) tell the two
/// apart.
#[derive(Debug, Error)]
pub enum ResolveError<E> {
    /// The key was empty (or whitespace-only) after normalization.
    ///
    /// This is rejected before any lock is taken or any lookup is made.
    #[error("key is empty after trimming")]
    EmptyKey,

    /// The key is confirmed to not exist upstream.
    #[error("key not found")]
    NotFound,

    /// The underlying lookup failed with an error other than "not found".
    ///
    /// The key is negatively cached for `retry_misses_after` before this is
    /// returned, so repeated calls within that window fail with
    /// [`NotFound`](Self::NotFound) instead of hitting the upstream again.
    #[error(transparent)]
    Lookup(#[from] E),
}

impl<E> ResolveError<E> {
    /// Returns `true` if the key is known to not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound)
    }
}
