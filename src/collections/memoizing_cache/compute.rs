//! The compute seam of [`MemoizingCache`](super::MemoizingCache).

/// A keyed computation whose results a [`MemoizingCache`](super::MemoizingCache) memoizes.
///
/// Implement this directly to give a named type the role of the compute
/// function, or wrap a closure in [`Total`] or [`Partial`].
///
/// Returning `Ok(None)` means "no value" and is reported to the caller as
/// [`MemoError::EmptyComputedValue`](crate::MemoError::EmptyComputedValue);
/// it is never cached.
pub trait Compute<K: ?Sized> {
    /// The memoized value type.
    type Value;
    /// The error type of a failed computation.
    type Error;

    /// Computes the value for `key`.
    ///
    /// # Errors
    /// Any error is passed through to the caller of the cache lookup.
    fn compute(&self, key: &K) -> Result<Option<Self::Value>, Self::Error>;
}

/// Adapts a closure that always yields a value: `Fn(&K) -> Result<V, E>`.
#[derive(Clone, Copy, Debug)]
pub struct Total<F>(pub F);

impl<K: ?Sized, V, E, F> Compute<K> for Total<F>
where
    F: Fn(&K) -> Result<V, E>,
{
    type Value = V;
    type Error = E;

    #[inline]
    fn compute(&self, key: &K) -> Result<Option<V>, E> {
        (self.0)(key).map(Some)
    }
}

/// Adapts a closure that may yield the absence sentinel: `Fn(&K) -> Result<Option<V>, E>`.
#[derive(Clone, Copy, Debug)]
pub struct Partial<F>(pub F);

impl<K: ?Sized, V, E, F> Compute<K> for Partial<F>
where
    F: Fn(&K) -> Result<Option<V>, E>,
{
    type Value = V;
    type Error = E;

    #[inline]
    fn compute(&self, key: &K) -> Result<Option<V>, E> {
        (self.0)(key)
    }
}
