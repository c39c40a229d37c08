//! Error type for keyed memoization.

use thiserror::Error;

/// The error type returned by [`MemoizingCache`](crate::MemoizingCache) lookups.
///
/// Neither variant is ever stored: the entry stays empty and the next lookup
/// for the same key runs the compute function again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError<E> {
    /// The compute function returned an error.
    #[error("computation failed: {0}")]
    ComputationFailed(#[source] E),
    /// The compute function produced no value (the absence sentinel).
    ///
    /// This is a contract violation by the compute function, not a transient
    /// condition.
    #[error("compute function returned no value")]
    EmptyComputedValue,
}

impl<E> MemoError<E> {
    /// Returns `true` for [`MemoError::EmptyComputedValue`].
    pub fn is_empty_value(&self) -> bool {
        matches!(self, Self::EmptyComputedValue)
    }

    /// Returns the compute function's own error, if that is what this is.
    pub fn into_cause(self) -> Option<E> {
        match self {
            Self::ComputationFailed(cause) => Some(cause),
            Self::EmptyComputedValue => None,
        }
    }

    /// Maps the compute function's error, leaving `EmptyComputedValue` alone.
    pub fn map_cause<U>(self, f: impl FnOnce(E) -> U) -> MemoError<U> {
        match self {
            Self::ComputationFailed(cause) => MemoError::ComputationFailed(f(cause)),
            Self::EmptyComputedValue => MemoError::EmptyComputedValue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::fmt;

    #[derive(Debug, PartialEq)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_memo_error_display_and_source() {
        let err = MemoError::ComputationFailed(Boom);
        assert_eq!(err.to_string(), "computation failed: boom");
        assert!(err.source().is_some());
        assert!(!err.is_empty_value());

        let empty: MemoError<Boom> = MemoError::EmptyComputedValue;
        assert_eq!(empty.to_string(), "compute function returned no value");
        assert!(empty.source().is_none());
        assert!(empty.is_empty_value());
    }

    #[test]
    fn test_memo_error_cause_helpers() {
        assert_eq!(MemoError::ComputationFailed(Boom).into_cause(), Some(Boom));
        assert_eq!(MemoError::<Boom>::EmptyComputedValue.into_cause(), None);
        assert_eq!(
            MemoError::ComputationFailed(3).map_cause(|n| n * 2),
            MemoError::ComputationFailed(6)
        );
    }
}
