use core::fmt;

/// Errors reported by [`RankedTree`](crate::RankedTree) queries.
///
/// A missing key is not an error: lookups return `None` and deletions return
/// `false`. Errors are reserved for requests that can never be satisfied by the
/// tree in its current state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// A position outside `0..len` was passed to a select operation.
    OutOfRange {
        /// The requested position.
        position: usize,
        /// Number of values in the tree at the time of the call.
        len: usize,
    },
}

/// Shorthand for results carrying this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange { position, len } => {
                write!(f, "position {position} is out of range for a tree of {len} values")
            }
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn out_of_range_message_names_position_and_len() {
        let error = Error::OutOfRange { position: 4, len: 4 };
        assert_eq!(error.to_string(), "position 4 is out of range for a tree of 4 values");
    }
}
