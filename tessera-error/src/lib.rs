#![deny(missing_docs)]
#![feature(error_generic_member_access)]

//! Error handling for Tessera.
//!
//! All fallible operations in the core return a [`TesseraResult`]. Caller
//! contract violations (for example slicing a view out of range) panic via
//! [`tessera_panic!`] instead.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::{Debug, Formatter};

/// A result type whose error is a [`TesseraError`].
pub type TesseraResult<T> = Result<T, TesseraError>;

/// The error type shared by all Tessera crates.
#[derive(thiserror::Error)]
pub enum TesseraError {
    /// A precondition or state violation, e.g. mutating a shared or
    /// immutable buffer without detaching first.
    #[error("invalid: {0}")]
    InvalidArgument(String, Backtrace),
    /// An unsupported type or operation combination.
    #[error("not implemented: {0}")]
    NotImplemented(String, Backtrace),
    /// The memory pool could not satisfy an allocation request.
    #[error("out of memory: {0}")]
    OutOfMemory(String, Backtrace),
    /// An index outside the valid range of an array or buffer.
    #[error("index {0} out of bounds: [{1}, {2})")]
    OutOfBounds(usize, usize, usize, Backtrace),
}

impl TesseraError {
    fn backtrace(&self) -> &Backtrace {
        match self {
            Self::InvalidArgument(_, bt)
            | Self::NotImplemented(_, bt)
            | Self::OutOfMemory(_, bt)
            | Self::OutOfBounds(_, _, _, bt) => bt,
        }
    }
}

impl Debug for TesseraError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")?;
        let bt = self.backtrace();
        if bt.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace:\n{bt}")?;
        }
        Ok(())
    }
}

/// Construct a [`TesseraError`].
///
/// Defaults to `InvalidArgument`; other variants are selected by prefixing
/// the arguments with the variant name, e.g.
/// `tessera_err!(NotImplemented: "unsupported kind {:?}", id)`.
#[macro_export]
macro_rules! tessera_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {
        $crate::TesseraError::OutOfBounds(
            $idx,
            $start,
            $stop,
            ::std::backtrace::Backtrace::capture(),
        )
    };
    (NotImplemented: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::TesseraError::NotImplemented(
            format!($fmt $(, $arg)*),
            ::std::backtrace::Backtrace::capture(),
        )
    };
    (OutOfMemory: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::TesseraError::OutOfMemory(
            format!($fmt $(, $arg)*),
            ::std::backtrace::Backtrace::capture(),
        )
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::TesseraError::InvalidArgument(
            format!($fmt $(, $arg)*),
            ::std::backtrace::Backtrace::capture(),
        )
    };
}

/// Return early with a [`TesseraError`], using [`tessera_err!`] syntax.
#[macro_export]
macro_rules! tessera_bail {
    ($($tt:tt)+) => {
        return Err($crate::tessera_err!($($tt)+))
    };
}

/// Panic with a [`TesseraError`]. Reserved for caller contract violations
/// that cannot be surfaced as a result.
#[macro_export]
macro_rules! tessera_panic {
    ($($tt:tt)+) => {{
        #[allow(clippy::panic)]
        {
            panic!("{}", $crate::tessera_err!($($tt)+))
        }
    }};
}

/// Unwrap a value that is guaranteed present by an internal invariant,
/// panicking with context if the invariant is broken.
pub trait TesseraExpect {
    /// The unwrapped value type.
    type Output;

    /// Unwrap, panicking with `msg` and the underlying error on failure.
    fn tessera_expect(self, msg: &str) -> Self::Output;
}

impl<T> TesseraExpect for TesseraResult<T> {
    type Output = T;

    fn tessera_expect(self, msg: &str) -> Self::Output {
        match self {
            Ok(v) => v,
            #[allow(clippy::panic)]
            Err(e) => panic!("{msg}: {e}"),
        }
    }
}

impl<T> TesseraExpect for Option<T> {
    type Output = T;

    fn tessera_expect(self, msg: &str) -> Self::Output {
        match self {
            Some(v) => v,
            #[allow(clippy::panic)]
            None => panic!("{msg}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_variant_is_invalid() {
        let err = tessera_err!("bad state {}", 42);
        assert!(matches!(err, TesseraError::InvalidArgument(..)));
        assert_eq!(err.to_string(), "invalid: bad state 42");
    }

    #[test]
    fn variant_selection() {
        assert!(matches!(
            tessera_err!(NotImplemented: "nope"),
            TesseraError::NotImplemented(..)
        ));
        assert!(matches!(
            tessera_err!(OutOfMemory: "allocation of {} bytes", 8),
            TesseraError::OutOfMemory(..)
        ));
        let err = tessera_err!(OutOfBounds: 9, 0, 4);
        assert_eq!(err.to_string(), "index 9 out of bounds: [0, 4)");
    }

    #[test]
    fn bail_returns_early() {
        fn fails() -> TesseraResult<()> {
            tessera_bail!("always");
        }
        assert!(fails().is_err());
    }

    #[test]
    fn expect_passes_through() {
        let v: TesseraResult<i32> = Ok(3);
        assert_eq!(v.tessera_expect("must be ok"), 3);
        assert_eq!(Some(7).tessera_expect("must be some"), 7);
    }
}
