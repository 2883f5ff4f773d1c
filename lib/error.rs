use std::{
    error::Error,
    fmt::{self, Display},
};

use thiserror::Error;

use crate::Path;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a layer path operation.
pub type UnionPathResult<T> = Result<T, UnionPathError>;

/// An error that occurred while classifying or deriving layer paths.
#[derive(pretty_error_debug::Debug, Error)]
pub enum UnionPathError {
    /// The path is the root path, which has no parent. Surfaced by
    /// [`Path::parent_path`](crate::Path::parent_path) and the un-whiteout
    /// derivations; never silently defaulted, since a bogus parent would
    /// corrupt a merge decision downstream.
    #[error("path has no parent: {0}")]
    NoParent(Path),

    /// Custom error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl UnionPathError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> UnionPathError {
        UnionPathError::Custom(AnyError {
            error: error.into(),
        })
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `UnionPathResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> UnionPathResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
