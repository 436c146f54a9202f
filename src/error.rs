//! The error taxonomy: incompatible DDs ("top"), evaluation errors that wrap
//! a top with the chain of enclosing homomorphisms, invalid arguments, a
//! cooperative interrupt, and double manager initialization.
use std::fmt::Debug;
use thiserror::Error;

use crate::sdd::Sdd;
use crate::values::ValueSet;

/// Two SDDs that were asked to combine despite having incompatible shape
/// (different terminal kinds, or node variables that don't match).
#[derive(Debug, Clone)]
pub struct Top<V: ValueSet> {
    pub lhs: Sdd<V>,
    pub rhs: Sdd<V>,
}

impl<V: ValueSet> Top<V> {
    pub fn new(lhs: Sdd<V>, rhs: Sdd<V>) -> Self {
        Top { lhs, rhs }
    }
}

/// Errors raised by this crate.
///
/// Nothing is recovered locally: a cache never stores a failed result, and
/// an evaluation error accumulates the chain of enclosing homomorphisms on
/// its way out of the recursion that raised it.
#[derive(Error, Debug, Clone)]
pub enum Error<V: ValueSet> {
    #[error("incompatible SDDs: {0:?}")]
    Top(Top<V>),

    #[error("evaluation error: {top:?} (raised under {chain:?})")]
    Evaluation {
        top: Top<V>,
        /// Debug names of the homomorphisms crossed on the way out, innermost first.
        chain: Vec<String>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("evaluation interrupted")]
    Interrupt,

    #[error("a manager for this configuration is already initialized")]
    DoubleInit,
}

impl<V: ValueSet> Error<V> {
    /// Wrap (or extend) an evaluation error with one more enclosing homomorphism name.
    pub fn annotate(self, enclosing: impl Into<String>) -> Self {
        match self {
            Error::Top(top) => Error::Evaluation { top, chain: vec![enclosing.into()] },
            Error::Evaluation { top, mut chain } => {
                chain.push(enclosing.into());
                Error::Evaluation { top, chain }
            }
            other => other,
        }
    }
}

pub type Result<T, V> = std::result::Result<T, Error<V>>;
