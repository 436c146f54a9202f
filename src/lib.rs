//! Hierarchical Set Decision Diagrams: a canonical, maximally-shared data
//! structure for large sets of hierarchically-structured tuples, with a
//! homomorphism algebra and a saturation rewriter.

pub mod arena;
pub mod cache;
pub mod context;
pub mod error;
pub mod hom;
pub mod order;
pub mod sdd;
pub mod unique_table;
pub mod values;
pub mod vid;

#[cfg(test)]
pub mod test_support;

#[cfg(test)]
mod scenarios;

pub use context::{Config, Context, Manager};
pub use error::{Error, Result, Top};
pub use hom::{HomFactory, Homomorphism};
pub use order::Order;
pub use sdd::{Sdd, SddFactory};
pub use values::{InductiveBody, ValueSet, ValuesFunction};
pub use vid::Var;
