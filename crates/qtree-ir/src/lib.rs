//! qtree Intermediate Representation (IR)
//!
//! Immutable, typed query expression trees. Nodes are created through the
//! validated [`NodeFactory`], typed by a pluggable [`TypeResolver`], and are
//! deterministically serializable for fingerprinting and diagnostics.

mod error;
mod types;
mod value;

pub mod expr;
pub mod factory;
pub mod printer;
pub mod resolve;

pub use error::{BuildError, Result};
pub use expr::{
    Aggregate, AggregateKind, ApplyType, ArithmeticOp, ComparisonOp, Expr, ExprKind,
    ExpressionBinding, GroupExpressionBinding, JoinType, Lambda, QuantifierType, SortClause,
};
pub use factory::NodeFactory;
pub use resolve::{DefaultTypeResolver, TypeResolver};
pub use types::*;
pub use value::Value;
