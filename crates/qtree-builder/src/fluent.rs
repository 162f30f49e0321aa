//! Method-call syntax over the shared builder
//!
//! [`QueryExt`] is implemented for `Expr`, `&Expr` and `Result<Expr>`, so
//! relational combinators chain without intermediate `?`; the first error in
//! a chain is carried through to the end. [`ScalarExt`] borrows its receiver
//! so a bound variable can be used several times inside one closure.

use crate::builder::QueryBuilder;
use crate::selector::IntoSelection;
use qtree_ir::{Aggregate, ComparisonOp, DataType, Expr, RelationshipType, Result};
use std::sync::Arc;

/// A value that stands for a node, or for the error that prevented building it.
pub trait IntoOperand {
    fn into_operand(self) -> Result<Expr>;
}

impl IntoOperand for Expr {
    fn into_operand(self) -> Result<Expr> {
        Ok(self)
    }
}

impl IntoOperand for &Expr {
    fn into_operand(self) -> Result<Expr> {
        Ok(self.clone())
    }
}

impl IntoOperand for Result<Expr> {
    fn into_operand(self) -> Result<Expr> {
        self
    }
}

fn qb() -> &'static QueryBuilder {
    QueryBuilder::shared()
}

pub trait QueryExt: IntoOperand + Sized {
    fn select<F, R>(self, projection: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().select(self.into_operand()?, projection)
    }

    fn where_<F, R>(self, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().where_(self.into_operand()?, predicate)
    }

    fn join<I, FO, RO, FI, RI>(self, inner: I, outer_key: FO, inner_key: FI) -> Result<Expr>
    where
        I: IntoOperand,
        FO: FnOnce(Expr) -> RO,
        RO: IntoSelection,
        FI: FnOnce(Expr) -> RI,
        RI: IntoSelection,
    {
        qb().join(self.into_operand()?, inner.into_operand()?, outer_key, inner_key)
    }

    fn join_select<I, FO, RO, FI, RI, FS, RS>(
        self,
        inner: I,
        outer_key: FO,
        inner_key: FI,
        selector: FS,
    ) -> Result<Expr>
    where
        I: IntoOperand,
        FO: FnOnce(Expr) -> RO,
        RO: IntoSelection,
        FI: FnOnce(Expr) -> RI,
        RI: IntoSelection,
        FS: FnOnce(Expr, Expr) -> RS,
        RS: IntoSelection,
    {
        qb().join_select(
            self.into_operand()?,
            inner.into_operand()?,
            outer_key,
            inner_key,
            selector,
        )
    }

    fn inner_join<I, F, R>(self, right: I, condition: F) -> Result<Expr>
    where
        I: IntoOperand,
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        qb().inner_join(self.into_operand()?, right.into_operand()?, condition)
    }

    fn left_outer_join<I, F, R>(self, right: I, condition: F) -> Result<Expr>
    where
        I: IntoOperand,
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        qb().left_outer_join(self.into_operand()?, right.into_operand()?, condition)
    }

    fn full_outer_join<I, F, R>(self, right: I, condition: F) -> Result<Expr>
    where
        I: IntoOperand,
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        qb().full_outer_join(self.into_operand()?, right.into_operand()?, condition)
    }

    fn cross_apply<F, N, C>(self, apply: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> (N, C),
        N: Into<String>,
        C: IntoSelection,
    {
        qb().cross_apply(self.into_operand()?, apply)
    }

    fn outer_apply<F, N, C>(self, apply: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> (N, C),
        N: Into<String>,
        C: IntoSelection,
    {
        qb().outer_apply(self.into_operand()?, apply)
    }

    fn select_many<F, R>(self, selector: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().select_many(self.into_operand()?, selector)
    }

    fn select_many_with<F, R, FR, RR>(self, selector: F, result: FR) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
        FR: FnOnce(Expr, Expr) -> RR,
        RR: IntoSelection,
    {
        qb().select_many_with(self.into_operand()?, selector, result)
    }

    fn group_by<K, KR, A, I, N>(self, key: K, aggregates: A) -> Result<Expr>
    where
        K: FnOnce(Expr) -> KR,
        KR: IntoSelection,
        A: FnOnce(Expr) -> I,
        I: IntoIterator<Item = (N, Result<Aggregate>)>,
        N: Into<String>,
    {
        qb().group_by(self.into_operand()?, key, aggregates)
    }

    fn order_by<F, R>(self, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().order_by(self.into_operand()?, key)
    }

    fn order_by_descending<F, R>(self, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().order_by_descending(self.into_operand()?, key)
    }

    fn order_by_with_collation<F, R>(self, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().order_by_with_collation(self.into_operand()?, key, collation)
    }

    fn order_by_descending_with_collation<F, R>(self, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().order_by_descending_with_collation(self.into_operand()?, key, collation)
    }

    fn then_by<F, R>(self, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().then_by(self.into_operand()?, key)
    }

    fn then_by_descending<F, R>(self, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().then_by_descending(self.into_operand()?, key)
    }

    fn then_by_with_collation<F, R>(self, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().then_by_with_collation(self.into_operand()?, key, collation)
    }

    fn then_by_descending_with_collation<F, R>(self, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().then_by_descending_with_collation(self.into_operand()?, key, collation)
    }

    fn skip(self, count: impl IntoSelection) -> Result<Expr> {
        qb().skip(self.into_operand()?, count)
    }

    fn take(self, count: impl IntoSelection) -> Result<Expr> {
        qb().take(self.into_operand()?, count)
    }

    fn all<F, R>(self, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().all(self.into_operand()?, predicate)
    }

    fn any_where<F, R>(self, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        qb().any_where(self.into_operand()?, predicate)
    }

    fn any(self) -> Result<Expr> {
        qb().any(self.into_operand()?)
    }

    fn exists(self) -> Result<Expr> {
        qb().exists(self.into_operand()?)
    }

    fn except(self, right: impl IntoOperand) -> Result<Expr> {
        qb().except(self.into_operand()?, right.into_operand()?)
    }

    fn intersect(self, right: impl IntoOperand) -> Result<Expr> {
        qb().intersect(self.into_operand()?, right.into_operand()?)
    }

    fn union_all(self, right: impl IntoOperand) -> Result<Expr> {
        qb().union_all(self.into_operand()?, right.into_operand()?)
    }

    fn union(self, right: impl IntoOperand) -> Result<Expr> {
        qb().union(self.into_operand()?, right.into_operand()?)
    }
}

impl<T: IntoOperand> QueryExt for T {}

/// Scalar, type, reference and collection operators on a node.
pub trait ScalarExt {
    fn operand(&self) -> Expr;

    fn property(&self, name: impl Into<String>) -> Result<Expr> {
        qb().property(self.operand(), name)
    }

    fn plus(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().plus(self.operand(), right)
    }

    fn minus(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().minus(self.operand(), right)
    }

    fn multiply(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().multiply(self.operand(), right)
    }

    fn divide(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().divide(self.operand(), right)
    }

    fn modulo(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().modulo(self.operand(), right)
    }

    fn negate(&self) -> Result<Expr> {
        qb().negate(self.operand())
    }

    fn equal(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().compare(ComparisonOp::Eq, self.operand(), right)
    }

    fn not_equal(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().compare(ComparisonOp::Ne, self.operand(), right)
    }

    fn greater_than(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().compare(ComparisonOp::Gt, self.operand(), right)
    }

    fn greater_than_or_equal(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().compare(ComparisonOp::Ge, self.operand(), right)
    }

    fn less_than(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().compare(ComparisonOp::Lt, self.operand(), right)
    }

    fn less_than_or_equal(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().compare(ComparisonOp::Le, self.operand(), right)
    }

    fn and(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().and(self.operand(), right)
    }

    fn or(&self, right: impl IntoSelection) -> Result<Expr> {
        qb().or(self.operand(), right)
    }

    fn not(&self) -> Result<Expr> {
        qb().not(self.operand())
    }

    fn in_list<S: IntoSelection>(&self, list: impl IntoIterator<Item = S>) -> Result<Expr> {
        qb().in_list(self.operand(), list)
    }

    fn is_null(&self) -> Result<Expr> {
        qb().is_null(self.operand())
    }

    fn like(&self, pattern: impl IntoSelection) -> Result<Expr> {
        qb().like(self.operand(), pattern)
    }

    fn cast_to(&self, to: DataType) -> Result<Expr> {
        qb().cast_to(self.operand(), to)
    }

    fn treat_as(&self, to: DataType) -> Result<Expr> {
        qb().treat_as(self.operand(), to)
    }

    fn is_of(&self, of_type: DataType) -> Result<Expr> {
        qb().is_of(self.operand(), of_type)
    }

    fn is_of_only(&self, of_type: DataType) -> Result<Expr> {
        qb().is_of_only(self.operand(), of_type)
    }

    fn of_type(&self, of_type: DataType) -> Result<Expr> {
        qb().of_type(self.operand(), of_type)
    }

    fn of_type_only(&self, of_type: DataType) -> Result<Expr> {
        qb().of_type_only(self.operand(), of_type)
    }

    fn deref(&self) -> Result<Expr> {
        qb().deref(self.operand())
    }

    fn get_entity_ref(&self) -> Result<Expr> {
        qb().get_entity_ref(self.operand())
    }

    fn get_ref_key(&self) -> Result<Expr> {
        qb().get_ref_key(self.operand())
    }

    fn navigate(&self, relationship: &Arc<RelationshipType>, from_end: &str, to_end: &str) -> Result<Expr> {
        qb().navigate(self.operand(), relationship, from_end, to_end)
    }

    fn distinct(&self) -> Result<Expr> {
        qb().distinct(self.operand())
    }

    fn element(&self) -> Result<Expr> {
        qb().element(self.operand())
    }

    fn is_empty(&self) -> Result<Expr> {
        qb().is_empty(self.operand())
    }

    fn limit(&self, count: impl IntoSelection) -> Result<Expr> {
        qb().limit(self.operand(), count)
    }
}

impl ScalarExt for Expr {
    fn operand(&self) -> Expr {
        self.clone()
    }
}
