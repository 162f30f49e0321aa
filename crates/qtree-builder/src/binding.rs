//! Binding layer: pairs an input collection with a fresh element variable

use crate::alias::{group_alias, next_alias};
use qtree_ir::{Expr, ExpressionBinding, GroupExpressionBinding, NodeFactory, Result};
use tracing::trace;

/// Binds `input` to a freshly generated variable name.
pub fn bind(factory: &NodeFactory<'_>, input: Expr) -> Result<ExpressionBinding> {
    bind_as(factory, input, next_alias())
}

pub fn bind_as(factory: &NodeFactory<'_>, input: Expr, name: impl Into<String>) -> Result<ExpressionBinding> {
    let binding = factory.bind_as(input, name)?;
    trace!(variable = binding.variable_name(), element = %binding.variable_type(), "Bound input");
    Ok(binding)
}

/// Group binding with a generated element variable and its `Group`-prefixed group variable.
pub fn group_bind(factory: &NodeFactory<'_>, input: Expr) -> Result<GroupExpressionBinding> {
    let alias = next_alias();
    let group = group_alias(&alias);
    group_bind_as(factory, input, alias, group)
}

pub fn group_bind_as(
    factory: &NodeFactory<'_>,
    input: Expr,
    name: impl Into<String>,
    group_name: impl Into<String>,
) -> Result<GroupExpressionBinding> {
    let binding = factory.group_bind_as(input, name, group_name)?;
    trace!(
        variable = binding.variable_name(),
        group = binding.group_variable_name(),
        "Bound group input"
    );
    Ok(binding)
}
