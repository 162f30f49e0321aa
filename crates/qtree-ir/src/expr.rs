//! Expression node model
//!
//! [`Expr`] is an immutable, reference-counted node. Nodes can only be created
//! through [`crate::NodeFactory`], which validates operands and derives the
//! result type before anything is allocated, so a node observed by a caller is
//! always complete and well typed.

use crate::{DataType, EntitySet, FunctionSignature, RelationshipType, Value};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// A typed node of the query expression tree. Cloning is cheap and shares the node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Expr(Arc<ExprNode>);

#[derive(Debug, PartialEq, Serialize)]
pub struct ExprNode {
    kind: ExprKind,
    result_type: DataType,
}

impl Expr {
    pub(crate) fn new(kind: ExprKind, result_type: DataType) -> Self {
        Expr(Arc::new(ExprNode { kind, result_type }))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn result_type(&self) -> &DataType {
        &self.0.result_type
    }

    /// True when both handles refer to the same node allocation.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Name of a variable reference node.
    pub fn variable_name(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::VariableRef { name } => Some(name),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Direct operand nodes in evaluation order. Binding variables are declarations, not operands.
    pub fn children(&self) -> Vec<&Expr> {
        match self.kind() {
            ExprKind::Scan { .. }
            | ExprKind::Constant { .. }
            | ExprKind::Null
            | ExprKind::VariableRef { .. }
            | ExprKind::ParameterRef { .. } => Vec::new(),
            ExprKind::Property { instance, .. } => vec![instance],
            ExprKind::Arithmetic { arguments, .. }
            | ExprKind::Function { arguments, .. }
            | ExprKind::NewInstance { arguments } => arguments.iter().collect(),
            ExprKind::Comparison { left, right, .. }
            | ExprKind::And { left, right }
            | ExprKind::Or { left, right }
            | ExprKind::Except { left, right }
            | ExprKind::Intersect { left, right }
            | ExprKind::UnionAll { left, right } => vec![left, right],
            ExprKind::Not { argument }
            | ExprKind::IsNull { argument }
            | ExprKind::Cast { argument }
            | ExprKind::Treat { argument }
            | ExprKind::IsOf { argument, .. }
            | ExprKind::OfType { argument, .. }
            | ExprKind::Deref { argument }
            | ExprKind::EntityRef { argument }
            | ExprKind::RefKey { argument }
            | ExprKind::Distinct { argument }
            | ExprKind::Element { argument }
            | ExprKind::IsEmpty { argument } => vec![argument],
            ExprKind::In { item, list } => std::iter::once(item).chain(list.iter()).collect(),
            ExprKind::Like {
                argument,
                pattern,
                escape,
            } => {
                let mut children = vec![argument, pattern];
                children.extend(escape.iter());
                children
            }
            ExprKind::Case {
                whens,
                thens,
                otherwise,
            } => whens
                .iter()
                .zip(thens.iter())
                .flat_map(|(when, then)| [when, then])
                .chain(std::iter::once(otherwise))
                .collect(),
            ExprKind::LambdaInvoke { lambda, arguments } => {
                std::iter::once(lambda.body()).chain(arguments.iter()).collect()
            }
            ExprKind::CreateRef { key, .. } => vec![key],
            ExprKind::Navigate { source, .. } => vec![source],
            ExprKind::Limit {
                argument, limit, ..
            } => vec![argument, limit],
            ExprKind::Filter { input, predicate }
            | ExprKind::Quantifier {
                input, predicate, ..
            } => vec![input.input(), predicate],
            ExprKind::Project { input, projection } => vec![input.input(), projection],
            ExprKind::Join {
                left,
                right,
                condition,
                ..
            } => vec![left.input(), right.input(), condition],
            ExprKind::CrossJoin { inputs } => inputs.iter().map(|b| b.input()).collect(),
            ExprKind::Apply { input, apply, .. } => vec![input.input(), apply.input()],
            ExprKind::GroupBy {
                input,
                keys,
                aggregates,
            } => {
                let mut children = vec![input.input()];
                children.extend(keys.iter().map(|(_, key)| key));
                for (_, aggregate) in aggregates {
                    match aggregate.kind() {
                        AggregateKind::Function { arguments, .. } => children.extend(arguments.iter()),
                        AggregateKind::Group { argument } => children.push(argument),
                    }
                }
                children
            }
            ExprKind::Sort { input, order } => std::iter::once(input.input())
                .chain(order.iter().map(|clause| clause.key()))
                .collect(),
            ExprKind::Skip {
                input,
                order,
                count,
            } => std::iter::once(input.input())
                .chain(order.iter().map(|clause| clause.key()))
                .chain(std::iter::once(count))
                .collect(),
        }
    }

    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("expression trees always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn is_equality(self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }

    pub fn is_ordering(self) -> bool {
        !self.is_equality()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinType {
    Inner,
    Left,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApplyType {
    Cross,
    Outer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QuantifierType {
    All,
    Any,
}

/// The closed set of node shapes.
#[derive(Debug, PartialEq, Serialize)]
pub enum ExprKind {
    // Leaves
    Scan { target: Arc<EntitySet> },
    Constant { value: Value },
    Null,
    VariableRef { name: String },
    ParameterRef { name: String },

    // Scalar operators
    Property { instance: Expr, name: String },
    Arithmetic { op: ArithmeticOp, arguments: Vec<Expr> },
    Comparison { op: ComparisonOp, left: Expr, right: Expr },
    And { left: Expr, right: Expr },
    Or { left: Expr, right: Expr },
    Not { argument: Expr },
    In { item: Expr, list: Vec<Expr> },
    IsNull { argument: Expr },
    Like { argument: Expr, pattern: Expr, escape: Option<Expr> },
    Case { whens: Vec<Expr>, thens: Vec<Expr>, otherwise: Expr },
    Function { function: Arc<FunctionSignature>, arguments: Vec<Expr> },
    LambdaInvoke { lambda: Lambda, arguments: Vec<Expr> },
    NewInstance { arguments: Vec<Expr> },

    // Type operators
    Cast { argument: Expr },
    Treat { argument: Expr },
    IsOf { argument: Expr, of_type: DataType, only: bool },
    OfType { argument: Expr, of_type: DataType, only: bool },

    // Reference operators
    Deref { argument: Expr },
    EntityRef { argument: Expr },
    CreateRef { target: Arc<EntitySet>, key: Expr },
    RefKey { argument: Expr },
    Navigate {
        source: Expr,
        relationship: Arc<RelationshipType>,
        from_end: String,
        to_end: String,
    },

    // Collection operators
    Distinct { argument: Expr },
    Element { argument: Expr },
    IsEmpty { argument: Expr },
    Except { left: Expr, right: Expr },
    Intersect { left: Expr, right: Expr },
    UnionAll { left: Expr, right: Expr },
    Limit { argument: Expr, limit: Expr, with_ties: bool },

    // Relational operators
    Filter { input: ExpressionBinding, predicate: Expr },
    Project { input: ExpressionBinding, projection: Expr },
    Join {
        join_type: JoinType,
        left: ExpressionBinding,
        right: ExpressionBinding,
        condition: Expr,
    },
    CrossJoin { inputs: Vec<ExpressionBinding> },
    Apply {
        apply_type: ApplyType,
        input: ExpressionBinding,
        apply: ExpressionBinding,
    },
    GroupBy {
        input: GroupExpressionBinding,
        keys: Vec<(String, Expr)>,
        aggregates: Vec<(String, Aggregate)>,
    },
    Sort { input: ExpressionBinding, order: Vec<SortClause> },
    Skip {
        input: ExpressionBinding,
        order: Vec<SortClause>,
        count: Expr,
    },
    Quantifier {
        quantifier: QuantifierType,
        input: ExpressionBinding,
        predicate: Expr,
    },
}

impl ExprKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Scan { .. } => "Scan",
            ExprKind::Constant { .. } => "Constant",
            ExprKind::Null => "Null",
            ExprKind::VariableRef { .. } => "VariableReference",
            ExprKind::ParameterRef { .. } => "ParameterReference",
            ExprKind::Property { .. } => "Property",
            ExprKind::Arithmetic { op, .. } => match op {
                ArithmeticOp::Add => "Plus",
                ArithmeticOp::Sub => "Minus",
                ArithmeticOp::Mul => "Multiply",
                ArithmeticOp::Div => "Divide",
                ArithmeticOp::Mod => "Modulo",
                ArithmeticOp::Neg => "UnaryMinus",
            },
            ExprKind::Comparison { op, .. } => match op {
                ComparisonOp::Eq => "Equals",
                ComparisonOp::Ne => "NotEquals",
                ComparisonOp::Lt => "LessThan",
                ComparisonOp::Le => "LessThanOrEquals",
                ComparisonOp::Gt => "GreaterThan",
                ComparisonOp::Ge => "GreaterThanOrEquals",
            },
            ExprKind::And { .. } => "And",
            ExprKind::Or { .. } => "Or",
            ExprKind::Not { .. } => "Not",
            ExprKind::In { .. } => "In",
            ExprKind::IsNull { .. } => "IsNull",
            ExprKind::Like { .. } => "Like",
            ExprKind::Case { .. } => "Case",
            ExprKind::Function { .. } => "Function",
            ExprKind::LambdaInvoke { .. } => "Lambda",
            ExprKind::NewInstance { .. } => "NewInstance",
            ExprKind::Cast { .. } => "Cast",
            ExprKind::Treat { .. } => "Treat",
            ExprKind::IsOf { only: false, .. } => "IsOf",
            ExprKind::IsOf { only: true, .. } => "IsOfOnly",
            ExprKind::OfType { only: false, .. } => "OfType",
            ExprKind::OfType { only: true, .. } => "OfTypeOnly",
            ExprKind::Deref { .. } => "Deref",
            ExprKind::EntityRef { .. } => "EntityRef",
            ExprKind::CreateRef { .. } => "Ref",
            ExprKind::RefKey { .. } => "RefKey",
            ExprKind::Navigate { .. } => "RelationshipNavigation",
            ExprKind::Distinct { .. } => "Distinct",
            ExprKind::Element { .. } => "Element",
            ExprKind::IsEmpty { .. } => "IsEmpty",
            ExprKind::Except { .. } => "Except",
            ExprKind::Intersect { .. } => "Intersect",
            ExprKind::UnionAll { .. } => "UnionAll",
            ExprKind::Limit { .. } => "Limit",
            ExprKind::Filter { .. } => "Filter",
            ExprKind::Project { .. } => "Project",
            ExprKind::Join { join_type, .. } => match join_type {
                JoinType::Inner => "InnerJoin",
                JoinType::Left => "LeftOuterJoin",
                JoinType::Full => "FullOuterJoin",
            },
            ExprKind::CrossJoin { .. } => "CrossJoin",
            ExprKind::Apply { apply_type, .. } => match apply_type {
                ApplyType::Cross => "CrossApply",
                ApplyType::Outer => "OuterApply",
            },
            ExprKind::GroupBy { .. } => "GroupBy",
            ExprKind::Sort { .. } => "Sort",
            ExprKind::Skip { .. } => "Skip",
            ExprKind::Quantifier { quantifier, .. } => match quantifier {
                QuantifierType::All => "All",
                QuantifierType::Any => "Any",
            },
        }
    }
}

/// An input collection paired with the variable that stands for one of its elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionBinding {
    input: Expr,
    variable: Expr,
}

impl ExpressionBinding {
    pub(crate) fn new(input: Expr, variable: Expr) -> Self {
        Self { input, variable }
    }

    pub fn input(&self) -> &Expr {
        &self.input
    }

    /// The bound variable reference. Only valid inside the combinator that created it.
    pub fn variable(&self) -> &Expr {
        &self.variable
    }

    pub fn variable_name(&self) -> &str {
        self.variable.variable_name().unwrap_or_default()
    }

    pub fn variable_type(&self) -> &DataType {
        self.variable.result_type()
    }
}

/// Binding used by group-by: the element variable for keys plus a variable for the whole group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupExpressionBinding {
    input: Expr,
    variable: Expr,
    group_variable: Expr,
}

impl GroupExpressionBinding {
    pub(crate) fn new(input: Expr, variable: Expr, group_variable: Expr) -> Self {
        Self {
            input,
            variable,
            group_variable,
        }
    }

    pub fn input(&self) -> &Expr {
        &self.input
    }

    pub fn variable(&self) -> &Expr {
        &self.variable
    }

    pub fn variable_name(&self) -> &str {
        self.variable.variable_name().unwrap_or_default()
    }

    pub fn variable_type(&self) -> &DataType {
        self.variable.result_type()
    }

    /// Collection-typed reference to the current group.
    pub fn group_variable(&self) -> &Expr {
        &self.group_variable
    }

    pub fn group_variable_name(&self) -> &str {
        self.group_variable.variable_name().unwrap_or_default()
    }

    pub fn group_variable_type(&self) -> &DataType {
        self.group_variable.result_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortClause {
    key: Expr,
    ascending: bool,
    collation: String,
}

impl SortClause {
    pub(crate) fn new(key: Expr, ascending: bool, collation: String) -> Self {
        Self {
            key,
            ascending,
            collation,
        }
    }

    pub fn key(&self) -> &Expr {
        &self.key
    }

    pub fn ascending(&self) -> bool {
        self.ascending
    }

    /// Empty when the default collation applies.
    pub fn collation(&self) -> &str {
        &self.collation
    }
}

/// An inline function: uniquely named variable parameters and a body over them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lambda {
    parameters: Vec<Expr>,
    body: Expr,
}

impl Lambda {
    pub(crate) fn new(parameters: Vec<Expr>, body: Expr) -> Self {
        Self { parameters, body }
    }

    pub fn parameters(&self) -> &[Expr] {
        &self.parameters
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AggregateKind {
    Function {
        function: Arc<FunctionSignature>,
        arguments: Vec<Expr>,
        distinct: bool,
    },
    /// Nest: the group's elements as a collection.
    Group { argument: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    kind: AggregateKind,
    result_type: DataType,
}

impl Aggregate {
    pub(crate) fn new(kind: AggregateKind, result_type: DataType) -> Self {
        Self { kind, result_type }
    }

    pub fn kind(&self) -> &AggregateKind {
        &self.kind
    }

    pub fn result_type(&self) -> &DataType {
        &self.result_type
    }
}
