//! Validated node construction
//!
//! [`NodeFactory`] is the only way to create nodes. Each constructor checks
//! the structural rules of its kind, asks the resolver to derive the result
//! type, and only then allocates. A failed check never produces a node.

use crate::expr::{
    Aggregate, AggregateKind, ApplyType, ArithmeticOp, ComparisonOp, Expr, ExprKind,
    ExpressionBinding, GroupExpressionBinding, JoinType, Lambda, QuantifierType, SortClause,
};
use crate::{BuildError, DataType, EntitySet, FieldType, FunctionSignature, RelationshipType, Result, TypeResolver, Value};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Copy)]
pub struct NodeFactory<'a> {
    resolver: &'a dyn TypeResolver,
}

fn require_name(argument: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        Err(BuildError::null_argument(argument))
    } else {
        Ok(())
    }
}

/// Rejects the first repeated name in `names`.
fn require_unique<'n>(context: &str, names: impl IntoIterator<Item = &'n str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(BuildError::name_conflict(name, context));
        }
    }
    Ok(())
}

/// Output row of a join or apply: one column per binding variable.
fn binding_row(bindings: &[&ExpressionBinding]) -> DataType {
    DataType::collection_of(DataType::Struct(
        bindings
            .iter()
            .map(|b| FieldType::new(b.variable_name(), b.variable_type().clone()))
            .collect(),
    ))
}

impl<'a> NodeFactory<'a> {
    pub fn new(resolver: &'a dyn TypeResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &'a dyn TypeResolver {
        self.resolver
    }

    // ---- Leaves ----

    pub fn scan(&self, target: &Arc<EntitySet>) -> Expr {
        let element = DataType::Entity(target.element_type.clone());
        Expr::new(
            ExprKind::Scan {
                target: target.clone(),
            },
            DataType::collection_of(element),
        )
    }

    pub fn constant(&self, value: impl Into<Value>) -> Expr {
        let value = value.into();
        let data_type = value.data_type();
        Expr::new(ExprKind::Constant { value }, data_type)
    }

    pub fn null(&self, data_type: DataType) -> Expr {
        Expr::new(ExprKind::Null, data_type)
    }

    pub fn variable(&self, name: impl Into<String>, data_type: DataType) -> Result<Expr> {
        let name = name.into();
        require_name("name", &name)?;
        Ok(Expr::new(ExprKind::VariableRef { name }, data_type))
    }

    pub fn parameter(&self, name: impl Into<String>, data_type: DataType) -> Result<Expr> {
        let name = name.into();
        require_name("name", &name)?;
        Ok(Expr::new(ExprKind::ParameterRef { name }, data_type))
    }

    // ---- Bindings ----

    pub fn bind_as(&self, input: Expr, name: impl Into<String>) -> Result<ExpressionBinding> {
        let name = name.into();
        require_name("name", &name)?;
        let element = self.resolver.validate_collection("input", input.result_type())?;
        let variable = self.variable(name, element)?;
        Ok(ExpressionBinding::new(input, variable))
    }

    pub fn group_bind_as(
        &self,
        input: Expr,
        name: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Result<GroupExpressionBinding> {
        let (name, group_name) = (name.into(), group_name.into());
        require_name("name", &name)?;
        require_name("group_name", &group_name)?;
        if name == group_name {
            return Err(BuildError::name_conflict(name, "group binding"));
        }
        let element = self.resolver.validate_collection("input", input.result_type())?;
        let variable = self.variable(name, element.clone())?;
        let group_variable = self.variable(group_name, DataType::collection_of(element))?;
        Ok(GroupExpressionBinding::new(input, variable, group_variable))
    }

    pub fn sort_clause(&self, key: Expr, ascending: bool, collation: impl Into<String>) -> Result<SortClause> {
        let collation = collation.into();
        self.resolver.validate_sort_key(key.result_type(), &collation)?;
        Ok(SortClause::new(key, ascending, collation))
    }

    pub fn lambda(&self, parameters: Vec<Expr>, body: Expr) -> Result<Lambda> {
        for parameter in &parameters {
            if parameter.variable_name().is_none() {
                return Err(BuildError::invalid_shape(
                    "parameters",
                    format!("expected a variable reference, got {}", parameter.kind_name()),
                ));
            }
        }
        require_unique(
            "lambda parameters",
            parameters.iter().filter_map(|p| p.variable_name()),
        )?;
        Ok(Lambda::new(parameters, body))
    }

    // ---- Scalar operators ----

    pub fn property(&self, instance: Expr, name: impl Into<String>) -> Result<Expr> {
        let name = name.into();
        require_name("name", &name)?;
        let instance_type = instance.result_type();
        if !matches!(instance_type, DataType::Struct(_) | DataType::Entity(_)) {
            return Err(BuildError::invalid_shape(
                "instance",
                format!("{instance_type} has no members"),
            ));
        }
        let field_type = instance_type
            .find_field(&name)
            .map(|f| f.data_type.clone())
            .ok_or_else(|| {
                BuildError::invalid_shape("name", format!("{instance_type} has no member '{name}'"))
            })?;
        Ok(Expr::new(ExprKind::Property { instance, name }, field_type))
    }

    pub fn arithmetic(&self, op: ArithmeticOp, arguments: Vec<Expr>) -> Result<Expr> {
        let types: Vec<&DataType> = arguments.iter().map(|a| a.result_type()).collect();
        let result_type = self.resolver.validate_arithmetic(op, &types)?;
        Ok(Expr::new(ExprKind::Arithmetic { op, arguments }, result_type))
    }

    pub fn comparison(&self, op: ComparisonOp, left: Expr, right: Expr) -> Result<Expr> {
        let result_type = self
            .resolver
            .validate_comparison(op, left.result_type(), right.result_type())?;
        Ok(Expr::new(ExprKind::Comparison { op, left, right }, result_type))
    }

    pub fn and(&self, left: Expr, right: Expr) -> Result<Expr> {
        self.resolver.validate_boolean("left", left.result_type())?;
        self.resolver.validate_boolean("right", right.result_type())?;
        Ok(Expr::new(ExprKind::And { left, right }, DataType::Bool))
    }

    pub fn or(&self, left: Expr, right: Expr) -> Result<Expr> {
        self.resolver.validate_boolean("left", left.result_type())?;
        self.resolver.validate_boolean("right", right.result_type())?;
        Ok(Expr::new(ExprKind::Or { left, right }, DataType::Bool))
    }

    pub fn not(&self, argument: Expr) -> Result<Expr> {
        self.resolver.validate_boolean("argument", argument.result_type())?;
        Ok(Expr::new(ExprKind::Not { argument }, DataType::Bool))
    }

    pub fn in_list(&self, item: Expr, list: Vec<Expr>) -> Result<Expr> {
        let types: Vec<&DataType> = list.iter().map(|e| e.result_type()).collect();
        let result_type = self.resolver.validate_in(item.result_type(), &types)?;
        Ok(Expr::new(ExprKind::In { item, list }, result_type))
    }

    pub fn is_null(&self, argument: Expr) -> Result<Expr> {
        if argument.result_type().is_collection() {
            return Err(BuildError::invalid_shape(
                "argument",
                "is-null does not apply to collections",
            ));
        }
        Ok(Expr::new(ExprKind::IsNull { argument }, DataType::Bool))
    }

    pub fn like(&self, argument: Expr, pattern: Expr, escape: Option<Expr>) -> Result<Expr> {
        let result_type = self.resolver.validate_like(
            argument.result_type(),
            pattern.result_type(),
            escape.as_ref().map(|e| e.result_type()),
        )?;
        Ok(Expr::new(
            ExprKind::Like {
                argument,
                pattern,
                escape,
            },
            result_type,
        ))
    }

    pub fn case(&self, whens: Vec<Expr>, thens: Vec<Expr>, otherwise: Expr) -> Result<Expr> {
        if whens.is_empty() {
            return Err(BuildError::invalid_shape("whens", "at least one WHEN clause is required"));
        }
        if whens.len() != thens.len() {
            return Err(BuildError::arity_mismatch("case THEN clauses", whens.len(), thens.len()));
        }
        for when in &whens {
            self.resolver.validate_boolean("whens", when.result_type())?;
        }
        let mut result_type = otherwise.result_type().clone();
        for then in &thens {
            result_type = self
                .resolver
                .validate_common_type("thens", &result_type, then.result_type())?;
        }
        Ok(Expr::new(
            ExprKind::Case {
                whens,
                thens,
                otherwise,
            },
            result_type,
        ))
    }

    pub fn function(&self, function: Arc<FunctionSignature>, arguments: Vec<Expr>) -> Result<Expr> {
        self.check_arguments(&function, &arguments)?;
        let result_type = function.return_type.clone();
        Ok(Expr::new(
            ExprKind::Function {
                function,
                arguments,
            },
            result_type,
        ))
    }

    fn check_arguments(&self, function: &FunctionSignature, arguments: &[Expr]) -> Result<()> {
        if function.parameters.len() != arguments.len() {
            return Err(BuildError::arity_mismatch(
                function.full_name(),
                function.parameters.len(),
                arguments.len(),
            ));
        }
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            if !self
                .resolver
                .is_promotable(argument.result_type(), &parameter.data_type)
            {
                return Err(BuildError::type_mismatch(
                    parameter.name.clone(),
                    format!(
                        "{} expects {}, got {}",
                        function.full_name(),
                        parameter.data_type,
                        argument.result_type()
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn invoke(&self, lambda: Lambda, arguments: Vec<Expr>) -> Result<Expr> {
        if lambda.parameters().len() != arguments.len() {
            return Err(BuildError::arity_mismatch(
                "lambda invocation",
                lambda.parameters().len(),
                arguments.len(),
            ));
        }
        for (parameter, argument) in lambda.parameters().iter().zip(&arguments) {
            if !self
                .resolver
                .is_promotable(argument.result_type(), parameter.result_type())
            {
                return Err(BuildError::type_mismatch(
                    parameter.variable_name().unwrap_or("argument"),
                    format!(
                        "expected {}, got {}",
                        parameter.result_type(),
                        argument.result_type()
                    ),
                ));
            }
        }
        let result_type = lambda.body().result_type().clone();
        Ok(Expr::new(ExprKind::LambdaInvoke { lambda, arguments }, result_type))
    }

    /// Row construction from named columns, in column order.
    pub fn new_row<N: Into<String>>(&self, columns: impl IntoIterator<Item = (N, Expr)>) -> Result<Expr> {
        let (names, arguments): (Vec<String>, Vec<Expr>) =
            columns.into_iter().map(|(n, e)| (n.into(), e)).unzip();
        if arguments.is_empty() {
            return Err(BuildError::invalid_shape("columns", "a row needs at least one column"));
        }
        for name in &names {
            require_name("column name", name)?;
        }
        require_unique("row columns", names.iter().map(String::as_str))?;
        let row = DataType::Struct(
            names
                .into_iter()
                .zip(&arguments)
                .map(|(name, arg)| FieldType::new(name, arg.result_type().clone()))
                .collect(),
        );
        Ok(Expr::new(ExprKind::NewInstance { arguments }, row))
    }

    /// Instance of a row, entity or collection type from positional arguments.
    pub fn new_instance(&self, data_type: DataType, arguments: Vec<Expr>) -> Result<Expr> {
        let expected: Vec<DataType> = match &data_type {
            DataType::Struct(fields) => fields.iter().map(|f| f.data_type.clone()).collect(),
            DataType::Entity(entity) => {
                if entity.is_abstract {
                    return Err(BuildError::invalid_shape(
                        "type",
                        format!("{} is abstract", entity.name),
                    ));
                }
                entity.all_fields().iter().map(|f| f.data_type.clone()).collect()
            }
            DataType::Collection(element) => vec![(**element).clone(); arguments.len()],
            other => {
                return Err(BuildError::invalid_shape(
                    "type",
                    format!("cannot construct an instance of {other}"),
                ))
            }
        };
        if expected.len() != arguments.len() {
            return Err(BuildError::arity_mismatch(
                data_type.to_string(),
                expected.len(),
                arguments.len(),
            ));
        }
        for (idx, (expected, argument)) in expected.iter().zip(&arguments).enumerate() {
            if !self.resolver.is_promotable(argument.result_type(), expected) {
                return Err(BuildError::type_mismatch(
                    format!("arguments[{idx}]"),
                    format!("expected {expected}, got {}", argument.result_type()),
                ));
            }
        }
        Ok(Expr::new(ExprKind::NewInstance { arguments }, data_type))
    }

    /// Collection literal typed by the common type of its elements.
    pub fn new_collection(&self, elements: Vec<Expr>) -> Result<Expr> {
        let mut iter = elements.iter();
        let first = iter
            .next()
            .ok_or_else(|| BuildError::invalid_shape("elements", "use an empty collection for zero elements"))?;
        let mut element_type = first.result_type().clone();
        for element in iter {
            element_type = self
                .resolver
                .validate_common_type("elements", &element_type, element.result_type())?;
        }
        Ok(Expr::new(
            ExprKind::NewInstance { arguments: elements },
            DataType::collection_of(element_type),
        ))
    }

    pub fn new_empty_collection(&self, element_type: DataType) -> Expr {
        Expr::new(
            ExprKind::NewInstance {
                arguments: Vec::new(),
            },
            DataType::collection_of(element_type),
        )
    }

    // ---- Type operators ----

    pub fn cast(&self, argument: Expr, to: DataType) -> Result<Expr> {
        let result_type = self.resolver.validate_cast(argument.result_type(), &to)?;
        Ok(Expr::new(ExprKind::Cast { argument }, result_type))
    }

    pub fn treat(&self, argument: Expr, to: DataType) -> Result<Expr> {
        self.resolver.validate_polymorphic(argument.result_type(), &to)?;
        Ok(Expr::new(ExprKind::Treat { argument }, to))
    }

    pub fn is_of(&self, argument: Expr, of_type: DataType, only: bool) -> Result<Expr> {
        self.resolver
            .validate_polymorphic(argument.result_type(), &of_type)?;
        Ok(Expr::new(
            ExprKind::IsOf {
                argument,
                of_type,
                only,
            },
            DataType::Bool,
        ))
    }

    pub fn of_type(&self, argument: Expr, of_type: DataType, only: bool) -> Result<Expr> {
        let element = self
            .resolver
            .validate_collection("argument", argument.result_type())?;
        self.resolver.validate_polymorphic(&element, &of_type)?;
        let result_type = DataType::collection_of(of_type.clone());
        Ok(Expr::new(
            ExprKind::OfType {
                argument,
                of_type,
                only,
            },
            result_type,
        ))
    }

    // ---- Reference operators ----

    pub fn deref(&self, argument: Expr) -> Result<Expr> {
        let entity = argument.result_type().ref_entity_type().cloned().ok_or_else(|| {
            BuildError::type_mismatch("argument", format!("expected a Ref, got {}", argument.result_type()))
        })?;
        Ok(Expr::new(ExprKind::Deref { argument }, DataType::Entity(entity)))
    }

    pub fn entity_ref(&self, argument: Expr) -> Result<Expr> {
        let entity = argument.result_type().entity_type().cloned().ok_or_else(|| {
            BuildError::type_mismatch("argument", format!("expected an entity, got {}", argument.result_type()))
        })?;
        Ok(Expr::new(ExprKind::EntityRef { argument }, DataType::Ref(entity)))
    }

    /// Reference to the entity of `target` identified by `key_values`, in key order.
    pub fn create_ref(&self, target: &Arc<EntitySet>, key_values: Vec<Expr>) -> Result<Expr> {
        let entity = &target.element_type;
        let key_fields = entity.key_fields();
        if key_fields.is_empty() {
            return Err(BuildError::invalid_shape(
                "target",
                format!("{} declares no key", entity.name),
            ));
        }
        if key_fields.len() != key_values.len() {
            return Err(BuildError::arity_mismatch(
                format!("key of {}", entity.name),
                key_fields.len(),
                key_values.len(),
            ));
        }
        for (field, value) in key_fields.iter().zip(&key_values) {
            if !self.resolver.is_promotable(value.result_type(), &field.data_type) {
                return Err(BuildError::type_mismatch(
                    field.name.clone(),
                    format!("expected {}, got {}", field.data_type, value.result_type()),
                ));
            }
        }
        let columns: Vec<(String, Expr)> = key_fields
            .iter()
            .map(|f| f.name.clone())
            .zip(key_values)
            .collect();
        let key = self.new_row(columns)?;
        Ok(Expr::new(
            ExprKind::CreateRef {
                target: target.clone(),
                key,
            },
            DataType::Ref(entity.clone()),
        ))
    }

    pub fn ref_key(&self, argument: Expr) -> Result<Expr> {
        let entity = argument.result_type().ref_entity_type().cloned().ok_or_else(|| {
            BuildError::type_mismatch("argument", format!("expected a Ref, got {}", argument.result_type()))
        })?;
        Ok(Expr::new(ExprKind::RefKey { argument }, entity.key_row_type()))
    }

    /// Navigation from an entity or entity reference across `relationship`.
    pub fn navigate(
        &self,
        source: Expr,
        relationship: &Arc<RelationshipType>,
        from_end: &str,
        to_end: &str,
    ) -> Result<Expr> {
        let end = |name: &str| {
            relationship.end(name).ok_or_else(|| {
                BuildError::invalid_shape(
                    "end",
                    format!("relationship {} has no end '{name}'", relationship.name),
                )
            })
        };
        let (from, to) = (end(from_end)?, end(to_end)?);
        if from.name == to.name {
            return Err(BuildError::name_conflict(from_end, "relationship navigation"));
        }
        let source_entity = match source.result_type() {
            DataType::Ref(entity) | DataType::Entity(entity) => entity,
            other => {
                return Err(BuildError::type_mismatch(
                    "source",
                    format!("expected a Ref or entity, got {other}"),
                ))
            }
        };
        if !source_entity.is_subtype_of(&from.entity) {
            return Err(BuildError::type_mismatch(
                "source",
                format!("{} is not {}", source_entity.name, from.entity.name),
            ));
        }
        let result_type = to.navigation_type();
        Ok(Expr::new(
            ExprKind::Navigate {
                source,
                relationship: relationship.clone(),
                from_end: from.name.clone(),
                to_end: to.name.clone(),
            },
            result_type,
        ))
    }

    // ---- Collection operators ----

    pub fn distinct(&self, argument: Expr) -> Result<Expr> {
        let element = self
            .resolver
            .validate_collection("argument", argument.result_type())?;
        if !self.resolver.is_equal_comparable(&element) {
            return Err(BuildError::type_mismatch(
                "argument",
                format!("{element} is not equality comparable"),
            ));
        }
        let result_type = argument.result_type().clone();
        Ok(Expr::new(ExprKind::Distinct { argument }, result_type))
    }

    pub fn element(&self, argument: Expr) -> Result<Expr> {
        let element = self
            .resolver
            .validate_collection("argument", argument.result_type())?;
        Ok(Expr::new(ExprKind::Element { argument }, element))
    }

    pub fn is_empty(&self, argument: Expr) -> Result<Expr> {
        self.resolver
            .validate_collection("argument", argument.result_type())?;
        Ok(Expr::new(ExprKind::IsEmpty { argument }, DataType::Bool))
    }

    fn set_operands(&self, left: &Expr, right: &Expr, require_comparable: bool) -> Result<DataType> {
        self.resolver.validate_collection("left", left.result_type())?;
        self.resolver.validate_collection("right", right.result_type())?;
        let common = self
            .resolver
            .validate_common_type("right", left.result_type(), right.result_type())?;
        if require_comparable {
            let element = self.resolver.validate_collection("left", &common)?;
            if !self.resolver.is_equal_comparable(&element) {
                return Err(BuildError::type_mismatch(
                    "left",
                    format!("{element} is not equality comparable"),
                ));
            }
        }
        Ok(common)
    }

    pub fn except(&self, left: Expr, right: Expr) -> Result<Expr> {
        self.set_operands(&left, &right, true)?;
        let result_type = left.result_type().clone();
        Ok(Expr::new(ExprKind::Except { left, right }, result_type))
    }

    pub fn intersect(&self, left: Expr, right: Expr) -> Result<Expr> {
        let result_type = self.set_operands(&left, &right, true)?;
        Ok(Expr::new(ExprKind::Intersect { left, right }, result_type))
    }

    pub fn union_all(&self, left: Expr, right: Expr) -> Result<Expr> {
        let result_type = self.set_operands(&left, &right, false)?;
        Ok(Expr::new(ExprKind::UnionAll { left, right }, result_type))
    }

    /// Counts for skip and limit: an integer constant or parameter, never negative.
    fn check_count(&self, argument: &str, count: &Expr) -> Result<()> {
        match count.kind() {
            ExprKind::Constant { value } if value.is_negative_integer() => {
                return Err(BuildError::invalid_shape(argument, "count must not be negative"))
            }
            ExprKind::Constant { .. } | ExprKind::ParameterRef { .. } => {}
            other => {
                return Err(BuildError::invalid_shape(
                    argument,
                    format!("expected a constant or parameter, got {}", other.name()),
                ))
            }
        }
        self.resolver.validate_count(argument, count.result_type())
    }

    pub fn limit(&self, argument: Expr, limit: Expr, with_ties: bool) -> Result<Expr> {
        self.resolver
            .validate_collection("argument", argument.result_type())?;
        self.check_count("limit", &limit)?;
        let result_type = argument.result_type().clone();
        Ok(Expr::new(
            ExprKind::Limit {
                argument,
                limit,
                with_ties,
            },
            result_type,
        ))
    }

    // ---- Relational operators ----

    pub fn filter(&self, input: ExpressionBinding, predicate: Expr) -> Result<Expr> {
        self.resolver
            .validate_boolean("predicate", predicate.result_type())?;
        let result_type = input.input().result_type().clone();
        Ok(Expr::new(ExprKind::Filter { input, predicate }, result_type))
    }

    pub fn project(&self, input: ExpressionBinding, projection: Expr) -> Result<Expr> {
        let result_type = DataType::collection_of(projection.result_type().clone());
        Ok(Expr::new(ExprKind::Project { input, projection }, result_type))
    }

    pub fn join(
        &self,
        join_type: JoinType,
        left: ExpressionBinding,
        right: ExpressionBinding,
        condition: Expr,
    ) -> Result<Expr> {
        require_unique("join", [left.variable_name(), right.variable_name()])?;
        self.resolver
            .validate_boolean("condition", condition.result_type())?;
        let result_type = binding_row(&[&left, &right]);
        Ok(Expr::new(
            ExprKind::Join {
                join_type,
                left,
                right,
                condition,
            },
            result_type,
        ))
    }

    pub fn cross_join(&self, inputs: Vec<ExpressionBinding>) -> Result<Expr> {
        if inputs.len() < 2 {
            return Err(BuildError::invalid_shape(
                "inputs",
                "a cross join needs at least two inputs",
            ));
        }
        require_unique("cross join", inputs.iter().map(|b| b.variable_name()))?;
        let result_type = binding_row(&inputs.iter().collect::<Vec<_>>());
        Ok(Expr::new(ExprKind::CrossJoin { inputs }, result_type))
    }

    pub fn apply(&self, apply_type: ApplyType, input: ExpressionBinding, apply: ExpressionBinding) -> Result<Expr> {
        require_unique("apply", [input.variable_name(), apply.variable_name()])?;
        let result_type = binding_row(&[&input, &apply]);
        Ok(Expr::new(
            ExprKind::Apply {
                apply_type,
                input,
                apply,
            },
            result_type,
        ))
    }

    pub fn aggregate(&self, function: Arc<FunctionSignature>, arguments: Vec<Expr>, distinct: bool) -> Result<Aggregate> {
        if !function.is_aggregate {
            return Err(BuildError::invalid_shape(
                "function",
                format!("{} is not an aggregate function", function.full_name()),
            ));
        }
        self.check_arguments(&function, &arguments)?;
        let result_type = function.return_type.clone();
        Ok(Aggregate::new(
            AggregateKind::Function {
                function,
                arguments,
                distinct,
            },
            result_type,
        ))
    }

    /// Nest aggregate: the group's elements as produced by `argument`.
    pub fn group_aggregate(&self, argument: Expr) -> Aggregate {
        let result_type = argument.result_type().clone();
        Aggregate::new(AggregateKind::Group { argument }, result_type)
    }

    pub fn group_by<K, A>(
        &self,
        input: GroupExpressionBinding,
        keys: impl IntoIterator<Item = (K, Expr)>,
        aggregates: impl IntoIterator<Item = (A, Aggregate)>,
    ) -> Result<Expr>
    where
        K: Into<String>,
        A: Into<String>,
    {
        let keys: Vec<(String, Expr)> = keys.into_iter().map(|(n, k)| (n.into(), k)).collect();
        let aggregates: Vec<(String, Aggregate)> =
            aggregates.into_iter().map(|(n, a)| (n.into(), a)).collect();
        if keys.is_empty() && aggregates.is_empty() {
            return Err(BuildError::invalid_shape(
                "keys",
                "a group-by needs at least one key or aggregate",
            ));
        }
        for (name, key) in &keys {
            require_name("key name", name)?;
            if !self.resolver.is_equal_comparable(key.result_type()) {
                return Err(BuildError::type_mismatch(
                    name.clone(),
                    format!("group key {} is not equality comparable", key.result_type()),
                ));
            }
        }
        for (name, _) in &aggregates {
            require_name("aggregate name", name)?;
        }
        require_unique(
            "group-by output",
            keys.iter()
                .map(|(n, _)| n.as_str())
                .chain(aggregates.iter().map(|(n, _)| n.as_str())),
        )?;
        let nests = aggregates
            .iter()
            .filter(|(_, a)| matches!(a.kind(), AggregateKind::Group { .. }))
            .count();
        if nests > 1 {
            return Err(BuildError::invalid_shape(
                "aggregates",
                "at most one group aggregate is allowed",
            ));
        }
        let row = DataType::Struct(
            keys.iter()
                .map(|(n, k)| FieldType::new(n.clone(), k.result_type().clone()))
                .chain(
                    aggregates
                        .iter()
                        .map(|(n, a)| FieldType::new(n.clone(), a.result_type().clone())),
                )
                .collect(),
        );
        Ok(Expr::new(
            ExprKind::GroupBy {
                input,
                keys,
                aggregates,
            },
            DataType::collection_of(row),
        ))
    }

    pub fn sort(&self, input: ExpressionBinding, order: Vec<SortClause>) -> Result<Expr> {
        if order.is_empty() {
            return Err(BuildError::invalid_shape("order", "at least one sort clause is required"));
        }
        let result_type = input.input().result_type().clone();
        Ok(Expr::new(ExprKind::Sort { input, order }, result_type))
    }

    pub fn skip(&self, input: ExpressionBinding, order: Vec<SortClause>, count: Expr) -> Result<Expr> {
        if order.is_empty() {
            return Err(BuildError::invalid_shape("order", "skip requires a sorted input"));
        }
        self.check_count("count", &count)?;
        let result_type = input.input().result_type().clone();
        Ok(Expr::new(
            ExprKind::Skip {
                input,
                order,
                count,
            },
            result_type,
        ))
    }

    pub fn quantifier(&self, quantifier: QuantifierType, input: ExpressionBinding, predicate: Expr) -> Result<Expr> {
        self.resolver
            .validate_boolean("predicate", predicate.result_type())?;
        Ok(Expr::new(
            ExprKind::Quantifier {
                quantifier,
                input,
                predicate,
            },
            DataType::Bool,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultTypeResolver, EntityType};

    fn products() -> Arc<EntitySet> {
        let product = EntityType::new(
            "Product",
            vec![
                FieldType::new("Id", DataType::Int32).required(),
                FieldType::new("Name", DataType::String),
            ],
        )
        .with_key(["Id"]);
        Arc::new(EntitySet::new("Products", Arc::new(product)))
    }

    #[test]
    fn test_bind_requires_collection() {
        let f = NodeFactory::new(&DefaultTypeResolver);
        let err = f.bind_as(f.constant(1), "x").unwrap_err();
        assert!(matches!(err, BuildError::InvalidShape { .. }));
        assert_eq!(
            f.bind_as(f.scan(&products()), "").unwrap_err(),
            BuildError::null_argument("name")
        );
    }

    #[test]
    fn test_new_row_rejects_duplicate_columns() {
        let f = NodeFactory::new(&DefaultTypeResolver);
        let err = f
            .new_row([("A", f.constant(1)), ("A", f.constant(2))])
            .unwrap_err();
        assert_eq!(err, BuildError::name_conflict("A", "row columns"));
    }

    #[test]
    fn test_join_rejects_same_variable_names() {
        let f = NodeFactory::new(&DefaultTypeResolver);
        let left = f.bind_as(f.scan(&products()), "p").unwrap();
        let right = f.bind_as(f.scan(&products()), "p").unwrap();
        let err = f
            .join(JoinType::Inner, left, right, f.constant(true))
            .unwrap_err();
        assert!(matches!(err, BuildError::NameConflict { .. }));
    }

    #[test]
    fn test_limit_rejects_negative_and_computed_counts() {
        let f = NodeFactory::new(&DefaultTypeResolver);
        let scan = f.scan(&products());
        assert!(f.limit(scan.clone(), f.constant(-1), false).is_err());
        let computed = f
            .arithmetic(ArithmeticOp::Add, vec![f.constant(1), f.constant(2)])
            .unwrap();
        assert!(matches!(
            f.limit(scan.clone(), computed, false),
            Err(BuildError::InvalidShape { .. })
        ));
        let param = f.parameter("n", DataType::Int64).unwrap();
        assert!(f.limit(scan, param, false).is_ok());
    }

    #[test]
    fn test_create_ref_and_key() {
        let f = NodeFactory::new(&DefaultTypeResolver);
        let set = products();
        let reference = f.create_ref(&set, vec![f.constant(7)]).unwrap();
        assert_eq!(
            reference.result_type(),
            &DataType::Ref(set.element_type.clone())
        );
        let key = f.ref_key(reference).unwrap();
        assert_eq!(key.result_type(), &set.element_type.key_row_type());
    }

    #[test]
    fn test_case_common_type() {
        let f = NodeFactory::new(&DefaultTypeResolver);
        let case = f
            .case(
                vec![f.constant(true)],
                vec![f.constant(1)],
                f.constant(2i64),
            )
            .unwrap();
        assert_eq!(case.result_type(), &DataType::Int64);
        assert!(f.case(vec![], vec![], f.constant(1)).is_err());
    }
}
