//! Closure-based combinators over a validated node factory
//!
//! A [`QueryBuilder`] carries everything construction depends on: the type
//! resolver, the function registry, the source of closure parameter names and
//! the builder configuration. Every combinator is all-or-nothing: it returns
//! either a complete node or the first [`BuildError`] encountered.

use crate::alias::{group_alias, next_alias};
use crate::binding;
use crate::config::{BuilderConfig, NameStrategy};
use crate::lambda::{convert_to_binding, convert_to_bindings, extract_parameter_names, Declared, NameExtractor, Synthesized};
use crate::selector::{self, IntoSelection};
use qtree_ir::{
    Aggregate, ApplyType, ArithmeticOp, BuildError, ComparisonOp, DataType, DefaultTypeResolver, EntitySet, Expr,
    ExprKind, ExpressionBinding, GroupExpressionBinding, JoinType, Lambda, NodeFactory, QuantifierType,
    RelationshipType, Result, SortClause, TypeResolver, Value,
};
use qtree_registry::FunctionRegistry;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static SHARED: OnceLock<QueryBuilder> = OnceLock::new();

#[derive(Clone)]
pub struct QueryBuilder {
    resolver: Arc<dyn TypeResolver>,
    registry: Arc<FunctionRegistry>,
    names: Arc<dyn NameExtractor>,
    config: BuilderConfig,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn built(node: Expr) -> Result<Expr> {
    debug!(kind = node.kind_name(), result_type = %node.result_type(), "Built node");
    Ok(node)
}

fn require_sort<'e>(operation: &str, sorted: &'e Expr) -> Result<(&'e ExpressionBinding, &'e [SortClause])> {
    match sorted.kind() {
        ExprKind::Sort { input, order } => Ok((input, order.as_slice())),
        _ => Err(BuildError::invalid_shape(
            "source",
            format!("{operation} requires a sort, got {}", sorted.kind_name()),
        )),
    }
}

impl QueryBuilder {
    /// Builder with the default resolver, the canonical functions and synthesized names.
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(DefaultTypeResolver),
            registry: Arc::new(FunctionRegistry::new()),
            names: Arc::new(Synthesized),
            config: BuilderConfig::default(),
        }
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        Self {
            config: config.clone(),
            ..Self::new()
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_name_extractor(mut self, names: Arc<dyn NameExtractor>) -> Self {
        self.names = names;
        self
    }

    /// Copy of this builder that binds the parameters of a combinator's first closure under `names`.
    ///
    /// Ignored when the configuration forces synthesized names.
    pub fn with_parameter_names<N: Into<String>>(&self, names: impl IntoIterator<Item = N>) -> Self {
        self.with_declared(Declared::single(names))
    }

    /// Like [`with_parameter_names`](Self::with_parameter_names), with one name list per closure
    /// in argument order, e.g. `[["o"], ["i"]]` for the two key closures of a join.
    pub fn with_closure_parameter_names<L, N>(&self, closures: impl IntoIterator<Item = L>) -> Self
    where
        L: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.with_declared(Declared(
            closures
                .into_iter()
                .map(|names| names.into_iter().map(Into::into).collect())
                .collect(),
        ))
    }

    fn with_declared(&self, declared: Declared) -> Self {
        let mut builder = self.clone();
        if self.config.parameter_names == NameStrategy::Declared {
            builder.names = Arc::new(declared);
        }
        builder
    }

    /// Process-wide builder used by the fluent extension traits.
    pub fn shared() -> &'static QueryBuilder {
        SHARED.get_or_init(QueryBuilder::new)
    }

    /// Makes `self` the shared builder. Fails, returning `self`, once the shared builder exists.
    pub fn install(self) -> std::result::Result<(), QueryBuilder> {
        SHARED.set(self)
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &dyn TypeResolver {
        self.resolver.as_ref()
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn factory(&self) -> NodeFactory<'_> {
        NodeFactory::new(self.resolver.as_ref())
    }

    fn names(&self) -> &dyn NameExtractor {
        match self.config.parameter_names {
            NameStrategy::Declared => self.names.as_ref(),
            NameStrategy::Synthesized => &Synthesized,
        }
    }

    /// Converts a selector result into a node.
    pub fn resolve(&self, value: impl IntoSelection) -> Result<Expr> {
        selector::resolve(&self.factory(), value.into_selection(), self.config.record_selectors)
    }

    // ---- Leaves ----

    pub fn scan(&self, target: &Arc<EntitySet>) -> Expr {
        self.factory().scan(target)
    }

    pub fn constant(&self, value: impl Into<Value>) -> Expr {
        self.factory().constant(value)
    }

    pub fn null(&self, data_type: DataType) -> Expr {
        self.factory().null(data_type)
    }

    pub fn parameter(&self, name: impl Into<String>, data_type: DataType) -> Result<Expr> {
        self.factory().parameter(name, data_type)
    }

    pub fn variable(&self, name: impl Into<String>, data_type: DataType) -> Result<Expr> {
        self.factory().variable(name, data_type)
    }

    // ---- Bindings ----

    pub fn bind(&self, input: Expr) -> Result<ExpressionBinding> {
        binding::bind(&self.factory(), input)
    }

    pub fn bind_as(&self, input: Expr, name: impl Into<String>) -> Result<ExpressionBinding> {
        binding::bind_as(&self.factory(), input, name)
    }

    pub fn group_bind(&self, input: Expr) -> Result<GroupExpressionBinding> {
        binding::group_bind(&self.factory(), input)
    }

    pub fn group_bind_as(
        &self,
        input: Expr,
        name: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Result<GroupExpressionBinding> {
        binding::group_bind_as(&self.factory(), input, name, group_name)
    }

    // ---- Projection and filtering ----

    pub fn select<F, R>(&self, source: Expr, projection: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (input, result) = convert_to_binding(&f, self.names(), 0, source, projection)?;
        let projection = self.resolve(result)?;
        built(f.project(input, projection)?)
    }

    pub fn where_<F, R>(&self, source: Expr, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (input, result) = convert_to_binding(&f, self.names(), 0, source, predicate)?;
        let predicate = self.resolve(result)?;
        built(f.filter(input, predicate)?)
    }

    // ---- Joins ----

    fn equi_join<FO, RO, FI, RI>(
        &self,
        outer: Expr,
        inner: Expr,
        outer_key: FO,
        inner_key: FI,
    ) -> Result<Expr>
    where
        FO: FnOnce(Expr) -> RO,
        RO: IntoSelection,
        FI: FnOnce(Expr) -> RI,
        RI: IntoSelection,
    {
        let f = self.factory();
        let (left, outer_result) = convert_to_binding(&f, self.names(), 0, outer, outer_key)?;
        let (right, inner_result) = convert_to_binding(&f, self.names(), 1, inner, inner_key)?;
        let condition = f.comparison(
            ComparisonOp::Eq,
            self.resolve(outer_result)?,
            self.resolve(inner_result)?,
        )?;
        f.join(JoinType::Inner, left, right, condition)
    }

    /// Inner join on `outer_key(o) == inner_key(i)`.
    pub fn join<FO, RO, FI, RI>(&self, outer: Expr, inner: Expr, outer_key: FO, inner_key: FI) -> Result<Expr>
    where
        FO: FnOnce(Expr) -> RO,
        RO: IntoSelection,
        FI: FnOnce(Expr) -> RI,
        RI: IntoSelection,
    {
        built(self.equi_join(outer, inner, outer_key, inner_key)?)
    }

    /// Equi-join followed by a projection of `selector(left, right)` over the joined rows.
    pub fn join_select<FO, RO, FI, RI, FS, RS>(
        &self,
        outer: Expr,
        inner: Expr,
        outer_key: FO,
        inner_key: FI,
        selector: FS,
    ) -> Result<Expr>
    where
        FO: FnOnce(Expr) -> RO,
        RO: IntoSelection,
        FI: FnOnce(Expr) -> RI,
        RI: IntoSelection,
        FS: FnOnce(Expr, Expr) -> RS,
        RS: IntoSelection,
    {
        let f = self.factory();
        let join = self.equi_join(outer, inner, outer_key, inner_key)?;
        let (left_name, right_name) = match join.kind() {
            ExprKind::Join { left, right, .. } => {
                (left.variable_name().to_string(), right.variable_name().to_string())
            }
            _ => return Err(BuildError::invalid_shape("join", "expected a join")),
        };
        let rows = binding::bind(&f, join)?;
        let left = f.property(rows.variable().clone(), left_name)?;
        let right = f.property(rows.variable().clone(), right_name)?;
        let projection = self.resolve(selector(left, right))?;
        built(f.project(rows, projection)?)
    }

    fn conditional_join<F, R>(&self, join_type: JoinType, left: Expr, right: Expr, condition: F) -> Result<Expr>
    where
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let ([left, right], result) = convert_to_bindings(&f, self.names(), 0, left, right, condition)?;
        let condition = self.resolve(result)?;
        built(f.join(join_type, left, right, condition)?)
    }

    pub fn inner_join<F, R>(&self, left: Expr, right: Expr, condition: F) -> Result<Expr>
    where
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        self.conditional_join(JoinType::Inner, left, right, condition)
    }

    pub fn left_outer_join<F, R>(&self, left: Expr, right: Expr, condition: F) -> Result<Expr>
    where
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        self.conditional_join(JoinType::Left, left, right, condition)
    }

    pub fn full_outer_join<F, R>(&self, left: Expr, right: Expr, condition: F) -> Result<Expr>
    where
        F: FnOnce(Expr, Expr) -> R,
        R: IntoSelection,
    {
        self.conditional_join(JoinType::Full, left, right, condition)
    }

    pub fn cross_join(&self, inputs: impl IntoIterator<Item = Expr>) -> Result<Expr> {
        let f = self.factory();
        let inputs = inputs
            .into_iter()
            .map(|input| binding::bind(&f, input))
            .collect::<Result<Vec<_>>>()?;
        built(f.cross_join(inputs)?)
    }

    // ---- Apply ----

    fn apply_with<F, N, C>(&self, apply_type: ApplyType, source: Expr, apply: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> (N, C),
        N: Into<String>,
        C: IntoSelection,
    {
        let f = self.factory();
        let (input, (name, collection)) = convert_to_binding(&f, self.names(), 0, source, apply)?;
        let collection = self.resolve(collection)?;
        let apply = binding::bind_as(&f, collection, name)?;
        built(f.apply(apply_type, input, apply)?)
    }

    /// Cross apply of the named collection returned by `apply`; rows without inner elements are dropped.
    pub fn cross_apply<F, N, C>(&self, source: Expr, apply: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> (N, C),
        N: Into<String>,
        C: IntoSelection,
    {
        self.apply_with(ApplyType::Cross, source, apply)
    }

    /// Like [`cross_apply`](Self::cross_apply) but keeps outer rows with an empty inner collection.
    pub fn outer_apply<F, N, C>(&self, source: Expr, apply: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> (N, C),
        N: Into<String>,
        C: IntoSelection,
    {
        self.apply_with(ApplyType::Outer, source, apply)
    }

    /// Cross-applies `selector` to each element and returns the binding names and the apply node.
    fn flatten<F, R>(&self, source: Expr, selector: F) -> Result<(String, String, Expr)>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (input, result) = convert_to_binding(&f, self.names(), 0, source, selector)?;
        let collection = self.resolve(result)?;
        let functor = binding::bind(&f, collection)?;
        let names = (input.variable_name().to_string(), functor.variable_name().to_string());
        let apply = f.apply(ApplyType::Cross, input, functor)?;
        Ok((names.0, names.1, apply))
    }

    /// Flattens the collections produced by `selector` into one collection.
    pub fn select_many<F, R>(&self, source: Expr, selector: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (_, functor_name, apply) = self.flatten(source, selector)?;
        let rows = binding::bind(&f, apply)?;
        let element = f.property(rows.variable().clone(), functor_name)?;
        built(f.project(rows, element)?)
    }

    /// Flattens and projects `result(source_element, collection_element)`.
    pub fn select_many_with<F, R, FR, RR>(&self, source: Expr, selector: F, result: FR) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
        FR: FnOnce(Expr, Expr) -> RR,
        RR: IntoSelection,
    {
        let f = self.factory();
        let (input_name, functor_name, apply) = self.flatten(source, selector)?;
        let rows = binding::bind(&f, apply)?;
        let outer = f.property(rows.variable().clone(), input_name)?;
        let inner = f.property(rows.variable().clone(), functor_name)?;
        let projection = self.resolve(result(outer, inner))?;
        built(f.project(rows, projection)?)
    }

    // ---- Grouping ----

    /// Groups `source` by `key` and computes the aggregates returned for each group.
    ///
    /// A row-constructing key contributes one key per column; any other key is
    /// named `Key`. The aggregates closure receives the group variable, a
    /// collection of the group's elements.
    pub fn group_by<K, KR, A, I, N>(&self, source: Expr, key: K, aggregates: A) -> Result<Expr>
    where
        K: FnOnce(Expr) -> KR,
        KR: IntoSelection,
        A: FnOnce(Expr) -> I,
        I: IntoIterator<Item = (N, Result<Aggregate>)>,
        N: Into<String>,
    {
        let f = self.factory();
        let name = extract_parameter_names(self.names(), 0, 1)
            .into_iter()
            .next()
            .unwrap_or_else(next_alias);
        let group_name = group_alias(&name);
        let input = binding::group_bind_as(&f, source, name, group_name)?;

        let key = self.resolve(key(input.variable().clone()))?;
        let keys: Vec<(String, Expr)> = match (key.kind(), key.result_type()) {
            (ExprKind::NewInstance { arguments }, DataType::Struct(fields)) => fields
                .iter()
                .map(|field| field.name.clone())
                .zip(arguments.iter().cloned())
                .collect(),
            _ => vec![("Key".to_string(), key.clone())],
        };

        let aggregates = aggregates(input.group_variable().clone())
            .into_iter()
            .map(|(name, aggregate)| aggregate.map(|aggregate| (name.into(), aggregate)))
            .collect::<Result<Vec<(String, Aggregate)>>>()?;

        built(f.group_by(input, keys, aggregates)?)
    }

    // ---- Ordering ----

    fn sort_by<F, R>(&self, source: Expr, key: F, ascending: bool, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (input, result) = convert_to_binding(&f, self.names(), 0, source, key)?;
        let clause = f.sort_clause(self.resolve(result)?, ascending, collation)?;
        built(f.sort(input, vec![clause])?)
    }

    pub fn order_by<F, R>(&self, source: Expr, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.sort_by(source, key, true, "")
    }

    pub fn order_by_descending<F, R>(&self, source: Expr, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.sort_by(source, key, false, "")
    }

    pub fn order_by_with_collation<F, R>(&self, source: Expr, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.sort_by(source, key, true, collation)
    }

    pub fn order_by_descending_with_collation<F, R>(&self, source: Expr, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.sort_by(source, key, false, collation)
    }

    /// Appends a clause to an existing sort, keyed against the sort's own input variable.
    fn append_sort_key<F, R>(&self, sorted: Expr, key: F, ascending: bool, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (input, order) = require_sort("then_by", &sorted)?;
        let key = self.resolve(key(input.variable().clone()))?;
        let mut order = order.to_vec();
        order.push(f.sort_clause(key, ascending, collation)?);
        built(f.sort(input.clone(), order)?)
    }

    pub fn then_by<F, R>(&self, sorted: Expr, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.append_sort_key(sorted, key, true, "")
    }

    pub fn then_by_descending<F, R>(&self, sorted: Expr, key: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.append_sort_key(sorted, key, false, "")
    }

    pub fn then_by_with_collation<F, R>(&self, sorted: Expr, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.append_sort_key(sorted, key, true, collation)
    }

    pub fn then_by_descending_with_collation<F, R>(&self, sorted: Expr, key: F, collation: &str) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.append_sort_key(sorted, key, false, collation)
    }

    // ---- Paging ----

    /// Skips `count` elements of a sorted input, keeping its binding and order.
    pub fn skip(&self, sorted: Expr, count: impl IntoSelection) -> Result<Expr> {
        let (input, order) = require_sort("skip", &sorted)?;
        let count = self.resolve(count)?;
        built(self.factory().skip(input.clone(), order.to_vec(), count)?)
    }

    /// First `count` elements; ties are not included.
    pub fn take(&self, source: Expr, count: impl IntoSelection) -> Result<Expr> {
        self.limit(source, count)
    }

    pub fn limit(&self, source: Expr, count: impl IntoSelection) -> Result<Expr> {
        let count = self.resolve(count)?;
        built(self.factory().limit(source, count, false)?)
    }

    pub fn limit_with_ties(&self, source: Expr, count: impl IntoSelection) -> Result<Expr> {
        let count = self.resolve(count)?;
        built(self.factory().limit(source, count, true)?)
    }

    // ---- Quantifiers ----

    fn quantify<F, R>(&self, quantifier: QuantifierType, source: Expr, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let (input, result) = convert_to_binding(&f, self.names(), 0, source, predicate)?;
        let predicate = self.resolve(result)?;
        built(f.quantifier(quantifier, input, predicate)?)
    }

    pub fn all<F, R>(&self, source: Expr, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.quantify(QuantifierType::All, source, predicate)
    }

    pub fn any_where<F, R>(&self, source: Expr, predicate: F) -> Result<Expr>
    where
        F: FnOnce(Expr) -> R,
        R: IntoSelection,
    {
        self.quantify(QuantifierType::Any, source, predicate)
    }

    /// True when `source` has at least one element.
    pub fn any(&self, source: Expr) -> Result<Expr> {
        let f = self.factory();
        built(f.not(f.is_empty(source)?)?)
    }

    pub fn exists(&self, source: Expr) -> Result<Expr> {
        self.any(source)
    }

    // ---- Set operations ----

    pub fn except(&self, left: Expr, right: Expr) -> Result<Expr> {
        built(self.factory().except(left, right)?)
    }

    pub fn intersect(&self, left: Expr, right: Expr) -> Result<Expr> {
        built(self.factory().intersect(left, right)?)
    }

    pub fn union_all(&self, left: Expr, right: Expr) -> Result<Expr> {
        built(self.factory().union_all(left, right)?)
    }

    /// Duplicate-free union: `distinct(union_all(left, right))`.
    pub fn union(&self, left: Expr, right: Expr) -> Result<Expr> {
        let f = self.factory();
        built(f.distinct(f.union_all(left, right)?)?)
    }

    pub fn distinct(&self, source: Expr) -> Result<Expr> {
        built(self.factory().distinct(source)?)
    }

    pub fn element(&self, source: Expr) -> Result<Expr> {
        self.factory().element(source)
    }

    pub fn is_empty(&self, source: Expr) -> Result<Expr> {
        self.factory().is_empty(source)
    }

    // ---- Scalar operators ----

    pub fn property(&self, instance: Expr, name: impl Into<String>) -> Result<Expr> {
        self.factory().property(instance, name)
    }

    fn arithmetic(&self, op: ArithmeticOp, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        let right = self.resolve(right)?;
        self.factory().arithmetic(op, vec![left, right])
    }

    pub fn plus(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        self.arithmetic(ArithmeticOp::Add, left, right)
    }

    pub fn minus(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        self.arithmetic(ArithmeticOp::Sub, left, right)
    }

    pub fn multiply(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        self.arithmetic(ArithmeticOp::Mul, left, right)
    }

    pub fn divide(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        self.arithmetic(ArithmeticOp::Div, left, right)
    }

    pub fn modulo(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        self.arithmetic(ArithmeticOp::Mod, left, right)
    }

    pub fn negate(&self, argument: Expr) -> Result<Expr> {
        self.factory().arithmetic(ArithmeticOp::Neg, vec![argument])
    }

    pub fn compare(&self, op: ComparisonOp, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        let right = self.resolve(right)?;
        self.factory().comparison(op, left, right)
    }

    pub fn and(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        let right = self.resolve(right)?;
        self.factory().and(left, right)
    }

    pub fn or(&self, left: Expr, right: impl IntoSelection) -> Result<Expr> {
        let right = self.resolve(right)?;
        self.factory().or(left, right)
    }

    pub fn not(&self, argument: Expr) -> Result<Expr> {
        self.factory().not(argument)
    }

    pub fn in_list<S: IntoSelection>(&self, item: Expr, list: impl IntoIterator<Item = S>) -> Result<Expr> {
        let list = list
            .into_iter()
            .map(|value| self.resolve(value))
            .collect::<Result<Vec<_>>>()?;
        self.factory().in_list(item, list)
    }

    pub fn is_null(&self, argument: Expr) -> Result<Expr> {
        self.factory().is_null(argument)
    }

    pub fn like(&self, argument: Expr, pattern: impl IntoSelection) -> Result<Expr> {
        let pattern = self.resolve(pattern)?;
        self.factory().like(argument, pattern, None)
    }

    pub fn like_with_escape(
        &self,
        argument: Expr,
        pattern: impl IntoSelection,
        escape: impl IntoSelection,
    ) -> Result<Expr> {
        let pattern = self.resolve(pattern)?;
        let escape = self.resolve(escape)?;
        self.factory().like(argument, pattern, Some(escape))
    }

    /// `CASE WHEN whens[i] THEN thens[i] ... ELSE otherwise END`.
    pub fn case(&self, whens: Vec<Expr>, thens: Vec<Expr>, otherwise: impl IntoSelection) -> Result<Expr> {
        let otherwise = self.resolve(otherwise)?;
        self.factory().case(whens, thens, otherwise)
    }

    pub fn new_row<N, S>(&self, columns: impl IntoIterator<Item = (N, S)>) -> Result<Expr>
    where
        N: Into<String>,
        S: IntoSelection,
    {
        let columns = columns
            .into_iter()
            .map(|(name, value)| Ok((name.into(), self.resolve(value)?)))
            .collect::<Result<Vec<(String, Expr)>>>()?;
        self.factory().new_row(columns)
    }

    pub fn new_instance(&self, data_type: DataType, arguments: Vec<Expr>) -> Result<Expr> {
        self.factory().new_instance(data_type, arguments)
    }

    pub fn new_collection(&self, elements: Vec<Expr>) -> Result<Expr> {
        self.factory().new_collection(elements)
    }

    pub fn new_empty_collection(&self, element_type: DataType) -> Expr {
        self.factory().new_empty_collection(element_type)
    }

    // ---- Type and reference operators ----

    pub fn cast_to(&self, argument: Expr, to: DataType) -> Result<Expr> {
        self.factory().cast(argument, to)
    }

    pub fn treat_as(&self, argument: Expr, to: DataType) -> Result<Expr> {
        self.factory().treat(argument, to)
    }

    pub fn is_of(&self, argument: Expr, of_type: DataType) -> Result<Expr> {
        self.factory().is_of(argument, of_type, false)
    }

    pub fn is_of_only(&self, argument: Expr, of_type: DataType) -> Result<Expr> {
        self.factory().is_of(argument, of_type, true)
    }

    pub fn of_type(&self, argument: Expr, of_type: DataType) -> Result<Expr> {
        self.factory().of_type(argument, of_type, false)
    }

    pub fn of_type_only(&self, argument: Expr, of_type: DataType) -> Result<Expr> {
        self.factory().of_type(argument, of_type, true)
    }

    pub fn deref(&self, argument: Expr) -> Result<Expr> {
        self.factory().deref(argument)
    }

    pub fn get_entity_ref(&self, argument: Expr) -> Result<Expr> {
        self.factory().entity_ref(argument)
    }

    pub fn get_ref_key(&self, argument: Expr) -> Result<Expr> {
        self.factory().ref_key(argument)
    }

    pub fn create_ref<S: IntoSelection>(
        &self,
        target: &Arc<EntitySet>,
        key_values: impl IntoIterator<Item = S>,
    ) -> Result<Expr> {
        let key_values = key_values
            .into_iter()
            .map(|value| self.resolve(value))
            .collect::<Result<Vec<_>>>()?;
        self.factory().create_ref(target, key_values)
    }

    pub fn navigate(
        &self,
        source: Expr,
        relationship: &Arc<RelationshipType>,
        from_end: &str,
        to_end: &str,
    ) -> Result<Expr> {
        self.factory().navigate(source, relationship, from_end, to_end)
    }

    // ---- Functions and lambdas ----

    /// Invokes the registered function `name`, picking the overload for the argument types.
    pub fn invoke(&self, name: &str, arguments: Vec<Expr>) -> Result<Expr> {
        let types: Vec<DataType> = arguments.iter().map(|a| a.result_type().clone()).collect();
        let function = self.registry.lookup(name, &types, self.resolver())?;
        self.factory().function(function, arguments)
    }

    fn aggregate_with(&self, name: &str, arguments: Vec<Expr>, distinct: bool) -> Result<Aggregate> {
        let types: Vec<DataType> = arguments.iter().map(|a| a.result_type().clone()).collect();
        let function = self.registry.lookup(name, &types, self.resolver())?;
        self.factory().aggregate(function, arguments, distinct)
    }

    /// Function aggregate over a group collection.
    pub fn aggregate(&self, name: &str, arguments: Vec<Expr>) -> Result<Aggregate> {
        self.aggregate_with(name, arguments, false)
    }

    pub fn aggregate_distinct(&self, name: &str, arguments: Vec<Expr>) -> Result<Aggregate> {
        self.aggregate_with(name, arguments, true)
    }

    /// Nest aggregate producing the group's elements.
    pub fn group_aggregate(&self, argument: Expr) -> Result<Aggregate> {
        Ok(self.factory().group_aggregate(argument))
    }

    /// Inline function of the given parameter types; `body` receives the parameter variables.
    pub fn lambda<F, R>(&self, parameter_types: Vec<DataType>, body: F) -> Result<Lambda>
    where
        F: FnOnce(&[Expr]) -> R,
        R: IntoSelection,
    {
        let f = self.factory();
        let names = extract_parameter_names(self.names(), 0, parameter_types.len());
        let parameters = names
            .into_iter()
            .zip(parameter_types)
            .map(|(name, data_type)| f.variable(name, data_type))
            .collect::<Result<Vec<_>>>()?;
        let body = self.resolve(body(&parameters))?;
        f.lambda(parameters, body)
    }

    pub fn invoke_lambda(&self, lambda: Lambda, arguments: Vec<Expr>) -> Result<Expr> {
        self.factory().invoke(lambda, arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtree_ir::{EntityType, FieldType};

    fn numbers() -> (QueryBuilder, Expr) {
        let qb = QueryBuilder::new();
        let list = qb
            .new_collection(vec![qb.constant(3), qb.constant(1), qb.constant(2)])
            .unwrap();
        (qb, list)
    }

    #[test]
    fn test_with_parameter_names_respects_strategy() {
        let (qb, list) = numbers();
        let declared = qb.with_parameter_names(["n"]);
        let filter = declared
            .where_(list.clone(), |n| declared.compare(ComparisonOp::Gt, n, 1))
            .unwrap();
        let ExprKind::Filter { input, .. } = filter.kind() else {
            panic!("expected filter");
        };
        assert_eq!(input.variable_name(), "n");

        let forced = QueryBuilder::from_config(&BuilderConfig {
            parameter_names: NameStrategy::Synthesized,
            record_selectors: true,
        })
        .with_parameter_names(["n"]);
        let filter = forced
            .where_(list, |n| forced.compare(ComparisonOp::Gt, n, 1))
            .unwrap();
        let ExprKind::Filter { input, .. } = filter.kind() else {
            panic!("expected filter");
        };
        assert_ne!(input.variable_name(), "n");
    }

    #[test]
    fn test_join_key_closures_named_by_position() {
        let (qb, list) = numbers();
        let named = qb.with_closure_parameter_names([["o"], ["i"]]);
        let joined = named.join(list.clone(), list.clone(), |o| o, |i| i).unwrap();
        let ExprKind::Join { left, right, .. } = joined.kind() else {
            panic!("expected join");
        };
        assert_eq!(left.variable_name(), "o");
        assert_eq!(right.variable_name(), "i");

        let first_only = qb.with_parameter_names(["p"]);
        let joined = first_only.join(list.clone(), list, |o| o, |i| i).unwrap();
        let ExprKind::Join { left, right, .. } = joined.kind() else {
            panic!("expected join");
        };
        assert_eq!(left.variable_name(), "p");
        assert_ne!(right.variable_name(), "p");
    }

    #[test]
    fn test_then_by_requires_sort() {
        let (qb, list) = numbers();
        let err = qb.then_by(list, |n| n).unwrap_err();
        assert!(matches!(err, BuildError::InvalidShape { .. }));
    }

    #[test]
    fn test_take_builds_limit_without_ties() {
        let (qb, list) = numbers();
        let limited = qb.take(list, 2).unwrap();
        assert!(matches!(limited.kind(), ExprKind::Limit { with_ties: false, .. }));
        assert!(qb.take(qb.constant(1), 2).is_err());
    }

    #[test]
    fn test_lambda_invocation() {
        let qb = QueryBuilder::new();
        let lambda = qb
            .lambda(vec![DataType::Int32, DataType::Int32], |params| {
                qb.plus(params[0].clone(), params[1].clone())
            })
            .unwrap();
        let call = qb
            .invoke_lambda(lambda, vec![qb.constant(1), qb.constant(2)])
            .unwrap();
        assert_eq!(call.kind_name(), "Lambda");
        assert_eq!(call.result_type(), &DataType::Int32);
    }

    #[test]
    fn test_invoke_unknown_function() {
        let qb = QueryBuilder::new();
        let err = qb.invoke("Soundex", vec![qb.constant("x")]).unwrap_err();
        assert!(matches!(err, BuildError::FunctionNotFound { .. }));
    }

    #[test]
    fn test_records_disabled_by_config() {
        let product = Arc::new(EntityType::new("Product", vec![FieldType::new("Id", DataType::Int32)]));
        let products = Arc::new(EntitySet::new("Products", product));
        let qb = QueryBuilder::from_config(&BuilderConfig {
            parameter_names: NameStrategy::Declared,
            record_selectors: false,
        });
        let err = qb
            .select(qb.scan(&products), |p| crate::record! { Id: qb.property(p, "Id") })
            .unwrap_err();
        assert!(matches!(err, BuildError::NotSupported { .. }));
    }
}
