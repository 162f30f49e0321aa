//! Lambda adaptation
//!
//! Closures are invoked against bound variables. Their parameter names cannot
//! be observed at runtime, so a [`NameExtractor`] supplies the declared names
//! for a closure, identified by its position among the combinator's closures
//! and its arity; whenever those names are unusable every name is synthesized
//! instead.

use crate::alias::next_alias;
use crate::binding::bind_as;
use qtree_ir::{Expr, ExpressionBinding, NodeFactory, Result};
use tracing::trace;

/// A formal parameter as reported by a [`NameExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Named(String),
    Unnamed,
    /// Synthetic closure-environment carrier; never bound.
    Environment,
}

/// Source of formal parameter names for closures.
///
/// `position` is the index of the closure among the closure arguments of one
/// combinator call: `join(outer, inner, |o| .., |i| ..)` asks for position 0
/// and then position 1.
pub trait NameExtractor: Send + Sync {
    fn declared_parameters(&self, position: usize, arity: usize) -> Vec<Parameter>;
}

/// Always synthesizes names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesized;

impl NameExtractor for Synthesized {
    fn declared_parameters(&self, _position: usize, arity: usize) -> Vec<Parameter> {
        vec![Parameter::Unnamed; arity]
    }
}

/// Names declared by the caller: one list per closure position, each in parameter order.
///
/// Positions without a list are synthesized.
#[derive(Debug, Clone, Default)]
pub struct Declared(pub Vec<Vec<String>>);

impl Declared {
    /// Names for the first closure only.
    pub fn single<N: Into<String>>(names: impl IntoIterator<Item = N>) -> Self {
        Self(vec![names.into_iter().map(Into::into).collect()])
    }
}

impl NameExtractor for Declared {
    fn declared_parameters(&self, position: usize, arity: usize) -> Vec<Parameter> {
        match self.0.get(position) {
            Some(names) => names.iter().cloned().map(Parameter::Named).collect(),
            None => vec![Parameter::Unnamed; arity],
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// One name per parameter, in declaration order.
///
/// Environment parameters are dropped first. If any remaining parameter is
/// unnamed or not an identifier, or the count differs from `arity`, all names
/// are generated.
pub fn extract_parameter_names(extractor: &dyn NameExtractor, position: usize, arity: usize) -> Vec<String> {
    let declared: Vec<Parameter> = extractor
        .declared_parameters(position, arity)
        .into_iter()
        .filter(|p| *p != Parameter::Environment)
        .collect();

    let names: Option<Vec<String>> = declared
        .into_iter()
        .map(|p| match p {
            Parameter::Named(name) if is_identifier(&name) => Some(name),
            _ => None,
        })
        .collect();

    match names {
        Some(names) if names.len() == arity => names,
        _ => {
            trace!(position, arity, "Synthesizing parameter names");
            (0..arity).map(|_| next_alias()).collect()
        }
    }
}

/// Binds `source`, invokes `selector` with the bound variable and returns both.
///
/// `position` identifies the closure for the name extractor.
pub fn convert_to_binding<F, R>(
    factory: &NodeFactory<'_>,
    names: &dyn NameExtractor,
    position: usize,
    source: Expr,
    selector: F,
) -> Result<(ExpressionBinding, R)>
where
    F: FnOnce(Expr) -> R,
{
    let mut names = extract_parameter_names(names, position, 1).into_iter();
    let name = names.next().unwrap_or_else(next_alias);
    let binding = bind_as(factory, source, name)?;
    let result = selector(binding.variable().clone());
    Ok((binding, result))
}

/// Two-input form of [`convert_to_binding`], binding `left` and `right` in parameter order.
pub fn convert_to_bindings<F, R>(
    factory: &NodeFactory<'_>,
    names: &dyn NameExtractor,
    position: usize,
    left: Expr,
    right: Expr,
    selector: F,
) -> Result<([ExpressionBinding; 2], R)>
where
    F: FnOnce(Expr, Expr) -> R,
{
    let mut names = extract_parameter_names(names, position, 2).into_iter();
    let left_name = names.next().unwrap_or_else(next_alias);
    let right_name = names.next().unwrap_or_else(next_alias);
    let left = bind_as(factory, left, left_name)?;
    let right = bind_as(factory, right, right_name)?;
    let result = selector(left.variable().clone(), right.variable().clone());
    Ok(([left, right], result))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Parameter>);

    impl NameExtractor for Fixed {
        fn declared_parameters(&self, _position: usize, _arity: usize) -> Vec<Parameter> {
            self.0.clone()
        }
    }

    fn named(name: &str) -> Parameter {
        Parameter::Named(name.to_string())
    }

    #[test]
    fn test_declared_names_used_when_valid() {
        let names = extract_parameter_names(&Declared::single(["o", "c"]), 0, 2);
        assert_eq!(names, vec!["o", "c"]);
    }

    #[test]
    fn test_any_invalid_name_synthesizes_all() {
        let names = extract_parameter_names(&Fixed(vec![named("o"), named("2x")]), 0, 2);
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.starts_with("Var_")));

        let names = extract_parameter_names(&Fixed(vec![named("o"), Parameter::Unnamed]), 0, 2);
        assert!(names.iter().all(|n| n.starts_with("Var_")));
    }

    #[test]
    fn test_environment_parameter_skipped() {
        let extractor = Fixed(vec![Parameter::Environment, named("p")]);
        assert_eq!(extract_parameter_names(&extractor, 0, 1), vec!["p"]);
    }

    #[test]
    fn test_wrong_count_synthesizes() {
        let names = extract_parameter_names(&Declared::single(["p"]), 0, 2);
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], "p");
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn test_declared_names_keyed_by_position() {
        let declared = Declared(vec![vec!["o".into()], vec!["i".into()]]);
        assert_eq!(extract_parameter_names(&declared, 0, 1), vec!["o"]);
        assert_eq!(extract_parameter_names(&declared, 1, 1), vec!["i"]);

        let names = extract_parameter_names(&declared, 2, 1);
        assert!(names[0].starts_with("Var_"));
    }

    #[test]
    fn test_synthesized_extractor() {
        let names = extract_parameter_names(&Synthesized, 0, 3);
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("_tmp1"));
        assert!(is_identifier("Produkt"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
