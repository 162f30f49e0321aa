//! Indented tree dump used by `Display for Expr`

use crate::expr::{AggregateKind, Expr, ExprKind, ExpressionBinding, SortClause};
use std::fmt::{self, Write};

const INDENT: &str = "  ";

struct TreePrinter<'f, 'w> {
    out: &'f mut fmt::Formatter<'w>,
}

impl TreePrinter<'_, '_> {
    fn line(&mut self, depth: usize, text: &str) -> fmt::Result {
        for _ in 0..depth {
            self.out.write_str(INDENT)?;
        }
        self.out.write_str(text)?;
        self.out.write_char('\n')
    }

    fn labelled(&mut self, depth: usize, label: &str, expr: &Expr) -> fmt::Result {
        self.line(depth, &format!("{label}:"))?;
        self.node(depth + 1, expr)
    }

    fn binding(&mut self, depth: usize, label: &str, binding: &ExpressionBinding) -> fmt::Result {
        self.line(depth, &format!("{label} as {}:", binding.variable_name()))?;
        self.node(depth + 1, binding.input())
    }

    fn order(&mut self, depth: usize, order: &[SortClause]) -> fmt::Result {
        for clause in order {
            let direction = if clause.ascending() { "Asc" } else { "Desc" };
            let header = if clause.collation().is_empty() {
                format!("SortKey {direction}:")
            } else {
                format!("SortKey {direction} collate {}:", clause.collation())
            };
            self.line(depth, &header)?;
            self.node(depth + 1, clause.key())?;
        }
        Ok(())
    }

    fn detail(expr: &Expr) -> String {
        match expr.kind() {
            ExprKind::Scan { target } => format!(" {}", target.name),
            ExprKind::Constant { value } => format!(" {value}"),
            ExprKind::VariableRef { name } => format!(" {name}"),
            ExprKind::ParameterRef { name } => format!(" @{name}"),
            ExprKind::Property { name, .. } => format!(" .{name}"),
            ExprKind::Function { function, .. } => format!(" {}", function.full_name()),
            ExprKind::IsOf { of_type, .. } | ExprKind::OfType { of_type, .. } => {
                format!(" {of_type}")
            }
            ExprKind::CreateRef { target, .. } => format!(" {}", target.name),
            ExprKind::Navigate {
                relationship,
                from_end,
                to_end,
                ..
            } => format!(" {} {from_end} -> {to_end}", relationship.name),
            ExprKind::Limit { with_ties: true, .. } => " with ties".to_string(),
            _ => String::new(),
        }
    }

    fn node(&mut self, depth: usize, expr: &Expr) -> fmt::Result {
        let header = format!(
            "{}{} : {}",
            expr.kind_name(),
            Self::detail(expr),
            expr.result_type()
        );
        self.line(depth, &header)?;
        let depth = depth + 1;
        match expr.kind() {
            ExprKind::Scan { .. }
            | ExprKind::Constant { .. }
            | ExprKind::Null
            | ExprKind::VariableRef { .. }
            | ExprKind::ParameterRef { .. } => Ok(()),
            ExprKind::Property { instance, .. } => self.labelled(depth, "Instance", instance),
            ExprKind::Arithmetic { arguments, .. }
            | ExprKind::Function { arguments, .. }
            | ExprKind::NewInstance { arguments } => {
                let columns = match expr.result_type() {
                    crate::DataType::Struct(fields) => Some(fields),
                    _ => None,
                };
                for (idx, argument) in arguments.iter().enumerate() {
                    let label = columns
                        .and_then(|fields| fields.get(idx))
                        .map(|f| f.name.clone())
                        .unwrap_or_else(|| format!("Argument[{idx}]"));
                    self.labelled(depth, &label, argument)?;
                }
                Ok(())
            }
            ExprKind::Comparison { left, right, .. }
            | ExprKind::And { left, right }
            | ExprKind::Or { left, right }
            | ExprKind::Except { left, right }
            | ExprKind::Intersect { left, right }
            | ExprKind::UnionAll { left, right } => {
                self.labelled(depth, "Left", left)?;
                self.labelled(depth, "Right", right)
            }
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
            | ExprKind::IsEmpty { argument } => self.labelled(depth, "Argument", argument),
            ExprKind::In { item, list } => {
                self.labelled(depth, "Item", item)?;
                for element in list {
                    self.labelled(depth, "Value", element)?;
                }
                Ok(())
            }
            ExprKind::Like {
                argument,
                pattern,
                escape,
            } => {
                self.labelled(depth, "Argument", argument)?;
                self.labelled(depth, "Pattern", pattern)?;
                match escape {
                    Some(escape) => self.labelled(depth, "Escape", escape),
                    None => Ok(()),
                }
            }
            ExprKind::Case {
                whens,
                thens,
                otherwise,
            } => {
                for (when, then) in whens.iter().zip(thens) {
                    self.labelled(depth, "When", when)?;
                    self.labelled(depth, "Then", then)?;
                }
                self.labelled(depth, "Else", otherwise)
            }
            ExprKind::LambdaInvoke { lambda, arguments } => {
                let names: Vec<&str> = lambda
                    .parameters()
                    .iter()
                    .filter_map(|p| p.variable_name())
                    .collect();
                self.labelled(depth, &format!("Body ({})", names.join(", ")), lambda.body())?;
                for argument in arguments {
                    self.labelled(depth, "Argument", argument)?;
                }
                Ok(())
            }
            ExprKind::CreateRef { key, .. } => self.labelled(depth, "Key", key),
            ExprKind::Navigate { source, .. } => self.labelled(depth, "Source", source),
            ExprKind::Limit {
                argument, limit, ..
            } => {
                self.labelled(depth, "Argument", argument)?;
                self.labelled(depth, "Limit", limit)
            }
            ExprKind::Filter { input, predicate } => {
                self.binding(depth, "Input", input)?;
                self.labelled(depth, "Predicate", predicate)
            }
            ExprKind::Quantifier {
                input, predicate, ..
            } => {
                self.binding(depth, "Input", input)?;
                self.labelled(depth, "Predicate", predicate)
            }
            ExprKind::Project { input, projection } => {
                self.binding(depth, "Input", input)?;
                self.labelled(depth, "Projection", projection)
            }
            ExprKind::Join {
                left,
                right,
                condition,
                ..
            } => {
                self.binding(depth, "Left", left)?;
                self.binding(depth, "Right", right)?;
                self.labelled(depth, "Condition", condition)
            }
            ExprKind::CrossJoin { inputs } => {
                for input in inputs {
                    self.binding(depth, "Input", input)?;
                }
                Ok(())
            }
            ExprKind::Apply { input, apply, .. } => {
                self.binding(depth, "Input", input)?;
                self.binding(depth, "Apply", apply)
            }
            ExprKind::GroupBy {
                input,
                keys,
                aggregates,
            } => {
                self.line(
                    depth,
                    &format!(
                        "Input as {} group {}:",
                        input.variable_name(),
                        input.group_variable_name()
                    ),
                )?;
                self.node(depth + 1, input.input())?;
                for (name, key) in keys {
                    self.labelled(depth, &format!("Key {name}"), key)?;
                }
                for (name, aggregate) in aggregates {
                    match aggregate.kind() {
                        AggregateKind::Function {
                            function,
                            arguments,
                            distinct,
                        } => {
                            let distinct = if *distinct { " distinct" } else { "" };
                            self.line(
                                depth,
                                &format!(
                                    "Aggregate {name} {}{distinct} : {}",
                                    function.full_name(),
                                    aggregate.result_type()
                                ),
                            )?;
                            for argument in arguments {
                                self.node(depth + 1, argument)?;
                            }
                        }
                        AggregateKind::Group { argument } => {
                            self.line(
                                depth,
                                &format!("GroupAggregate {name} : {}", aggregate.result_type()),
                            )?;
                            self.node(depth + 1, argument)?;
                        }
                    }
                }
                Ok(())
            }
            ExprKind::Sort { input, order } => {
                self.binding(depth, "Input", input)?;
                self.order(depth, order)
            }
            ExprKind::Skip {
                input,
                order,
                count,
            } => {
                self.binding(depth, "Input", input)?;
                self.order(depth, order)?;
                self.labelled(depth, "Count", count)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TreePrinter { out: f }.node(0, self)
    }
}
