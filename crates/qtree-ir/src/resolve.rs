//! Type resolution contract
//!
//! The builder never decides type compatibility on its own. Every construction
//! site asks a [`TypeResolver`] for promotion, common-type and comparability
//! answers; the provided `validate_*` operations turn those answers into a
//! derived result type or a [`BuildError`].

use crate::{ArithmeticOp, BuildError, ComparisonOp, DataType, EntityType, FieldType, Result};
use std::sync::Arc;

pub trait TypeResolver: Send + Sync {
    /// Smallest type both operands promote to.
    fn common_type(&self, left: &DataType, right: &DataType) -> Option<DataType>;

    /// True when a value of `from` can be used where `to` is expected.
    fn is_promotable(&self, from: &DataType, to: &DataType) -> bool;

    fn is_cast_allowed(&self, from: &DataType, to: &DataType) -> bool;

    fn is_equal_comparable(&self, data_type: &DataType) -> bool {
        match data_type {
            DataType::Struct(fields) => fields
                .iter()
                .all(|f| self.is_equal_comparable(&f.data_type)),
            DataType::Collection(_) | DataType::Unknown => false,
            _ => true,
        }
    }

    fn is_order_comparable(&self, data_type: &DataType) -> bool {
        match data_type {
            DataType::Struct(fields) => fields
                .iter()
                .all(|f| self.is_order_comparable(&f.data_type)),
            other => other.is_primitive(),
        }
    }

    fn validate_boolean(&self, argument: &str, data_type: &DataType) -> Result<DataType> {
        if data_type.is_bool() {
            Ok(DataType::Bool)
        } else {
            Err(BuildError::type_mismatch(
                argument,
                format!("expected Boolean, got {data_type}"),
            ))
        }
    }

    fn validate_common_type(&self, argument: &str, left: &DataType, right: &DataType) -> Result<DataType> {
        self.common_type(left, right).ok_or_else(|| {
            BuildError::type_mismatch(argument, format!("no common type for {left} and {right}"))
        })
    }

    fn validate_arithmetic(&self, op: ArithmeticOp, operands: &[&DataType]) -> Result<DataType> {
        match (op, operands) {
            (ArithmeticOp::Neg, [argument]) => {
                if argument.is_numeric() {
                    Ok((*argument).clone())
                } else {
                    Err(BuildError::type_mismatch(
                        "argument",
                        format!("expected numeric, got {argument}"),
                    ))
                }
            }
            (ArithmeticOp::Neg, _) => Err(BuildError::arity_mismatch("UnaryMinus", 1, operands.len())),
            (_, [left, right]) => {
                let common = self.validate_common_type("right", left, right)?;
                if common.is_numeric() {
                    Ok(common)
                } else {
                    Err(BuildError::type_mismatch(
                        "left",
                        format!("expected numeric operands, got {left} and {right}"),
                    ))
                }
            }
            _ => Err(BuildError::arity_mismatch(format!("{op:?}"), 2, operands.len())),
        }
    }

    fn validate_comparison(&self, op: ComparisonOp, left: &DataType, right: &DataType) -> Result<DataType> {
        let common = self.validate_common_type("right", left, right)?;
        let comparable = if op.is_equality() {
            self.is_equal_comparable(&common)
        } else {
            self.is_order_comparable(&common)
        };
        if !comparable {
            let requirement = if op.is_equality() {
                "equality comparable"
            } else {
                "order comparable"
            };
            return Err(BuildError::type_mismatch(
                "left",
                format!("{common} is not {requirement}"),
            ));
        }
        Ok(DataType::Bool)
    }

    fn validate_like(&self, argument: &DataType, pattern: &DataType, escape: Option<&DataType>) -> Result<DataType> {
        for (name, data_type) in [("argument", Some(argument)), ("pattern", Some(pattern)), ("escape", escape)] {
            if let Some(data_type) = data_type {
                if !data_type.is_string() {
                    return Err(BuildError::type_mismatch(
                        name,
                        format!("expected String, got {data_type}"),
                    ));
                }
            }
        }
        Ok(DataType::Bool)
    }

    fn validate_cast(&self, from: &DataType, to: &DataType) -> Result<DataType> {
        if self.is_cast_allowed(from, to) {
            Ok(to.clone())
        } else {
            Err(BuildError::type_mismatch(
                "argument",
                format!("cannot cast {from} to {to}"),
            ))
        }
    }

    /// Treat and is-of need two related types of one entity hierarchy.
    fn validate_polymorphic(&self, from: &DataType, to: &DataType) -> Result<()> {
        let related = match (from, to) {
            (DataType::Entity(a), DataType::Entity(b)) | (DataType::Ref(a), DataType::Ref(b)) => {
                a.is_subtype_of(b) || b.is_subtype_of(a)
            }
            _ => false,
        };
        if related {
            Ok(())
        } else {
            Err(BuildError::type_mismatch(
                "type",
                format!("{to} is not in the type hierarchy of {from}"),
            ))
        }
    }

    /// Element type for membership tests against a value list.
    fn validate_in(&self, item: &DataType, list: &[&DataType]) -> Result<DataType> {
        for (idx, element) in list.iter().enumerate() {
            let common = self.validate_common_type(&format!("list[{idx}]"), item, element)?;
            if !self.is_equal_comparable(&common) {
                return Err(BuildError::type_mismatch(
                    "item",
                    format!("{common} is not equality comparable"),
                ));
            }
        }
        Ok(DataType::Bool)
    }

    fn validate_sort_key(&self, key: &DataType, collation: &str) -> Result<()> {
        if !self.is_order_comparable(key) {
            return Err(BuildError::type_mismatch(
                "key",
                format!("{key} is not order comparable"),
            ));
        }
        if !collation.is_empty() && !key.is_string() {
            return Err(BuildError::type_mismatch(
                "collation",
                format!("collation requires a String key, got {key}"),
            ));
        }
        Ok(())
    }

    /// Skip and limit counts must be integers that fit in 64 bits.
    fn validate_count(&self, argument: &str, count: &DataType) -> Result<()> {
        if count.is_integer() && self.is_promotable(count, &DataType::Int64) {
            Ok(())
        } else {
            Err(BuildError::type_mismatch(
                argument,
                format!("expected an integer count, got {count}"),
            ))
        }
    }

    fn validate_collection(&self, argument: &str, data_type: &DataType) -> Result<DataType> {
        data_type.element_type().cloned().ok_or_else(|| {
            BuildError::invalid_shape(argument, format!("expected a collection, got {data_type}"))
        })
    }
}

/// Resolver with a small numeric promotion lattice and structural promotion rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeResolver;

/// Position in the integer/decimal/double chain; `Float32` joins at `Float64`.
fn numeric_rank(data_type: &DataType) -> Option<u8> {
    match data_type {
        DataType::Int8 | DataType::UInt8 => Some(0),
        DataType::Int16 => Some(1),
        DataType::Int32 => Some(2),
        DataType::Int64 => Some(3),
        DataType::Decimal { .. } => Some(4),
        DataType::Float64 => Some(5),
        _ => None,
    }
}

fn common_entity(left: &Arc<EntityType>, right: &Arc<EntityType>) -> Option<Arc<EntityType>> {
    let mut candidate = Some(left.clone());
    while let Some(entity) = candidate {
        if right.is_subtype_of(&entity) {
            return Some(entity);
        }
        candidate = entity.base.clone();
    }
    None
}

impl DefaultTypeResolver {
    fn promote_numeric(&self, from: &DataType, to: &DataType) -> bool {
        match (from, to) {
            (DataType::Float32, DataType::Float64) => true,
            (DataType::Float32, _) | (_, DataType::Float32) => false,
            (DataType::Int8, DataType::UInt8) | (DataType::UInt8, DataType::Int8) => false,
            _ => match (numeric_rank(from), numeric_rank(to)) {
                (Some(a), Some(b)) => a <= b,
                _ => false,
            },
        }
    }

    fn common_numeric(&self, left: &DataType, right: &DataType) -> Option<DataType> {
        if let (DataType::Decimal { precision: p1, scale: s1 }, DataType::Decimal { precision: p2, scale: s2 }) =
            (left, right)
        {
            return Some(DataType::Decimal {
                precision: (*p1).max(*p2),
                scale: (*s1).max(*s2),
            });
        }
        [
            left.clone(),
            right.clone(),
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::Float64,
        ]
        .into_iter()
        .filter(|candidate| {
            self.promote_numeric(left, candidate) && self.promote_numeric(right, candidate)
        })
        .min_by_key(|candidate| numeric_rank(candidate))
    }
}

impl TypeResolver for DefaultTypeResolver {
    fn common_type(&self, left: &DataType, right: &DataType) -> Option<DataType> {
        if left == right {
            return Some(left.clone());
        }
        match (left, right) {
            (DataType::Unknown, other) | (other, DataType::Unknown) => Some(other.clone()),
            (DataType::Entity(a), DataType::Entity(b)) => common_entity(a, b).map(DataType::Entity),
            (DataType::Ref(a), DataType::Ref(b)) => common_entity(a, b).map(DataType::Ref),
            (DataType::Collection(a), DataType::Collection(b)) => {
                self.common_type(a, b).map(DataType::collection_of)
            }
            (DataType::Struct(a), DataType::Struct(b)) => {
                if a.len() != b.len() {
                    return None;
                }
                a.iter()
                    .zip(b)
                    .map(|(fa, fb)| {
                        if fa.name != fb.name {
                            return None;
                        }
                        self.common_type(&fa.data_type, &fb.data_type)
                            .map(|data_type| FieldType::new(fa.name.clone(), data_type))
                    })
                    .collect::<Option<Vec<_>>>()
                    .map(DataType::Struct)
            }
            (a, b) if a.is_numeric() && b.is_numeric() => self.common_numeric(a, b),
            _ => None,
        }
    }

    fn is_promotable(&self, from: &DataType, to: &DataType) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (DataType::Unknown, _) | (_, DataType::Unknown) => true,
            (DataType::Entity(a), DataType::Entity(b)) | (DataType::Ref(a), DataType::Ref(b)) => {
                a.is_subtype_of(b)
            }
            (DataType::Collection(a), DataType::Collection(b)) => self.is_promotable(a, b),
            (DataType::Struct(a), DataType::Struct(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(fa, fb)| {
                        fa.name == fb.name && self.is_promotable(&fa.data_type, &fb.data_type)
                    })
            }
            (a, b) if a.is_numeric() && b.is_numeric() => self.promote_numeric(a, b),
            _ => false,
        }
    }

    fn is_cast_allowed(&self, from: &DataType, to: &DataType) -> bool {
        (from.is_primitive() && to.is_primitive()) || self.is_promotable(from, to)
    }
}
