//! Canonical function registry and overload resolution

use qtree_ir::{BuildError, DataType, FunctionParameter, FunctionSignature, TypeResolver};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Namespace of the built-in canonical functions.
pub const CANONICAL_NAMESPACE: &str = "Edm";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Function not found: {name}({})", format_types(.arguments))]
    FunctionNotFound { name: String, arguments: Vec<DataType> },

    #[error("Ambiguous match for function {name}({})", format_types(.arguments))]
    AmbiguousMatch { name: String, arguments: Vec<DataType> },
}

fn format_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<RegistryError> for BuildError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::FunctionNotFound { name, arguments } => BuildError::FunctionNotFound {
                name,
                arguments: format_types(&arguments),
            },
            RegistryError::AmbiguousMatch { name, .. } => BuildError::AmbiguousFunction { name },
        }
    }
}

fn signature(name: &str, parameters: &[(&str, DataType)], return_type: DataType, is_aggregate: bool) -> FunctionSignature {
    FunctionSignature {
        namespace: CANONICAL_NAMESPACE.to_string(),
        name: name.to_string(),
        parameters: parameters
            .iter()
            .map(|(name, data_type)| FunctionParameter {
                name: name.to_string(),
                data_type: data_type.clone(),
            })
            .collect(),
        return_type,
        is_aggregate,
    }
}

const DECIMAL: DataType = DataType::Decimal {
    precision: 38,
    scale: 4,
};

/// Numeric overload set shared by the arithmetic aggregates and `Abs`.
fn numeric_types() -> [DataType; 4] {
    [DataType::Int32, DataType::Int64, DECIMAL, DataType::Float64]
}

/// Types `Min` and `Max` order over besides the numeric ones.
fn ordered_types() -> [DataType; 5] {
    [
        DataType::String,
        DataType::Binary,
        DataType::Time,
        DataType::Timestamp,
        DataType::TimestampTz,
    ]
}

fn integer_types() -> [DataType; 5] {
    [
        DataType::UInt8,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
    ]
}

fn date_types() -> [DataType; 2] {
    [DataType::Timestamp, DataType::TimestampTz]
}

fn time_types() -> [DataType; 3] {
    [DataType::Time, DataType::Timestamp, DataType::TimestampTz]
}

/// Overloads stored by case-insensitive name.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<Arc<FunctionSignature>>>,
}

impl FunctionRegistry {
    /// Registry preloaded with the canonical functions.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtins();
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    fn register_builtins(&mut self) {
        self.register_aggregates();
        self.register_string_functions();
        self.register_math_functions();
        self.register_date_functions();
        self.register_bitwise_functions();
        self.register(signature("NewGuid", &[], DataType::Guid, false));
    }

    // Aggregates take the group (a collection) as their argument
    fn register_aggregates(&mut self) {
        let collection = |element: DataType| DataType::collection_of(element);

        self.register(signature(
            "Count",
            &[("collection", collection(DataType::Unknown))],
            DataType::Int32,
            true,
        ));
        self.register(signature(
            "BigCount",
            &[("collection", collection(DataType::Unknown))],
            DataType::Int64,
            true,
        ));
        for name in ["Sum", "Avg"] {
            for numeric in numeric_types() {
                self.register(signature(
                    name,
                    &[("collection", collection(numeric.clone()))],
                    numeric,
                    true,
                ));
            }
        }
        for name in ["Min", "Max"] {
            for element in numeric_types().into_iter().chain(ordered_types()) {
                self.register(signature(
                    name,
                    &[("collection", collection(element.clone()))],
                    element,
                    true,
                ));
            }
        }
        for name in ["StDev", "StDevP", "Var", "VarP"] {
            for numeric in numeric_types() {
                self.register(signature(
                    name,
                    &[("collection", collection(numeric))],
                    DataType::Float64,
                    true,
                ));
            }
        }
    }

    fn register_string_functions(&mut self) {
        let string = || DataType::String;

        for name in ["ToUpper", "ToLower", "Trim", "TrimStart", "TrimEnd", "Reverse"] {
            self.register(signature(name, &[("stringArgument", string())], string(), false));
        }
        self.register(signature("Length", &[("stringArgument", string())], DataType::Int32, false));
        self.register(signature(
            "Concat",
            &[("string1", string()), ("string2", string())],
            string(),
            false,
        ));
        self.register(signature(
            "Substring",
            &[
                ("stringArgument", string()),
                ("start", DataType::Int32),
                ("length", DataType::Int32),
            ],
            string(),
            false,
        ));
        for name in ["Left", "Right"] {
            self.register(signature(
                name,
                &[("stringArgument", string()), ("length", DataType::Int64)],
                string(),
                false,
            ));
        }
        self.register(signature(
            "Replace",
            &[
                ("stringArgument", string()),
                ("toReplace", string()),
                ("replacement", string()),
            ],
            string(),
            false,
        ));
        for name in ["Contains", "StartsWith", "EndsWith"] {
            self.register(signature(
                name,
                &[("searchedString", string()), ("searchedForString", string())],
                DataType::Bool,
                false,
            ));
        }
        self.register(signature(
            "IndexOf",
            &[("searchString", string()), ("stringToFind", string())],
            DataType::Int32,
            false,
        ));
    }

    fn register_math_functions(&mut self) {
        for numeric in numeric_types() {
            self.register(signature("Abs", &[("value", numeric.clone())], numeric.clone(), false));
            self.register(signature(
                "Power",
                &[("baseArgument", numeric.clone()), ("exponent", numeric.clone())],
                numeric,
                false,
            ));
        }
        for numeric in [DECIMAL, DataType::Float64] {
            for name in ["Round", "Floor", "Ceiling"] {
                self.register(signature(name, &[("value", numeric.clone())], numeric.clone(), false));
            }
            for name in ["Round", "Truncate"] {
                self.register(signature(
                    name,
                    &[("value", numeric.clone()), ("digits", DataType::Int32)],
                    numeric.clone(),
                    false,
                ));
            }
        }
    }

    fn register_date_functions(&mut self) {
        for date in date_types() {
            for name in ["Year", "Month", "Day", "DayOfYear"] {
                self.register(signature(name, &[("dateValue", date.clone())], DataType::Int32, false));
            }
            self.register(signature("TruncateTime", &[("dateValue", date.clone())], date.clone(), false));
            for name in ["AddYears", "AddMonths", "AddDays"] {
                self.register(signature(
                    name,
                    &[("dateValue", date.clone()), ("addValue", DataType::Int32)],
                    date.clone(),
                    false,
                ));
            }
            for name in ["DiffYears", "DiffMonths", "DiffDays"] {
                self.register(signature(
                    name,
                    &[("dateValue1", date.clone()), ("dateValue2", date.clone())],
                    DataType::Int32,
                    false,
                ));
            }
        }
        for time in time_types() {
            for name in ["Hour", "Minute", "Second", "Millisecond"] {
                self.register(signature(name, &[("timeValue", time.clone())], DataType::Int32, false));
            }
            for name in [
                "AddHours",
                "AddMinutes",
                "AddSeconds",
                "AddMilliseconds",
                "AddMicroseconds",
                "AddNanoseconds",
            ] {
                self.register(signature(
                    name,
                    &[("timeValue", time.clone()), ("addValue", DataType::Int32)],
                    time.clone(),
                    false,
                ));
            }
            for name in [
                "DiffHours",
                "DiffMinutes",
                "DiffSeconds",
                "DiffMilliseconds",
                "DiffMicroseconds",
                "DiffNanoseconds",
            ] {
                self.register(signature(
                    name,
                    &[("timeValue1", time.clone()), ("timeValue2", time.clone())],
                    DataType::Int32,
                    false,
                ));
            }
        }
        self.register(signature(
            "GetTotalOffsetMinutes",
            &[("dateTimeOffsetArgument", DataType::TimestampTz)],
            DataType::Int32,
            false,
        ));
        self.register(signature("CurrentDateTime", &[], DataType::Timestamp, false));
        self.register(signature("CurrentUtcDateTime", &[], DataType::Timestamp, false));
        self.register(signature("CurrentDateTimeOffset", &[], DataType::TimestampTz, false));

        let int32 = |name: &'static str| (name, DataType::Int32);
        self.register(signature(
            "CreateDateTime",
            &[
                int32("year"),
                int32("month"),
                int32("day"),
                int32("hour"),
                int32("minute"),
                ("second", DataType::Float64),
            ],
            DataType::Timestamp,
            false,
        ));
        self.register(signature(
            "CreateDateTimeOffset",
            &[
                int32("year"),
                int32("month"),
                int32("day"),
                int32("hour"),
                int32("minute"),
                ("second", DataType::Float64),
                int32("timeZoneOffset"),
            ],
            DataType::TimestampTz,
            false,
        ));
        self.register(signature(
            "CreateTime",
            &[int32("hour"), int32("minute"), ("second", DataType::Float64)],
            DataType::Time,
            false,
        ));
    }

    fn register_bitwise_functions(&mut self) {
        for integer in integer_types() {
            for name in ["BitwiseAnd", "BitwiseOr", "BitwiseXor"] {
                self.register(signature(
                    name,
                    &[("value1", integer.clone()), ("value2", integer.clone())],
                    integer.clone(),
                    false,
                ));
            }
            self.register(signature("BitwiseNot", &[("value", integer.clone())], integer, false));
        }
    }

    pub fn register(&mut self, sig: FunctionSignature) {
        self.functions
            .entry(sig.name.to_lowercase())
            .or_default()
            .push(Arc::new(sig));
    }

    /// All overloads registered under `name`.
    pub fn overloads(&self, name: &str) -> &[Arc<FunctionSignature>] {
        self.functions
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves the single best overload of `name` for `arg_types`.
    ///
    /// An overload applies when every argument promotes to its parameter. Among
    /// applicable overloads the one whose parameters promote to every other
    /// candidate's parameters wins; without such a unique candidate the call
    /// is ambiguous.
    pub fn lookup(
        &self,
        name: &str,
        arg_types: &[DataType],
        resolver: &dyn TypeResolver,
    ) -> Result<Arc<FunctionSignature>, RegistryError> {
        let not_found = || RegistryError::FunctionNotFound {
            name: name.to_string(),
            arguments: arg_types.to_vec(),
        };

        let applicable: Vec<&Arc<FunctionSignature>> = self
            .overloads(name)
            .iter()
            .filter(|sig| {
                sig.parameters.len() == arg_types.len()
                    && sig
                        .parameter_types()
                        .zip(arg_types)
                        .all(|(expected, actual)| resolver.is_promotable(actual, expected))
            })
            .collect();

        if applicable.is_empty() {
            return Err(not_found());
        }

        let more_specific = |a: &FunctionSignature, b: &FunctionSignature| {
            a.parameter_types()
                .zip(b.parameter_types())
                .all(|(pa, pb)| resolver.is_promotable(pa, pb))
        };

        let best: Vec<&Arc<FunctionSignature>> = applicable
            .iter()
            .copied()
            .filter(|candidate| {
                applicable
                    .iter()
                    .all(|other| more_specific(candidate.as_ref(), other.as_ref()))
            })
            .collect();

        match best.as_slice() {
            [sig] => Ok(Arc::clone(sig)),
            _ => Err(RegistryError::AmbiguousMatch {
                name: name.to_string(),
                arguments: arg_types.to_vec(),
            }),
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtree_ir::DefaultTypeResolver;

    #[test]
    fn test_exact_overload_preferred() {
        let registry = FunctionRegistry::default();

        let sig = registry
            .lookup("Abs", &[DataType::Int64], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int64);
    }

    #[test]
    fn test_promotable_overload_found() {
        let registry = FunctionRegistry::default();

        let sig = registry
            .lookup("abs", &[DataType::Int16], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int32);

        let group = DataType::collection_of(DataType::Decimal {
            precision: 18,
            scale: 2,
        });
        let sig = registry.lookup("Sum", &[group], &DefaultTypeResolver).unwrap();
        assert!(sig.is_aggregate);
        assert_eq!(sig.return_type, DECIMAL);
    }

    #[test]
    fn test_count_accepts_any_collection() {
        let registry = FunctionRegistry::default();
        let group = DataType::collection_of(DataType::row([("A", DataType::String)]));

        let sig = registry.lookup("COUNT", &[group], &DefaultTypeResolver).unwrap();
        assert_eq!(sig.full_name(), "Edm.Count");
    }

    #[test]
    fn test_min_max_order_non_numeric_groups() {
        let registry = FunctionRegistry::default();

        for element in [DataType::String, DataType::Binary, DataType::Time, DataType::TimestampTz] {
            let group = DataType::collection_of(element.clone());
            let sig = registry.lookup("Min", &[group.clone()], &DefaultTypeResolver).unwrap();
            assert_eq!(sig.return_type, element);
            let sig = registry.lookup("Max", &[group], &DefaultTypeResolver).unwrap();
            assert_eq!(sig.return_type, element);
        }

        let err = registry
            .lookup("Sum", &[DataType::collection_of(DataType::String)], &DefaultTypeResolver)
            .unwrap_err();
        assert!(matches!(err, RegistryError::FunctionNotFound { .. }));
    }

    #[test]
    fn test_statistical_aggregates_return_float() {
        let registry = FunctionRegistry::default();
        let group = DataType::collection_of(DataType::Int16);

        for name in ["StDev", "StDevP", "Var", "VarP"] {
            let sig = registry.lookup(name, &[group.clone()], &DefaultTypeResolver).unwrap();
            assert!(sig.is_aggregate);
            assert_eq!(sig.return_type, DataType::Float64);
            assert_eq!(sig.parameters[0].data_type, DataType::collection_of(DataType::Int32));
        }
    }

    #[test]
    fn test_string_functions() {
        let registry = FunctionRegistry::default();
        let text = DataType::String;

        let sig = registry
            .lookup("Left", &[text.clone(), DataType::Int32], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::String);
        let sig = registry
            .lookup("IndexOf", &[text.clone(), text.clone()], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int32);
        let sig = registry
            .lookup("replace", &[text.clone(), text.clone(), text.clone()], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.full_name(), "Edm.Replace");
        for name in ["EndsWith", "Reverse", "TrimStart", "TrimEnd"] {
            assert!(!registry.overloads(name).is_empty(), "{name} missing");
        }
    }

    #[test]
    fn test_math_functions() {
        let registry = FunctionRegistry::default();

        let sig = registry
            .lookup("Power", &[DataType::Int32, DataType::Int32], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int32);
        let sig = registry
            .lookup("Power", &[DataType::Int32, DataType::Float64], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Float64);

        let sig = registry
            .lookup("Truncate", &[DataType::Float64, DataType::Int32], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Float64);
        let sig = registry
            .lookup("Ceiling", &[DataType::Int64], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DECIMAL);
        assert!(registry
            .lookup("Round", &[DECIMAL, DataType::Int16], &DefaultTypeResolver)
            .is_ok());
    }

    #[test]
    fn test_date_functions() {
        let registry = FunctionRegistry::default();

        let sig = registry
            .lookup("Hour", &[DataType::Time], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int32);
        let err = registry
            .lookup("DayOfYear", &[DataType::Time], &DefaultTypeResolver)
            .unwrap_err();
        assert!(matches!(err, RegistryError::FunctionNotFound { .. }));

        let sig = registry
            .lookup("AddDays", &[DataType::TimestampTz, DataType::Int32], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::TimestampTz);
        let sig = registry
            .lookup("DiffMinutes", &[DataType::Time, DataType::Time], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int32);
        let err = registry
            .lookup("DiffDays", &[DataType::Timestamp, DataType::TimestampTz], &DefaultTypeResolver)
            .unwrap_err();
        assert!(matches!(err, RegistryError::FunctionNotFound { .. }));

        let sig = registry
            .lookup("CurrentUtcDateTime", &[], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Timestamp);
        let sig = registry
            .lookup(
                "CreateTime",
                &[DataType::Int32, DataType::Int32, DataType::Int32],
                &DefaultTypeResolver,
            )
            .unwrap();
        assert_eq!(sig.return_type, DataType::Time);
    }

    #[test]
    fn test_bitwise_functions_keep_width() {
        let registry = FunctionRegistry::default();

        let sig = registry
            .lookup("BitwiseAnd", &[DataType::Int16, DataType::Int16], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::Int16);
        let sig = registry
            .lookup("BitwiseNot", &[DataType::UInt8], &DefaultTypeResolver)
            .unwrap();
        assert_eq!(sig.return_type, DataType::UInt8);
        let err = registry
            .lookup("BitwiseOr", &[DataType::Float64, DataType::Int32], &DefaultTypeResolver)
            .unwrap_err();
        assert!(matches!(err, RegistryError::FunctionNotFound { .. }));
    }

    #[test]
    fn test_ambiguous_overloads_reported() {
        let mut registry = FunctionRegistry::empty();
        registry.register(signature(
            "Pick",
            &[("a", DataType::Int64), ("b", DataType::Int32)],
            DataType::Int64,
            false,
        ));
        registry.register(signature(
            "Pick",
            &[("a", DataType::Int32), ("b", DataType::Int64)],
            DataType::Int64,
            false,
        ));

        let err = registry
            .lookup("Pick", &[DataType::Int32, DataType::Int32], &DefaultTypeResolver)
            .unwrap_err();
        assert!(matches!(err, RegistryError::AmbiguousMatch { .. }));
        assert_eq!(
            BuildError::from(err),
            BuildError::AmbiguousFunction {
                name: "Pick".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_function_reported() {
        let registry = FunctionRegistry::default();

        let err = registry
            .lookup("Soundex", &[DataType::String], &DefaultTypeResolver)
            .unwrap_err();
        assert_eq!(
            BuildError::from(err),
            BuildError::FunctionNotFound {
                name: "Soundex".to_string(),
                arguments: "String".to_string()
            }
        );

        let err = registry
            .lookup("Length", &[DataType::Int32], &DefaultTypeResolver)
            .unwrap_err();
        assert!(matches!(err, RegistryError::FunctionNotFound { .. }));
    }
}
