//! Selector resolution
//!
//! Closure results are converted into nodes in a fixed order: literals become
//! constants, nodes pass through untouched, explicit [`Row`]s and records become
//! row constructions, anything else is rejected.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};
use qtree_ir::{BuildError, DataType, Expr, NodeFactory, Result, Value};
use tracing::trace;
use uuid::Uuid;

/// A closure result, classified for resolution.
#[derive(Debug, Clone)]
pub enum Selection {
    Constant(Value),
    Null(DataType),
    Node(Expr),
    Row(Row),
    Record {
        type_name: &'static str,
        columns: Vec<(String, Selection)>,
    },
    Failed(BuildError),
    Unsupported(&'static str),
}

/// Anything a selector closure may return.
pub trait IntoSelection {
    fn into_selection(self) -> Selection;
}

impl IntoSelection for Selection {
    fn into_selection(self) -> Selection {
        self
    }
}

impl IntoSelection for Expr {
    fn into_selection(self) -> Selection {
        Selection::Node(self)
    }
}

impl IntoSelection for &Expr {
    fn into_selection(self) -> Selection {
        Selection::Node(self.clone())
    }
}

impl IntoSelection for Option<Expr> {
    fn into_selection(self) -> Selection {
        match self {
            Some(expr) => Selection::Node(expr),
            None => Selection::Failed(BuildError::null_argument("selector")),
        }
    }
}

impl<T: IntoSelection> IntoSelection for Result<T> {
    fn into_selection(self) -> Selection {
        match self {
            Ok(value) => value.into_selection(),
            Err(err) => Selection::Failed(err),
        }
    }
}

impl IntoSelection for () {
    fn into_selection(self) -> Selection {
        Selection::Unsupported("()")
    }
}

macro_rules! unsupported_selection {
    ($(($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name),+> IntoSelection for ($($name,)+) {
                fn into_selection(self) -> Selection {
                    Selection::Unsupported(std::any::type_name::<Self>())
                }
            }
        )*
    };
}

unsupported_selection!((A, B), (A, B, C), (A, B, C, D));

macro_rules! literal_selection {
    ($($ty:ty => $data_type:expr),* $(,)?) => {
        $(
            impl IntoSelection for $ty {
                fn into_selection(self) -> Selection {
                    Selection::Constant(Value::from(self))
                }
            }

            impl IntoSelection for Option<$ty> {
                fn into_selection(self) -> Selection {
                    match self {
                        Some(value) => Selection::Constant(Value::from(value)),
                        None => Selection::Null($data_type),
                    }
                }
            }
        )*
    };
}

literal_selection! {
    bool => DataType::Bool,
    i8 => DataType::Int8,
    u8 => DataType::UInt8,
    i16 => DataType::Int16,
    i32 => DataType::Int32,
    i64 => DataType::Int64,
    f32 => DataType::Float32,
    f64 => DataType::Float64,
    String => DataType::String,
    &str => DataType::String,
    Vec<u8> => DataType::Binary,
    NaiveTime => DataType::Time,
    NaiveDateTime => DataType::Timestamp,
    DateTime<FixedOffset> => DataType::TimestampTz,
    Uuid => DataType::Guid,
}

/// Explicit row builder. Columns may hold literals as well as nodes.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, Selection)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, value: impl IntoSelection) -> Self {
        self.columns.push((name.into(), value.into_selection()));
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoSelection for Row {
    fn into_selection(self) -> Selection {
        Selection::Row(self)
    }
}

/// A record-like value whose properties become row columns, in declaration order.
///
/// Implement it with [`record!`](crate::record) for ad-hoc records or
/// [`impl_record!`](crate::impl_record) for named structs.
pub trait Record {
    fn type_name(&self) -> &'static str;

    fn into_columns(self) -> Vec<(String, Selection)>;
}

/// Record produced by the [`record!`](crate::record) macro.
#[derive(Debug, Clone)]
pub struct AnonymousRecord {
    columns: Vec<(String, Selection)>,
}

impl AnonymousRecord {
    pub fn new(columns: Vec<(String, Selection)>) -> Self {
        Self { columns }
    }
}

impl Record for AnonymousRecord {
    fn type_name(&self) -> &'static str {
        "<anonymous record>"
    }

    fn into_columns(self) -> Vec<(String, Selection)> {
        self.columns
    }
}

impl IntoSelection for AnonymousRecord {
    fn into_selection(self) -> Selection {
        record_selection(self)
    }
}

/// Classifies a [`Record`] implementation.
pub fn record_selection<R: Record>(record: R) -> Selection {
    let type_name = record.type_name();
    Selection::Record {
        type_name,
        columns: record.into_columns(),
    }
}

/// Builds an anonymous record: `record! { Name: name, Total: total }`.
#[macro_export]
macro_rules! record {
    ($($name:ident : $value:expr),+ $(,)?) => {
        $crate::selector::AnonymousRecord::new(vec![
            $((
                stringify!($name).to_string(),
                $crate::selector::IntoSelection::into_selection($value),
            )),+
        ])
    };
}

/// Implements [`Record`] and [`IntoSelection`] for a struct: `impl_record!(Summary { name, total });`
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        impl $crate::selector::Record for $ty {
            fn type_name(&self) -> &'static str {
                ::std::any::type_name::<$ty>()
            }

            fn into_columns(self) -> Vec<(String, $crate::selector::Selection)> {
                vec![
                    $((
                        stringify!($field).to_string(),
                        $crate::selector::IntoSelection::into_selection(self.$field),
                    )),+
                ]
            }
        }

        impl $crate::selector::IntoSelection for $ty {
            fn into_selection(self) -> $crate::selector::Selection {
                $crate::selector::record_selection(self)
            }
        }
    };
}

/// Turns a classified selector result into a node.
///
/// Record resolution is only attempted when `records` is set; otherwise a
/// record is unsupported like any other unrecognised shape.
pub fn resolve(factory: &NodeFactory<'_>, selection: Selection, records: bool) -> Result<Expr> {
    match selection {
        Selection::Constant(value) => Ok(factory.constant(value)),
        Selection::Null(data_type) => Ok(factory.null(data_type)),
        Selection::Node(expr) => Ok(expr),
        Selection::Row(row) => {
            let columns = row
                .columns
                .into_iter()
                .map(|(name, value)| Ok((name, resolve(factory, value, records)?)))
                .collect::<Result<Vec<_>>>()?;
            factory.new_row(columns)
        }
        Selection::Record { type_name, columns } => {
            if !records {
                return Err(BuildError::NotSupported {
                    type_name: type_name.to_string(),
                });
            }
            let columns = columns
                .into_iter()
                .map(|(name, value)| match value {
                    Selection::Node(expr) => Ok((name, expr)),
                    Selection::Failed(err) => Err(err),
                    _ => Err(BuildError::NotSupported {
                        type_name: type_name.to_string(),
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            trace!(record = type_name, columns = columns.len(), "Resolved record selector");
            factory.new_row(columns)
        }
        Selection::Failed(err) => Err(err),
        Selection::Unsupported(type_name) => Err(BuildError::NotSupported {
            type_name: type_name.to_string(),
        }),
    }
}
