//! Type system for the expression tree
//!
//! Result types are plain values: a node's type is computed once when the node
//! is built and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Primitives
    Bool,
    Int8,
    UInt8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: u8 },

    // Text
    String,

    // Binary
    Binary,

    // Temporal
    Time,
    Timestamp,
    TimestampTz,

    Guid,

    // Structural
    Struct(Vec<FieldType>),
    Entity(Arc<EntityType>),
    Ref(Arc<EntityType>),
    Collection(Box<DataType>),

    // Special: polymorphic parameter in a function signature
    Unknown,
}

impl DataType {
    pub fn collection_of(element: DataType) -> Self {
        DataType::Collection(Box::new(element))
    }

    pub fn row<N: Into<String>>(fields: impl IntoIterator<Item = (N, DataType)>) -> Self {
        DataType::Struct(
            fields
                .into_iter()
                .map(|(name, data_type)| FieldType::new(name, data_type))
                .collect(),
        )
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            DataType::Bool
                | DataType::Int8
                | DataType::UInt8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
                | DataType::Decimal { .. }
                | DataType::String
                | DataType::Binary
                | DataType::Time
                | DataType::Timestamp
                | DataType::TimestampTz
                | DataType::Guid
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::UInt8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                DataType::Float32 | DataType::Float64 | DataType::Decimal { .. }
            )
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, DataType::Bool)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, DataType::Collection(_))
    }

    /// Element type of a collection type.
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Collection(element) => Some(element),
            _ => None,
        }
    }

    pub fn entity_type(&self) -> Option<&Arc<EntityType>> {
        match self {
            DataType::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn ref_entity_type(&self) -> Option<&Arc<EntityType>> {
        match self {
            DataType::Ref(entity) => Some(entity),
            _ => None,
        }
    }

    /// Looks up a member of a row or entity type by name.
    pub fn find_field(&self, name: &str) -> Option<&FieldType> {
        match self {
            DataType::Struct(fields) => fields.iter().find(|f| f.name == name),
            DataType::Entity(entity) => entity.find_field(name),
            _ => None,
        }
    }

    /// Entity types and their references participate in type hierarchies.
    pub fn is_polymorphic(&self) -> bool {
        matches!(self, DataType::Entity(_) | DataType::Ref(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "Boolean"),
            DataType::Int8 => write!(f, "SByte"),
            DataType::UInt8 => write!(f, "Byte"),
            DataType::Int16 => write!(f, "Int16"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::Float32 => write!(f, "Single"),
            DataType::Float64 => write!(f, "Double"),
            DataType::Decimal { precision, scale } => write!(f, "Decimal({precision},{scale})"),
            DataType::String => write!(f, "String"),
            DataType::Binary => write!(f, "Binary"),
            DataType::Time => write!(f, "Time"),
            DataType::Timestamp => write!(f, "DateTime"),
            DataType::TimestampTz => write!(f, "DateTimeOffset"),
            DataType::Guid => write!(f, "Guid"),
            DataType::Struct(fields) => {
                write!(f, "Row(")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", field.name, field.data_type)?;
                }
                write!(f, ")")
            }
            DataType::Entity(entity) => write!(f, "{}", entity.name),
            DataType::Ref(entity) => write!(f, "Ref({})", entity.name),
            DataType::Collection(element) => write!(f, "Collection({element})"),
            DataType::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl FieldType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A named structural type with identity (key members) and single inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Arc<EntityType>>,
    /// Fields declared by this type; inherited fields live on `base`.
    pub fields: Vec<FieldType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
    #[serde(default)]
    pub is_abstract: bool,
}

impl EntityType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldType>) -> Self {
        Self {
            name: name.into(),
            base: None,
            fields,
            key: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn with_key<N: Into<String>>(mut self, key: impl IntoIterator<Item = N>) -> Self {
        self.key = key.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base(mut self, base: Arc<EntityType>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// All fields, inherited ones first.
    pub fn all_fields(&self) -> Vec<&FieldType> {
        let mut fields = match &self.base {
            Some(base) => base.all_fields(),
            None => Vec::new(),
        };
        fields.extend(self.fields.iter());
        fields
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.base.as_ref().and_then(|base| base.find_field(name)))
    }

    /// Key members, resolved through the hierarchy root when not declared locally.
    pub fn key_fields(&self) -> Vec<&FieldType> {
        if self.key.is_empty() {
            if let Some(base) = &self.base {
                return base.key_fields();
            }
        }
        self.key.iter().filter_map(|k| self.find_field(k)).collect()
    }

    /// True when `self` is `other` or derives from it.
    pub fn is_subtype_of(&self, other: &EntityType) -> bool {
        if self.name == other.name {
            return true;
        }
        match &self.base {
            Some(base) => base.is_subtype_of(other),
            None => false,
        }
    }

    /// Row type made of the key members, used by ref-key and create-ref.
    pub fn key_row_type(&self) -> DataType {
        DataType::Struct(self.key_fields().into_iter().cloned().collect())
    }
}

/// Target of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySet {
    pub name: String,
    pub element_type: Arc<EntityType>,
}

impl EntitySet {
    pub fn new(name: impl Into<String>, element_type: Arc<EntityType>) -> Self {
        Self {
            name: name.into(),
            element_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    One,
    ZeroOrOne,
    Many,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipEnd {
    pub name: String,
    pub entity: Arc<EntityType>,
    pub multiplicity: Multiplicity,
}

impl RelationshipEnd {
    pub fn new(name: impl Into<String>, entity: Arc<EntityType>, multiplicity: Multiplicity) -> Self {
        Self {
            name: name.into(),
            entity,
            multiplicity,
        }
    }

    /// Type produced by navigating to this end.
    pub fn navigation_type(&self) -> DataType {
        let reference = DataType::Ref(self.entity.clone());
        match self.multiplicity {
            Multiplicity::Many => DataType::collection_of(reference),
            Multiplicity::One | Multiplicity::ZeroOrOne => reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipType {
    pub name: String,
    pub ends: Vec<RelationshipEnd>,
}

impl RelationshipType {
    pub fn new(name: impl Into<String>, ends: Vec<RelationshipEnd>) -> Self {
        Self {
            name: name.into(),
            ends,
        }
    }

    pub fn end(&self, name: &str) -> Option<&RelationshipEnd> {
        self.ends.iter().find(|end| end.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionParameter {
    pub name: String,
    pub data_type: DataType,
}

/// Metadata for a canonical function; resolved by the function registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub namespace: String,
    pub name: String,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: DataType,
    pub is_aggregate: bool,
}

impl FunctionSignature {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &DataType> {
        self.parameters.iter().map(|p| &p.data_type)
    }
}
