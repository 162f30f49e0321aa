//! Fluent construction of qtree expression trees
//!
//! Relational combinators take caller closures, bind their inputs to fresh
//! variables, and turn the closure results into validated nodes:
//!
//! ```
//! use qtree_builder::prelude::*;
//! use std::sync::Arc;
//!
//! let product = EntityType::new(
//!     "Product",
//!     vec![
//!         FieldType::new("Name", DataType::String),
//!         FieldType::new("Price", DataType::Int32),
//!     ],
//! );
//! let products = Arc::new(EntitySet::new("Products", Arc::new(product)));
//!
//! let query = QueryBuilder::shared()
//!     .scan(&products)
//!     .where_(|p| p.property("Price")?.greater_than(10))
//!     .order_by(|p| p.property("Name"))
//!     .select(|p| record! { Name: p.property("Name") })
//!     .unwrap();
//! assert_eq!(query.kind_name(), "Project");
//! ```

pub mod alias;
pub mod binding;
pub mod builder;
pub mod config;
pub mod fluent;
pub mod functions;
pub mod lambda;
pub mod logging;
pub mod selector;

pub use builder::QueryBuilder;
pub use config::{BuilderConfig, Config, ConfigError, LoggingConfig, NameStrategy};
pub use fluent::{IntoOperand, QueryExt, ScalarExt};
pub use lambda::{Declared, NameExtractor, Parameter, Synthesized};
pub use selector::{IntoSelection, Record, Row, Selection};

pub mod prelude {
    pub use crate::fluent::{IntoOperand, QueryExt, ScalarExt};
    pub use crate::selector::{IntoSelection, Row};
    pub use crate::{impl_record, record, QueryBuilder};
    pub use qtree_ir::{
        BuildError, DataType, EntitySet, EntityType, Expr, FieldType, Multiplicity, RelationshipEnd,
        RelationshipType, Value,
    };
}
