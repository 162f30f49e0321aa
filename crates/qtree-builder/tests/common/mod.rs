//! Shared catalog fixture: products, categories and the relationship between them

#![allow(dead_code)]

use qtree_ir::{DataType, EntitySet, EntityType, FieldType, Multiplicity, RelationshipEnd, RelationshipType};
use std::sync::Arc;

pub struct Catalog {
    pub products: Arc<EntitySet>,
    pub categories: Arc<EntitySet>,
    pub product: Arc<EntityType>,
    pub discontinued: Arc<EntityType>,
    pub category: Arc<EntityType>,
    pub category_products: Arc<RelationshipType>,
}

pub fn price_type() -> DataType {
    DataType::Decimal {
        precision: 18,
        scale: 2,
    }
}

pub fn catalog() -> Catalog {
    let category = Arc::new(
        EntityType::new(
            "Category",
            vec![
                FieldType::new("Id", DataType::Int32).required(),
                FieldType::new("Name", DataType::String),
            ],
        )
        .with_key(["Id"]),
    );
    let product = Arc::new(
        EntityType::new(
            "Product",
            vec![
                FieldType::new("Id", DataType::Int32).required(),
                FieldType::new("Name", DataType::String),
                FieldType::new("Price", price_type()),
                FieldType::new("CategoryId", DataType::Int32),
                FieldType::new("Tags", DataType::collection_of(DataType::String)),
            ],
        )
        .with_key(["Id"]),
    );
    let discontinued = Arc::new(
        EntityType::new(
            "DiscontinuedProduct",
            vec![FieldType::new("Reason", DataType::String)],
        )
        .with_base(product.clone()),
    );
    let category_products = Arc::new(RelationshipType::new(
        "Category_Products",
        vec![
            RelationshipEnd::new("Category", category.clone(), Multiplicity::ZeroOrOne),
            RelationshipEnd::new("Products", product.clone(), Multiplicity::Many),
        ],
    ));

    Catalog {
        products: Arc::new(EntitySet::new("Products", product.clone())),
        categories: Arc::new(EntitySet::new("Categories", category.clone())),
        product,
        discontinued,
        category,
        category_products,
    }
}
