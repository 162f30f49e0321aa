//! Method chains over the shared builder

mod common;

use common::{catalog, price_type};
use qtree_builder::functions::{count, max, to_upper};
use qtree_builder::prelude::*;
use qtree_ir::{ExprKind, JoinType};

struct Summary {
    name: qtree_ir::Result<Expr>,
    price: qtree_ir::Result<Expr>,
}

impl_record!(Summary { name, price });

#[test]
fn test_filter_sort_page_chain() {
    let c = catalog();
    let page = QueryBuilder::shared()
        .scan(&c.products)
        .where_(|p| p.property("Price")?.greater_than(10))
        .order_by(|p| p.property("CategoryId"))
        .then_by_descending(|p| p.property("Price"))
        .skip(20)
        .take(10)
        .unwrap();

    let ExprKind::Limit {
        argument,
        with_ties,
        ..
    } = page.kind()
    else {
        panic!("expected limit, got {}", page.kind_name());
    };
    assert!(!with_ties);
    let ExprKind::Skip { input, order, .. } = argument.kind() else {
        panic!("expected skip");
    };
    assert_eq!(order.len(), 2);
    assert_eq!(input.input().kind_name(), "Filter");
}

#[test]
fn test_first_error_flows_through_chain() {
    let c = catalog();
    let err = QueryBuilder::shared()
        .scan(&c.products)
        .where_(|p| p.property("Discount")?.greater_than(0))
        .order_by(|p| p.property("Name"))
        .select(|p| p)
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidShape { .. }));
}

#[test]
fn test_struct_record_selector() {
    let c = catalog();
    let summaries = QueryBuilder::shared()
        .scan(&c.products)
        .select(|p| Summary {
            name: to_upper(p.property("Name")),
            price: p.property("Price"),
        })
        .unwrap();
    assert_eq!(
        summaries.result_type(),
        &DataType::collection_of(DataType::row([
            ("name", DataType::String),
            ("price", price_type()),
        ]))
    );
}

#[test]
fn test_tuple_selector_is_rejected() {
    let c = catalog();
    let err = QueryBuilder::shared()
        .scan(&c.products)
        .select(|p| (p.property("Name"), p.property("Price")))
        .unwrap_err();
    assert!(matches!(err, BuildError::NotSupported { .. }));
}

#[test]
fn test_join_and_group_chain() {
    let c = catalog();
    let qb = QueryBuilder::shared();
    let report = qb
        .scan(&c.products)
        .join_select(
            qb.scan(&c.categories),
            |p| p.property("CategoryId"),
            |c| c.property("Id"),
            |p, c| record! { Category: c.property("Name"), Price: p.property("Price") },
        )
        .group_by(
            |row| row.property("Category"),
            |g| {
                vec![
                    ("Products", count(g.clone())),
                    ("Highest", max(g.select(|row| row.property("Price")))),
                ]
            },
        )
        .unwrap();

    let DataType::Collection(row) = report.result_type() else {
        panic!("expected collection");
    };
    let DataType::Struct(fields) = row.as_ref() else {
        panic!("expected row");
    };
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Key", "Products", "Highest"]);
}

#[test]
fn test_inner_join_condition() {
    let c = catalog();
    let qb = QueryBuilder::shared();
    let joined = qb
        .scan(&c.products)
        .inner_join(qb.scan(&c.categories), |p, c| {
            p.property("CategoryId")?.equal(c.property("Id"))
        })
        .unwrap();
    let ExprKind::Join { join_type, .. } = joined.kind() else {
        panic!("expected join");
    };
    assert_eq!(*join_type, JoinType::Inner);
}

#[test]
fn test_scalar_operators() {
    let c = catalog();
    let qb = QueryBuilder::shared();
    let cheap_or_named = qb
        .scan(&c.products)
        .where_(|p| {
            let cheap = p.property("Price")?.multiply(2)?.less_than_or_equal(100)?;
            let named = p.property("Name")?.like("Widget%")?;
            cheap.or(named)?.and(p.property("Id")?.in_list([1, 2, 3]))
        })
        .unwrap();
    assert_eq!(cheap_or_named.kind_name(), "Filter");

    let discontinued = DataType::Entity(c.discontinued.clone());
    let reasons = qb
        .scan(&c.products)
        .where_(|p| p.is_of(discontinued.clone()))
        .select(|p| p.treat_as(discontinued.clone())?.property("Reason"))
        .unwrap();
    assert_eq!(reasons.result_type(), &DataType::collection_of(DataType::String));
}

#[test]
fn test_reference_round_trip() {
    let c = catalog();
    let qb = QueryBuilder::shared();
    let names = qb
        .scan(&c.products)
        .select(|p| p.get_entity_ref()?.deref()?.property("Name"))
        .unwrap();
    assert_eq!(names.result_type(), &DataType::collection_of(DataType::String));

    let keys = qb
        .scan(&c.products)
        .select(|p| p.get_entity_ref()?.get_ref_key())
        .unwrap();
    assert_eq!(
        keys.result_type(),
        &DataType::collection_of(c.product.key_row_type())
    );
}

#[test]
fn test_exists_over_navigation() {
    let c = catalog();
    let qb = QueryBuilder::shared();
    let stocked = qb
        .scan(&c.categories)
        .where_(|cat| {
            cat.navigate(&c.category_products, "Category", "Products")
                .exists()
        })
        .unwrap();
    assert_eq!(stocked.kind_name(), "Filter");
}
