//! Relational combinators over an explicit builder

mod common;

use common::{catalog, price_type};
use proptest::prelude::*;
use qtree_builder::functions::{count, group, max, min, st_dev, sum};
use qtree_builder::{record, QueryBuilder};
use qtree_ir::{ApplyType, BuildError, ComparisonOp, DataType, ExprKind, JoinType};

#[test]
fn test_where_builds_filter_over_comparison() {
    let c = catalog();
    let qb = QueryBuilder::new();

    let filter = qb
        .where_(qb.scan(&c.products), |p| {
            qb.compare(ComparisonOp::Gt, qb.property(p, "Price")?, 10)
        })
        .unwrap();

    assert_eq!(
        filter.result_type(),
        &DataType::collection_of(DataType::Entity(c.product.clone()))
    );
    let ExprKind::Filter { input, predicate } = filter.kind() else {
        panic!("expected filter, got {}", filter.kind_name());
    };
    assert_eq!(input.input().kind_name(), "Scan");
    let ExprKind::Comparison {
        op: ComparisonOp::Gt,
        left,
        right,
    } = predicate.kind()
    else {
        panic!("expected comparison, got {}", predicate.kind_name());
    };
    let ExprKind::Property { instance, name } = left.kind() else {
        panic!("expected property");
    };
    assert_eq!(name, "Price");
    assert!(instance.ptr_eq(input.variable()));
    assert_eq!(right.kind_name(), "Constant");
    assert_eq!(right.result_type(), &DataType::Int32);
}

#[test]
fn test_where_rejects_non_boolean_predicate() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let err = qb
        .where_(qb.scan(&c.products), |p| qb.property(p, "Price"))
        .unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { .. }));
}

#[test]
fn test_then_by_extends_one_sort() {
    let c = catalog();
    let qb = QueryBuilder::new();

    let sorted = qb
        .order_by(qb.scan(&c.products), |p| qb.property(p, "CategoryId"))
        .unwrap();
    let sorted = qb
        .then_by_descending(sorted, |p| qb.property(p, "Price"))
        .unwrap();
    let sorted = qb.then_by(sorted, |p| qb.property(p, "Name")).unwrap();

    let ExprKind::Sort { input, order } = sorted.kind() else {
        panic!("expected sort");
    };
    assert_eq!(input.input().kind_name(), "Scan");
    let directions: Vec<bool> = order.iter().map(|clause| clause.ascending()).collect();
    assert_eq!(directions, vec![true, false, true]);
    for clause in order {
        let ExprKind::Property { instance, .. } = clause.key().kind() else {
            panic!("expected property key");
        };
        assert_eq!(instance.variable_name(), Some(input.variable_name()));
    }
}

#[test]
fn test_collation_only_on_strings() {
    let c = catalog();
    let qb = QueryBuilder::new();
    assert!(qb
        .order_by_with_collation(qb.scan(&c.products), |p| qb.property(p, "Name"), "nocase")
        .is_ok());
    let err = qb
        .order_by_with_collation(qb.scan(&c.products), |p| qb.property(p, "Price"), "nocase")
        .unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { .. }));
}

#[test]
fn test_skip_requires_sorted_input() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let sorted = qb
        .order_by(qb.scan(&c.products), |p| qb.property(p, "Name"))
        .unwrap();

    let skipped = qb.skip(sorted.clone(), 5).unwrap();
    let ExprKind::Skip { order, count, .. } = skipped.kind() else {
        panic!("expected skip");
    };
    assert_eq!(order.len(), 1);
    assert_eq!(count.kind_name(), "Constant");

    let count = qb.parameter("offset", DataType::Int64).unwrap();
    assert!(qb.skip(sorted.clone(), count).is_ok());

    assert!(matches!(
        qb.skip(qb.scan(&c.products), 5),
        Err(BuildError::InvalidShape { .. })
    ));
    assert!(matches!(qb.skip(sorted, -1), Err(BuildError::InvalidShape { .. })));
}

#[test]
fn test_select_passes_variable_through() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let projected = qb.select(qb.scan(&c.products), |p| p).unwrap();
    let ExprKind::Project { input, projection } = projected.kind() else {
        panic!("expected project");
    };
    assert!(projection.ptr_eq(input.variable()));
    assert_eq!(projected.result_type(), input.input().result_type());
}

#[test]
fn test_record_columns_keep_declaration_order() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let projected = qb
        .select(qb.scan(&c.products), |p| {
            record! {
                Zeta: qb.property(p.clone(), "Name"),
                Alpha: qb.property(p, "Price"),
            }
        })
        .unwrap();
    assert_eq!(
        projected.result_type(),
        &DataType::collection_of(DataType::row([
            ("Zeta", DataType::String),
            ("Alpha", price_type()),
        ]))
    );
}

#[test]
fn test_select_many_is_projection_over_cross_apply() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let tags = qb
        .select_many(qb.scan(&c.products), |p| qb.property(p, "Tags"))
        .unwrap();

    assert_eq!(tags.result_type(), &DataType::collection_of(DataType::String));
    let ExprKind::Project { input, projection } = tags.kind() else {
        panic!("expected project");
    };
    let ExprKind::Apply {
        apply_type: ApplyType::Cross,
        apply,
        ..
    } = input.input().kind()
    else {
        panic!("expected cross apply, got {}", input.input().kind_name());
    };
    let ExprKind::Property { name, .. } = projection.kind() else {
        panic!("expected property");
    };
    assert_eq!(name, apply.variable_name());
}

#[test]
fn test_select_many_with_result_selector() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let pairs = qb
        .select_many_with(
            qb.scan(&c.products),
            |p| qb.property(p, "Tags"),
            |p, tag| record! { Name: qb.property(p, "Name"), Tag: tag },
        )
        .unwrap();
    assert_eq!(
        pairs.result_type(),
        &DataType::collection_of(DataType::row([
            ("Name", DataType::String),
            ("Tag", DataType::String),
        ]))
    );
}

#[test]
fn test_outer_apply_keeps_named_collection() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let applied = qb
        .outer_apply(qb.scan(&c.products), |p| ("Tag", qb.property(p, "Tags")))
        .unwrap();
    let ExprKind::Apply {
        apply_type, apply, ..
    } = applied.kind()
    else {
        panic!("expected apply");
    };
    assert_eq!(*apply_type, ApplyType::Outer);
    assert_eq!(apply.variable_name(), "Tag");
    assert_eq!(applied.kind_name(), "OuterApply");
}

#[test]
fn test_join_select_projects_joined_row() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let joined = qb
        .join_select(
            qb.scan(&c.products),
            qb.scan(&c.categories),
            |p| qb.property(p, "CategoryId"),
            |c| qb.property(c, "Id"),
            |p, c| {
                record! {
                    Product: qb.property(p, "Name"),
                    Category: qb.property(c, "Name"),
                }
            },
        )
        .unwrap();

    let ExprKind::Project { input, .. } = joined.kind() else {
        panic!("expected project");
    };
    let ExprKind::Join {
        join_type,
        condition,
        ..
    } = input.input().kind()
    else {
        panic!("expected join");
    };
    assert_eq!(*join_type, JoinType::Inner);
    assert!(matches!(
        condition.kind(),
        ExprKind::Comparison {
            op: ComparisonOp::Eq,
            ..
        }
    ));
    assert_eq!(
        joined.result_type(),
        &DataType::collection_of(DataType::row([
            ("Product", DataType::String),
            ("Category", DataType::String),
        ]))
    );
}

#[test]
fn test_conditional_joins() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let joined = qb
        .left_outer_join(qb.scan(&c.products), qb.scan(&c.categories), |p, c| {
            qb.compare(
                ComparisonOp::Eq,
                qb.property(p, "CategoryId")?,
                qb.property(c, "Id")?,
            )
        })
        .unwrap();
    assert_eq!(joined.kind_name(), "LeftOuterJoin");
    let DataType::Collection(row) = joined.result_type() else {
        panic!("expected collection");
    };
    let DataType::Struct(fields) = row.as_ref() else {
        panic!("expected row");
    };
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].data_type, DataType::Entity(c.product.clone()));
    assert_eq!(fields[1].data_type, DataType::Entity(c.category.clone()));

    let err = qb
        .inner_join(qb.scan(&c.products), qb.scan(&c.categories), |p, _| {
            qb.property(p, "Name")
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { .. }));
}

#[test]
fn test_group_by_single_key_and_aggregates() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let grouped = qb
        .group_by(
            qb.scan(&c.products),
            |p| qb.property(p, "CategoryId"),
            |g| {
                vec![
                    ("Count", count(g.clone())),
                    ("Total", sum(qb.select(g, |p| qb.property(p, "Price")))),
                ]
            },
        )
        .unwrap();

    let ExprKind::GroupBy {
        input,
        keys,
        aggregates,
    } = grouped.kind()
    else {
        panic!("expected group by");
    };
    assert_eq!(
        input.group_variable_type(),
        &DataType::collection_of(DataType::Entity(c.product.clone()))
    );
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].0, "Key");
    let names: Vec<&str> = aggregates.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Count", "Total"]);
}

#[test]
fn test_group_by_row_key_splits_columns() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let grouped = qb
        .group_by(
            qb.scan(&c.products),
            |p| {
                record! {
                    Category: qb.property(p.clone(), "CategoryId"),
                    Name: qb.property(p, "Name"),
                }
            },
            |g| vec![("Count", count(g))],
        )
        .unwrap();
    assert_eq!(
        grouped.result_type(),
        &DataType::collection_of(DataType::row([
            ("Category", DataType::Int32),
            ("Name", DataType::String),
            ("Count", DataType::Int32),
        ]))
    );
}

#[test]
fn test_group_by_rejects_duplicate_output_names() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let err = qb
        .group_by(
            qb.scan(&c.products),
            |p| qb.property(p, "CategoryId"),
            |g| vec![("Key", count(g))],
        )
        .unwrap_err();
    assert!(matches!(err, BuildError::NameConflict { .. }));
}

#[test]
fn test_union_is_distinct_union_all() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let left = qb.scan(&c.products);
    let right = qb
        .of_type(qb.scan(&c.products), DataType::Entity(c.discontinued.clone()))
        .unwrap();

    let union = qb.union(left.clone(), right.clone()).unwrap();
    let expected = qb.distinct(qb.union_all(left, right).unwrap()).unwrap();
    assert_eq!(union, expected);
    assert_eq!(
        union.result_type(),
        &DataType::collection_of(DataType::Entity(c.product.clone()))
    );
}

#[test]
fn test_except_and_intersect() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let discontinued = qb
        .of_type(qb.scan(&c.products), DataType::Entity(c.discontinued.clone()))
        .unwrap();

    let active = qb.except(qb.scan(&c.products), discontinued.clone()).unwrap();
    assert_eq!(active.kind_name(), "Except");
    assert_eq!(active.result_type(), qb.scan(&c.products).result_type());

    let both = qb.intersect(qb.scan(&c.products), discontinued).unwrap();
    assert_eq!(both.kind_name(), "Intersect");

    let err = qb
        .except(qb.scan(&c.products), qb.scan(&c.categories))
        .unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { .. }));
}

#[test]
fn test_cross_join_rows() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let pairs = qb
        .cross_join([qb.scan(&c.products), qb.scan(&c.categories)])
        .unwrap();
    let DataType::Collection(row) = pairs.result_type() else {
        panic!("expected collection");
    };
    let DataType::Struct(fields) = row.as_ref() else {
        panic!("expected row");
    };
    assert_eq!(fields.len(), 2);
    assert_ne!(fields[0].name, fields[1].name);

    let err = qb.cross_join([qb.scan(&c.products)]).unwrap_err();
    assert!(matches!(err, BuildError::InvalidShape { .. }));
}

#[test]
fn test_full_outer_join_kind() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let joined = qb
        .full_outer_join(qb.scan(&c.products), qb.scan(&c.categories), |p, c| {
            qb.compare(ComparisonOp::Eq, qb.property(p, "CategoryId")?, qb.property(c, "Id"))
        })
        .unwrap();
    let ExprKind::Join { join_type, .. } = joined.kind() else {
        panic!("expected join");
    };
    assert_eq!(*join_type, JoinType::Full);
}

#[test]
fn test_group_aggregate_keeps_partition() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let grouped = qb
        .group_by(
            qb.scan(&c.products),
            |p| qb.property(p, "CategoryId"),
            |g| vec![("Items", group(g))],
        )
        .unwrap();
    let ExprKind::GroupBy { aggregates, .. } = grouped.kind() else {
        panic!("expected group by");
    };
    assert_eq!(aggregates[0].0, "Items");
    assert_eq!(
        aggregates[0].1.result_type(),
        &DataType::collection_of(DataType::Entity(c.product.clone()))
    );
}

#[test]
fn test_min_and_max_over_strings() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let grouped = qb
        .group_by(
            qb.scan(&c.products),
            |p| qb.property(p, "CategoryId"),
            |g| {
                vec![
                    ("First", min(qb.select(g.clone(), |p| qb.property(p, "Name")))),
                    ("Last", max(qb.select(g.clone(), |p| qb.property(p, "Name")))),
                    ("Spread", st_dev(qb.select(g, |p| qb.property(p, "Price")))),
                ]
            },
        )
        .unwrap();
    assert_eq!(
        grouped.result_type(),
        &DataType::collection_of(DataType::row([
            ("Key", DataType::Int32),
            ("First", DataType::String),
            ("Last", DataType::String),
            ("Spread", DataType::Float64),
        ]))
    );
}

#[test]
fn test_any_is_not_empty() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let any = qb.any(qb.scan(&c.products)).unwrap();
    let ExprKind::Not { argument } = any.kind() else {
        panic!("expected not");
    };
    assert_eq!(argument.kind_name(), "IsEmpty");
    assert_eq!(any.result_type(), &DataType::Bool);
}

#[test]
fn test_quantifiers() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let all = qb
        .all(qb.scan(&c.products), |p| qb.is_null(qb.property(p, "Name")?))
        .unwrap();
    assert_eq!(all.kind_name(), "All");
    assert_eq!(all.result_type(), &DataType::Bool);
}

#[test]
fn test_navigate_from_categories() {
    let c = catalog();
    let qb = QueryBuilder::new();
    let products = qb
        .select(qb.scan(&c.categories), |cat| {
            qb.navigate(cat, &c.category_products, "Category", "Products")
        })
        .unwrap();
    assert_eq!(
        products.result_type(),
        &DataType::collection_of(DataType::collection_of(DataType::Ref(c.product.clone())))
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_bind_as_keeps_name_and_element_type(name in "[A-Za-z_][A-Za-z0-9_]{0,12}") {
        let c = catalog();
        let qb = QueryBuilder::new();
        let binding = qb.bind_as(qb.scan(&c.products), name.clone()).unwrap();
        prop_assert_eq!(binding.variable_name(), name.as_str());
        prop_assert_eq!(binding.variable_type(), &DataType::Entity(c.product.clone()));
        prop_assert_eq!(binding.variable().variable_name(), Some(name.as_str()));
    }

    #[test]
    fn prop_group_bind_rejects_shared_names(name in "[A-Za-z_][A-Za-z0-9_]{0,12}") {
        let c = catalog();
        let qb = QueryBuilder::new();
        let result = qb.group_bind_as(qb.scan(&c.products), name.clone(), name);
        let is_conflict = matches!(result, Err(BuildError::NameConflict { .. }));
        prop_assert!(is_conflict);
    }
}
