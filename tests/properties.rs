mod common;

use common::{aggregate, pipeline, select, take};
use pipeline_schema::catalog::{CatalogSnapshot, Table, TableColumn};
use pipeline_schema::infer::{PipelineSchemaResult, infer_pipeline, infer_pipeline_schema};
use pipeline_schema::issue::IssueCode;
use pipeline_schema::pipeline::AggregateOperation;
use pipeline_schema::schema::{ColumnRef, ColumnType, TableRef};
use proptest::prelude::*;

fn column_type_strategy() -> impl Strategy<Value = ColumnType> {
    prop_oneof![
        Just(ColumnType::String),
        Just(ColumnType::Number),
        Just(ColumnType::Float),
        Just(ColumnType::Boolean),
        Just(ColumnType::Date),
        Just(ColumnType::DateTime),
        Just(ColumnType::Enum),
    ]
}

fn operation_strategy() -> impl Strategy<Value = AggregateOperation> {
    prop_oneof![
        Just(AggregateOperation::Count),
        Just(AggregateOperation::Sum),
        Just(AggregateOperation::Average),
        Just(AggregateOperation::Min),
        Just(AggregateOperation::Max),
    ]
}

/// A single-table catalog `events` with columns `c0..cN` of the given types.
fn events_catalog(types: &[ColumnType]) -> CatalogSnapshot {
    let columns = types
        .iter()
        .enumerate()
        .map(|(index, ty)| TableColumn::new(format!("c{index}"), *ty))
        .collect();
    CatalogSnapshot::new(
        vec![Table {
            id: "events".to_string(),
            columns,
        }],
        Vec::new(),
    )
    .expect("catalog")
}

fn picked(mask: &[bool]) -> Vec<ColumnRef> {
    mask.iter()
        .enumerate()
        .filter(|(_, keep)| **keep)
        .map(|(index, _)| ColumnRef::new(format!("c{index}"), "events"))
        .collect()
}

proptest! {
    #[test]
    fn select_of_existing_columns_yields_exactly_those_columns(
        (types, mask) in proptest::collection::vec(column_type_strategy(), 1..8)
            .prop_flat_map(|types| {
                let len = types.len();
                (Just(types), proptest::collection::vec(any::<bool>(), len))
            })
    ) {
        let chosen = picked(&mask);
        prop_assume!(!chosen.is_empty());
        let catalog = events_catalog(&types);

        let once = infer_pipeline_schema(&pipeline("events", vec![select(&chosen)]), catalog.catalogs())
            .expect("inference runs");
        let PipelineSchemaResult::Success { schema } = once else {
            panic!("selecting existing columns must succeed");
        };
        prop_assert_eq!(schema.column_refs(), chosen.clone());

        let twice = infer_pipeline(
            &pipeline("events", vec![select(&chosen), select(&chosen)]),
            catalog.catalogs(),
        )
        .expect("inference runs");
        prop_assert_eq!(twice.final_schema(), &schema);
    }

    #[test]
    fn aggregate_output_is_groups_plus_result(
        (types, mask, source) in proptest::collection::vec(column_type_strategy(), 1..8)
            .prop_flat_map(|types| {
                let len = types.len();
                (Just(types), proptest::collection::vec(any::<bool>(), len), 0..len)
            }),
        operation in operation_strategy()
    ) {
        let catalog = events_catalog(&types);
        let group = picked(&mask);
        let column = ColumnRef::new(format!("c{source}"), "events");
        let step = aggregate(operation, column, "result", &group);
        let result = infer_pipeline_schema(&pipeline("events", vec![step]), catalog.catalogs())
            .expect("inference runs");

        let source_type = types[source];
        if operation.requires_numeric() && !source_type.is_numeric() {
            let PipelineSchemaResult::Failure { issues, .. } = result else {
                panic!("non-numeric {operation} must fail");
            };
            prop_assert_eq!(issues.len(), 1);
            prop_assert_eq!(issues[0].code, IssueCode::IncompatibleType);
        } else {
            let PipelineSchemaResult::Success { schema } = result else {
                panic!("aggregate over existing columns must succeed");
            };
            prop_assert_eq!(schema.columns.len(), group.len() + 1);
            let last = &schema.columns[group.len()];
            prop_assert_eq!(&last.name, "result");
            prop_assert_eq!(&last.table, &TableRef::Aggregate);
            let expected = match operation {
                AggregateOperation::Min | AggregateOperation::Max => source_type,
                _ => ColumnType::Number,
            };
            prop_assert_eq!(last.column_type, expected);
        }
    }

    #[test]
    fn inference_stops_at_first_invalid_step_and_agrees_with_prefixes(
        limits in proptest::collection::vec(-3i64..20, 0..10)
    ) {
        let catalog = events_catalog(&[ColumnType::Number, ColumnType::String]);
        let steps = limits.iter().map(|limit| take(*limit, 0)).collect();
        let full = pipeline("events", steps);

        let inference = infer_pipeline(&full, catalog.catalogs()).expect("inference runs");
        let first_negative = limits.iter().position(|limit| *limit < 0);
        prop_assert_eq!(inference.failure().map(|(index, _)| index), first_negative);
        prop_assert_eq!(inference.valid_steps(), first_negative.unwrap_or(limits.len()));

        for len in 0..=inference.valid_steps() {
            let prefix = infer_pipeline(&full.prefix(len), catalog.catalogs()).expect("prefix runs");
            prop_assert!(prefix.is_success());
            prop_assert_eq!(prefix.outputs(), &inference.outputs()[..len]);
        }

        let again = infer_pipeline(&full, catalog.catalogs()).expect("inference runs");
        prop_assert_eq!(again, inference);
    }
}
