use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use pipeline_schema::catalog::{CatalogSnapshot, Relation, RelationType, Table, TableColumn};
use pipeline_schema::filter::{ComparisonOperator, FilterCombinator, FilterCondition, FilterStep};
use pipeline_schema::infer::{infer_pipeline, joinable_relations};
use pipeline_schema::pipeline::{
    OrderStep, OrderTerm, Pipeline, RelateStep, RelateTarget, SortDirection, Step, TakeStep,
};
use pipeline_schema::schema::{ColumnRef, ColumnType};

/// Tables `t0..tN`, each linked to the next through `next_id`.
fn chained_catalog(tables: usize, width: usize) -> CatalogSnapshot {
    let tables_list = (0..tables)
        .map(|index| {
            let mut columns = vec![
                TableColumn::new("id", ColumnType::Number),
                TableColumn::new("next_id", ColumnType::Number),
            ];
            columns.extend(
                (0..width).map(|c| TableColumn::new(format!("attr_{c}"), ColumnType::String)),
            );
            Table {
                id: format!("t{index}"),
                columns,
            }
        })
        .collect();
    let relations = (0..tables.saturating_sub(1))
        .map(|index| Relation {
            id: format!("t{index}_next"),
            relation_type: RelationType::OneToMany,
            table_1: format!("t{index}"),
            column_1: "next_id".to_string(),
            table_2: format!("t{}", index + 1),
            column_2: "id".to_string(),
            join_table: None,
        })
        .collect();
    CatalogSnapshot::new(tables_list, relations).expect("chained catalog")
}

/// Joins every table of the chain, filtering and sorting after each join.
fn chained_pipeline(tables: usize) -> Pipeline {
    let mut steps = Vec::new();
    for index in 1..tables {
        let alias = format!("j{index}");
        steps.push(Step::Relate(RelateStep {
            relation: RelateTarget {
                table: format!("t{index}"),
                relation: format!("t{}_next", index - 1),
                alias: alias.clone(),
            },
        }));
        let joined = ColumnRef::new("attr_0", format!("t{index}").as_str()).via(alias);
        steps.push(Step::Filter(FilterStep {
            combinator: FilterCombinator::And,
            conditions: vec![FilterCondition {
                column: joined.clone(),
                operator: ComparisonOperator::StartsWith,
                value: Some(serde_json::json!("a")),
            }],
        }));
        steps.push(Step::Order(OrderStep {
            order: vec![OrderTerm {
                column: joined,
                direction: SortDirection::Desc,
            }],
        }));
    }
    steps.push(Step::Take(TakeStep {
        limit: 100,
        offset: 0,
    }));
    Pipeline::new("t0", steps)
}

fn bench_inference(c: &mut Criterion) {
    let catalog = chained_catalog(24, 16);
    let pipeline = chained_pipeline(24);

    let mut group = c.benchmark_group("pipeline_inference");

    group.bench_function("infer_chained_joins", |b| {
        b.iter_batched(
            || (),
            |_| {
                let inference =
                    infer_pipeline(&pipeline, catalog.catalogs()).expect("inference runs");
                assert!(inference.is_success());
            },
            BatchSize::SmallInput,
        );
    });

    let inference = infer_pipeline(&pipeline, catalog.catalogs()).expect("inference runs");
    group.bench_function("joinable_relations_after_chain", |b| {
        b.iter(|| joinable_relations(inference.final_schema(), catalog.catalogs()));
    });

    group.finish();
}

criterion_group!(benches, bench_inference);
criterion_main!(benches);
