#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use pipeline_schema::catalog::{
    CatalogSnapshot, JoinTable, Relation, RelationType, Table, TableColumn,
};
use pipeline_schema::derive::DeriveStep;
use pipeline_schema::filter::{ComparisonOperator, FilterCombinator, FilterCondition, FilterStep};
use pipeline_schema::pipeline::{
    AggregateOperation, AggregateStep, OrderStep, OrderTerm, Pipeline, RelateStep, RelateTarget,
    SelectStep, SortDirection, Step, TakeStep,
};
use pipeline_schema::schema::{ColumnRef, ColumnType};
use tempfile::{TempDir, tempdir};

fn table(id: &str, columns: &[(&str, ColumnType)]) -> Table {
    Table {
        id: id.to_string(),
        columns: columns
            .iter()
            .map(|(name, ty)| TableColumn::new(*name, *ty))
            .collect(),
    }
}

/// orders, customers, products and a few deliberately broken entries.
pub fn shop_catalog() -> CatalogSnapshot {
    let mut orders = table(
        "orders",
        &[
            ("id", ColumnType::Number),
            ("total", ColumnType::Float),
            ("customer_id", ColumnType::Number),
        ],
    );
    orders.columns[0].is_identity = true;
    orders.columns[0].is_updateable = false;

    let mut customers = table(
        "customers",
        &[
            ("id", ColumnType::Number),
            ("email", ColumnType::String),
            ("tier", ColumnType::Enum),
            ("joined_on", ColumnType::Date),
            ("last_seen", ColumnType::DateTime),
            ("active", ColumnType::Boolean),
        ],
    );
    customers.columns[1].is_nullable = true;

    let products = table(
        "products",
        &[
            ("id", ColumnType::Number),
            ("title", ColumnType::String),
            ("price", ColumnType::Float),
        ],
    );
    let employees = table(
        "employees",
        &[
            ("id", ColumnType::Number),
            ("name", ColumnType::String),
            ("manager_id", ColumnType::Number),
        ],
    );
    let empty = table("audit_log", &[]);

    let relations = vec![
        Relation {
            id: "orders_customer".to_string(),
            relation_type: RelationType::OneToMany,
            table_1: "customers".to_string(),
            column_1: "id".to_string(),
            table_2: "orders".to_string(),
            column_2: "customer_id".to_string(),
            join_table: None,
        },
        Relation {
            id: "orders_products".to_string(),
            relation_type: RelationType::ManyToMany,
            table_1: "orders".to_string(),
            column_1: "id".to_string(),
            table_2: "products".to_string(),
            column_2: "id".to_string(),
            join_table: Some(JoinTable {
                table: "order_items".to_string(),
                column_1: "order_id".to_string(),
                column_2: "product_id".to_string(),
            }),
        },
        Relation {
            id: "employee_manager".to_string(),
            relation_type: RelationType::OneToMany,
            table_1: "employees".to_string(),
            column_1: "manager_id".to_string(),
            table_2: "employees".to_string(),
            column_2: "id".to_string(),
            join_table: None,
        },
        Relation {
            id: "ghost_customers".to_string(),
            relation_type: RelationType::OneToOne,
            table_1: "ghosts".to_string(),
            column_1: "id".to_string(),
            table_2: "customers".to_string(),
            column_2: "id".to_string(),
            join_table: None,
        },
    ];

    CatalogSnapshot::new(
        vec![orders, customers, products, employees, empty],
        relations,
    )
    .expect("valid shop catalog")
}

pub fn col(name: &str, table: &str) -> ColumnRef {
    ColumnRef::new(name, table)
}

pub fn select(columns: &[ColumnRef]) -> Step {
    Step::Select(SelectStep {
        select: columns.to_vec(),
    })
}

pub fn aggregate(
    operation: AggregateOperation,
    column: ColumnRef,
    alias: &str,
    group: &[ColumnRef],
) -> Step {
    Step::Aggregate(AggregateStep {
        operation,
        column,
        alias: alias.to_string(),
        group: group.to_vec(),
    })
}

pub fn relate(table: &str, relation: &str, alias: &str) -> Step {
    Step::Relate(RelateStep {
        relation: RelateTarget {
            table: table.to_string(),
            relation: relation.to_string(),
            alias: alias.to_string(),
        },
    })
}

pub fn filter(conditions: Vec<FilterCondition>) -> Step {
    Step::Filter(FilterStep {
        combinator: FilterCombinator::And,
        conditions,
    })
}

pub fn condition(
    column: ColumnRef,
    operator: ComparisonOperator,
    value: Option<serde_json::Value>,
) -> FilterCondition {
    FilterCondition {
        column,
        operator,
        value,
    }
}

pub fn order(columns: &[(ColumnRef, SortDirection)]) -> Step {
    Step::Order(OrderStep {
        order: columns
            .iter()
            .map(|(column, direction)| OrderTerm {
                column: column.clone(),
                direction: *direction,
            })
            .collect(),
    })
}

pub fn take(limit: i64, offset: i64) -> Step {
    Step::Take(TakeStep { limit, offset })
}

pub fn derive(expression: &str, columns: &[ColumnRef]) -> Step {
    Step::Derive(DeriveStep {
        expression: expression.to_string(),
        columns: columns.to_vec(),
    })
}

pub fn pipeline(from: &str, steps: Vec<Step>) -> Pipeline {
    Pipeline::new(from, steps)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Catalog document for the loader and command line tests.
pub const SHOP_CATALOG_YAML: &str = r#"tables:
  - id: orders
    columns:
      - { name: id, type: number, is_identity: true, is_updateable: false }
      - { name: total, type: float }
      - { name: customer_id, type: number }
  - id: customers
    columns:
      - { name: id, type: number }
      - { name: email, type: string, is_nullable: true }
      - { name: tier, type: enum }
relations:
  - id: orders_customer
    type: one-to-many
    table_1: customers
    column_1: id
    table_2: orders
    column_2: customer_id
"#;

pub const VALID_PIPELINE_YAML: &str = r#"from: orders
steps:
  - type: relate
    relation: { table: customers, relation: orders_customer, as: buyer }
  - type: aggregate
    operation: sum
    column: { name: total, table: orders }
    as: revenue
    group:
      - { name: tier, table: customers, as: buyer }
  - type: take
    limit: 10
"#;

pub const INVALID_PIPELINE_YAML: &str = r#"from: orders
steps:
  - type: select
    select:
      - { name: total, table: orders }
  - type: select
    select:
      - { name: email, table: orders }
"#;
