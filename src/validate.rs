//! Per-step validators.
//!
//! Every step variant has its own validator; [`validate_step`] dispatches on
//! the closed [`Step`] enum. Validators never stop at the first problem: all
//! issues found in a step are returned together.

use itertools::Itertools;
use log::debug;

use crate::{
    catalog::Catalogs,
    derive::validate_derive,
    filter::validate_filter,
    issue::{Issue, IssueCode, StepScope, ValidationResult},
    pipeline::{AggregateStep, OrderStep, RelateStep, SelectStep, Step, TakeStep},
    schema::{ColumnIdentity, ColumnRef, InferredSchema},
};

pub fn validate_step(
    step: &Step,
    step_index: usize,
    schema: &InferredSchema,
    catalogs: Catalogs<'_>,
) -> ValidationResult {
    let scope = StepScope::new(step_index, step.kind());
    let issues = match step {
        Step::Select(select) => validate_select(select, scope, schema),
        Step::Aggregate(aggregate) => validate_aggregate(aggregate, scope, schema),
        Step::Relate(relate) => validate_relate(relate, scope, schema, catalogs),
        Step::Filter(filter) => validate_filter(filter, scope, schema),
        Step::Order(order) => validate_order(order, scope, schema),
        Step::Take(take) => validate_take(take, scope),
        Step::Derive(derive) => validate_derive(derive, scope, schema),
    };
    debug!(
        "Validated step {} ({}) against {} column(s): {} issue(s)",
        step_index + 1,
        scope.kind,
        schema.columns.len(),
        issues.len()
    );
    ValidationResult::from_issues(issues)
}

fn missing_columns<'a>(
    refs: &'a [ColumnRef],
    schema: &'a InferredSchema,
) -> impl Iterator<Item = &'a ColumnRef> {
    refs.iter().filter(|c| !schema.contains_column(*c))
}

fn duplicate_columns(refs: &[ColumnRef]) -> impl Iterator<Item = &ColumnRef> {
    refs.iter().duplicates_by(|c| c.identity_key())
}

fn check_new_name(name: &str, what: &str, scope: StepScope, schema: &InferredSchema) -> Option<Issue> {
    if name.trim().is_empty() {
        return Some(scope.issue(
            IssueCode::EmptyName,
            "as",
            format!("{what} name cannot be empty"),
        ));
    }
    schema.name_in_use(name).then(|| {
        scope.issue(
            IssueCode::NameCollision,
            "as",
            format!("{what} name '{name}' is already used by a column or relation"),
        )
    })
}

pub fn validate_select(step: &SelectStep, scope: StepScope, schema: &InferredSchema) -> Vec<Issue> {
    let mut issues = Vec::new();
    if step.select.is_empty() {
        issues.push(scope.issue(
            IssueCode::EmptySelection,
            "select",
            "Select at least one column",
        ));
    }
    issues.extend(missing_columns(&step.select, schema).map(|column| {
        scope.issue(
            IssueCode::MissingColumn,
            "select",
            format!("Column {} is not available", column.describe()),
        )
    }));
    issues.extend(duplicate_columns(&step.select).map(|column| {
        scope.issue(
            IssueCode::DuplicateColumn,
            "select",
            format!("Column {} is selected more than once", column.describe()),
        )
    }));
    issues
}

pub fn validate_aggregate(
    step: &AggregateStep,
    scope: StepScope,
    schema: &InferredSchema,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    match schema.find_column(&step.column) {
        None => issues.push(scope.issue(
            IssueCode::MissingColumn,
            "column",
            format!(
                "Aggregated column {} is not available",
                step.column.describe()
            ),
        )),
        Some(column) if step.operation.requires_numeric() && !column.column_type.is_numeric() => {
            issues.push(scope.issue(
                IssueCode::IncompatibleType,
                "operation",
                format!(
                    "Cannot {} column '{}' of type {}",
                    step.operation, column.name, column.column_type
                ),
            ))
        }
        Some(_) => {}
    }

    issues.extend(missing_columns(&step.group, schema).map(|column| {
        scope.issue(
            IssueCode::MissingColumn,
            "group",
            format!("Group column {} is not available", column.describe()),
        )
    }));
    issues.extend(duplicate_columns(&step.group).map(|column| {
        scope.issue(
            IssueCode::DuplicateColumn,
            "group",
            format!("Column {} is grouped more than once", column.describe()),
        )
    }));

    issues.extend(check_new_name(&step.alias, "Result", scope, schema));
    issues
}

pub fn validate_relate(
    step: &RelateStep,
    scope: StepScope,
    schema: &InferredSchema,
    catalogs: Catalogs<'_>,
) -> Vec<Issue> {
    let target = &step.relation;
    let mut issues = Vec::new();

    let table = catalogs.tables.resolve_table(&target.table);
    if table.is_none() {
        issues.push(scope.issue(
            IssueCode::UnknownTable,
            "relation",
            format!("Table '{}' was not found", target.table),
        ));
    }
    let relation = catalogs.relations.resolve_relation(&target.relation);
    if relation.is_none() {
        issues.push(scope.issue(
            IssueCode::UnknownRelation,
            "relation",
            format!("Relation '{}' was not found", target.relation),
        ));
    }

    if let (Some(_), Some(relation)) = (table, relation) {
        match relation.sides_for_target(&target.table) {
            None => issues.push(scope.issue(
                IssueCode::RelationEndpointMismatch,
                "relation",
                format!(
                    "Relation '{}' connects '{}' and '{}', not '{}'",
                    relation.id, relation.table_1, relation.table_2, target.table
                ),
            )),
            Some(sides) => {
                if catalogs.tables.resolve_table(sides.origin_table).is_none() {
                    issues.push(scope.issue(
                        IssueCode::UnknownOriginTable,
                        "relation",
                        format!(
                            "Origin table '{}' of relation '{}' was not found",
                            sides.origin_table, relation.id
                        ),
                    ));
                }
                if schema
                    .find_table_column(sides.origin_table, sides.origin_column)
                    .is_none()
                {
                    issues.push(scope.issue(
                        IssueCode::MissingJoinKey,
                        "relation",
                        format!(
                            "Join column '{}' of table '{}' is not available, relation '{}' cannot be joined",
                            sides.origin_column, sides.origin_table, relation.id
                        ),
                    ));
                }
            }
        }
    }

    issues.extend(check_new_name(&target.alias, "Relation", scope, schema));
    if let Some(table) = table {
        if table.columns.iter().any(|c| c.name == target.alias) {
            issues.push(scope.issue(
                IssueCode::NameCollision,
                "as",
                format!(
                    "Relation name '{}' is also a column of table '{}'",
                    target.alias, table.id
                ),
            ));
        }
        for column in table
            .columns
            .iter()
            .filter(|c| schema.has_relation_alias(&c.name))
        {
            issues.push(scope.issue(
                IssueCode::NameCollision,
                "relation",
                format!(
                    "Column '{}' of table '{}' would shadow the relation of the same name",
                    column.name, table.id
                ),
            ));
        }
    }
    issues
}

pub fn validate_order(step: &OrderStep, scope: StepScope, schema: &InferredSchema) -> Vec<Issue> {
    let mut issues = Vec::new();
    if step.order.is_empty() {
        issues.push(scope.issue(
            IssueCode::EmptySelection,
            "order",
            "Order needs at least one column",
        ));
    }
    for term in step.order.iter().filter(|t| !schema.contains_column(&t.column)) {
        issues.push(scope.issue(
            IssueCode::MissingColumn,
            "order",
            format!("Sort column {} is not available", term.column.describe()),
        ));
    }
    for term in step.order.iter().duplicates_by(|t| t.column.identity_key()) {
        issues.push(scope.issue(
            IssueCode::DuplicateColumn,
            "order",
            format!("Column {} is ordered more than once", term.column.describe()),
        ));
    }
    issues
}

pub fn validate_take(step: &TakeStep, scope: StepScope) -> Vec<Issue> {
    let mut issues = Vec::new();
    if step.limit < 0 {
        issues.push(scope.issue(
            IssueCode::NegativeValue,
            "limit",
            format!("Limit must not be negative, got {}", step.limit),
        ));
    }
    if step.offset < 0 {
        issues.push(scope.issue(
            IssueCode::NegativeValue,
            "offset",
            format!("Offset must not be negative, got {}", step.offset),
        ));
    }
    issues
}
