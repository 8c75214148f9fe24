//! Per-step schema transformers.
//!
//! Appliers only run on steps that passed validation. A lookup that
//! validation already confirmed but that fails here means the catalogs
//! changed underneath the engine and is reported as an [`EngineError`].

use log::debug;

use crate::{
    catalog::Catalogs,
    error::EngineError,
    pipeline::{AggregateStep, RelateStep, SelectStep, Step},
    schema::{Column, ColumnIdentity, InferredSchema, RelationUse},
};

pub fn apply_step(
    step: &Step,
    step_index: usize,
    schema: &InferredSchema,
    catalogs: Catalogs<'_>,
) -> Result<InferredSchema, EngineError> {
    let next = match step {
        Step::Select(select) => apply_select(select, schema),
        Step::Aggregate(aggregate) => apply_aggregate(aggregate, step_index, schema)?,
        Step::Relate(relate) => apply_relate(relate, step_index, schema, catalogs)?,
        Step::Filter(_) | Step::Order(_) | Step::Take(_) | Step::Derive(_) => schema.clone(),
    };
    debug!(
        "Applied step {} ({}): {} -> {} column(s)",
        step_index + 1,
        step.kind(),
        schema.columns.len(),
        next.columns.len()
    );
    Ok(next)
}

/// Keeps the selected columns in selection order. Relations pass through.
pub fn apply_select(step: &SelectStep, schema: &InferredSchema) -> InferredSchema {
    let columns = step
        .select
        .iter()
        .filter_map(|key| schema.find_column(key))
        .cloned()
        .collect();
    InferredSchema::new(columns, schema.relations.clone())
}

pub fn apply_aggregate(
    step: &AggregateStep,
    step_index: usize,
    schema: &InferredSchema,
) -> Result<InferredSchema, EngineError> {
    let source = schema
        .find_column(&step.column)
        .ok_or_else(|| EngineError::CatalogInconsistency {
            step: step_index,
            message: format!("aggregated column '{}' vanished after validation", step.column.name),
        })?;
    let mut columns: Vec<Column> = schema
        .columns
        .iter()
        .filter(|column| step.group.iter().any(|key| column.same_column(key)))
        .cloned()
        .collect();
    columns.push(Column::aggregate(
        step.alias.clone(),
        step.operation.result_type(source.column_type),
    ));
    Ok(InferredSchema::new(columns, schema.relations.clone()))
}

/// Appends the joined table's columns under the new alias and records the
/// alias.
pub fn apply_relate(
    step: &RelateStep,
    step_index: usize,
    schema: &InferredSchema,
    catalogs: Catalogs<'_>,
) -> Result<InferredSchema, EngineError> {
    let target = &step.relation;
    let inconsistency = |message: String| EngineError::CatalogInconsistency {
        step: step_index,
        message,
    };

    let table = catalogs
        .tables
        .resolve_table(&target.table)
        .ok_or_else(|| inconsistency(format!("table '{}' no longer resolves", target.table)))?;
    let relation = catalogs
        .relations
        .resolve_relation(&target.relation)
        .ok_or_else(|| {
            inconsistency(format!("relation '{}' no longer resolves", target.relation))
        })?;
    let sides = relation.sides_for_target(&table.id).ok_or_else(|| {
        inconsistency(format!(
            "relation '{}' does not reach table '{}'",
            relation.id, table.id
        ))
    })?;
    let origin = schema
        .find_table_column(sides.origin_table, sides.origin_column)
        .ok_or_else(|| {
            inconsistency(format!(
                "join column '{}.{}' is not in scope",
                sides.origin_table, sides.origin_column
            ))
        })?;

    let relation_use = RelationUse {
        alias: target.alias.clone(),
        relation: relation.id.clone(),
        table: table.id.clone(),
        column: sides.target_column.to_string(),
        on: origin.to_ref(),
    };

    let mut columns = schema.columns.clone();
    columns.extend(table.schema_columns().into_iter().map(|mut column| {
        column.relation = Some(relation_use.clone());
        column
    }));
    let mut relations = schema.relations.clone();
    relations.push(relation_use);
    Ok(InferredSchema::new(columns, relations))
}
