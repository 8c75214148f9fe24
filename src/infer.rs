//! Pipeline driver.
//!
//! Seeds the schema from the base table, then validates and applies each step
//! in order. The first invalid step ends inference: later steps are never
//! looked at, since their meaning depends on a schema that does not exist.

use log::{debug, info};
use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
    apply::apply_step,
    catalog::{Catalogs, RelationType},
    error::EngineError,
    issue::{Issue, ValidationResult},
    pipeline::Pipeline,
    schema::InferredSchema,
    validate::validate_step,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSchemaResult {
    Success {
        schema: InferredSchema,
    },
    Failure {
        step_index: usize,
        issues: Vec<Issue>,
    },
}

impl PipelineSchemaResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineSchemaResult::Success { .. })
    }
}

impl Serialize for PipelineSchemaResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PipelineSchemaResult::Success { schema } => {
                let mut state = serializer.serialize_struct("PipelineSchemaResult", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("schema", schema)?;
                state.end()
            }
            PipelineSchemaResult::Failure { step_index, issues } => {
                let mut state = serializer.serialize_struct("PipelineSchemaResult", 3)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("stepIndex", step_index)?;
                state.serialize_field("issues", issues)?;
                state.end()
            }
        }
    }
}

/// Schema chain of a pipeline: the seed plus the output of every valid step,
/// and the issues of the first invalid step if there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInference {
    seed: InferredSchema,
    outputs: Vec<InferredSchema>,
    failure: Option<(usize, Vec<Issue>)>,
}

impl PipelineInference {
    pub fn seed(&self) -> &InferredSchema {
        &self.seed
    }

    /// Output schemas of the valid steps, in step order.
    pub fn outputs(&self) -> &[InferredSchema] {
        &self.outputs
    }

    /// Schema a step at `step_index` was (or would be) validated against.
    /// `None` past the first invalid step.
    pub fn input_schema(&self, step_index: usize) -> Option<&InferredSchema> {
        match step_index {
            0 => Some(&self.seed),
            n => self.outputs.get(n - 1),
        }
    }

    /// Schema after the last valid step.
    pub fn final_schema(&self) -> &InferredSchema {
        self.outputs.last().unwrap_or(&self.seed)
    }

    pub fn valid_steps(&self) -> usize {
        self.outputs.len()
    }

    pub fn failure(&self) -> Option<(usize, &[Issue])> {
        self.failure
            .as_ref()
            .map(|(index, issues)| (*index, issues.as_slice()))
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn into_result(self) -> PipelineSchemaResult {
        match self.failure {
            Some((step_index, issues)) => PipelineSchemaResult::Failure { step_index, issues },
            None => {
                let schema = self.outputs.into_iter().last().unwrap_or(self.seed);
                PipelineSchemaResult::Success { schema }
            }
        }
    }
}

/// Every column of the base table, read directly.
pub fn seed_schema(base_table: &str, catalogs: Catalogs<'_>) -> Result<InferredSchema, EngineError> {
    let table = catalogs
        .tables
        .resolve_table(base_table)
        .ok_or_else(|| EngineError::BaseTableNotFound(base_table.to_string()))?;
    if table.columns.is_empty() {
        return Err(EngineError::EmptyBaseTable(table.id.clone()));
    }
    Ok(InferredSchema::new(table.schema_columns(), Vec::new()))
}

pub fn infer_pipeline(
    pipeline: &Pipeline,
    catalogs: Catalogs<'_>,
) -> Result<PipelineInference, EngineError> {
    let seed = seed_schema(&pipeline.from, catalogs)?;
    debug!(
        "Seeded pipeline from '{}' with {} column(s)",
        pipeline.from,
        seed.columns.len()
    );

    let mut outputs: Vec<InferredSchema> = Vec::with_capacity(pipeline.steps.len());
    for (index, step) in pipeline.steps.iter().enumerate() {
        let current = outputs.last().unwrap_or(&seed);
        match validate_step(step, index, current, catalogs) {
            ValidationResult::Valid => {
                let next = apply_step(step, index, current, catalogs)?;
                outputs.push(next);
            }
            ValidationResult::Invalid(issues) => {
                info!(
                    "Pipeline from '{}' is invalid at step {} ({}): {} issue(s)",
                    pipeline.from,
                    index + 1,
                    step.kind(),
                    issues.len()
                );
                return Ok(PipelineInference {
                    seed,
                    outputs,
                    failure: Some((index, issues)),
                });
            }
        }
    }

    info!(
        "Pipeline from '{}' is valid across {} step(s)",
        pipeline.from,
        pipeline.steps.len()
    );
    Ok(PipelineInference {
        seed,
        outputs,
        failure: None,
    })
}

pub fn infer_pipeline_schema(
    pipeline: &Pipeline,
    catalogs: Catalogs<'_>,
) -> Result<PipelineSchemaResult, EngineError> {
    infer_pipeline(pipeline, catalogs).map(PipelineInference::into_result)
}

/// A relation that a Relate step could use from a given schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinCandidate {
    pub relation: String,
    pub relation_type: RelationType,
    pub origin_table: String,
    pub origin_column: String,
    pub target_table: String,
    pub target_column: String,
    pub suggested_alias: String,
}

/// Relations whose origin-side join column is in scope and whose target
/// table exists.
pub fn joinable_relations(schema: &InferredSchema, catalogs: Catalogs<'_>) -> Vec<JoinCandidate> {
    let mut candidates: Vec<JoinCandidate> = Vec::new();
    for origin in schema.tables_in_scope() {
        for relation in catalogs.relations.relations_for_table(origin) {
            let Some(sides) = relation.sides_from_origin(origin) else {
                continue;
            };
            if schema
                .find_table_column(sides.origin_table, sides.origin_column)
                .is_none()
                || catalogs.tables.resolve_table(sides.target_table).is_none()
            {
                continue;
            }
            if candidates
                .iter()
                .any(|c| c.relation == relation.id && c.target_table == sides.target_table)
            {
                continue;
            }
            candidates.push(JoinCandidate {
                relation: relation.id.clone(),
                relation_type: relation.relation_type,
                origin_table: sides.origin_table.to_string(),
                origin_column: sides.origin_column.to_string(),
                target_table: sides.target_table.to_string(),
                target_column: sides.target_column.to_string(),
                suggested_alias: suggest_alias(schema, sides.target_table),
            });
        }
    }
    candidates
}

/// First of `table`, `table_2`, `table_3`, ... not used by a column or
/// relation alias.
pub fn suggest_alias(schema: &InferredSchema, table: &str) -> String {
    if !schema.name_in_use(table) {
        return table.to_string();
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{table}_{suffix}");
        if !schema.name_in_use(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
