use anyhow::{Result, anyhow};
use evalexpr::{Node, build_operator_tree};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    issue::{Issue, IssueCode, StepScope},
    schema::{ColumnIdentity, ColumnRef, InferredSchema},
};

/// Computed expression over in-scope columns. Expression variables bind to
/// the names of the referenced `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveStep {
    pub expression: String,
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
}

/// Distinct variable identifiers used by `expression`, in first-use order.
pub fn expression_variables(expression: &str) -> Result<Vec<String>> {
    if expression.trim().is_empty() {
        return Err(anyhow!("Expression is empty"));
    }
    let tree: Node = build_operator_tree(expression).map_err(anyhow::Error::from)?;
    Ok(tree
        .iter_variable_identifiers()
        .unique()
        .map(str::to_string)
        .collect())
}

pub fn validate_derive(step: &DeriveStep, scope: StepScope, schema: &InferredSchema) -> Vec<Issue> {
    let mut issues = Vec::new();

    for column in step.columns.iter().filter(|c| !schema.contains_column(*c)) {
        issues.push(scope.issue(
            IssueCode::MissingColumn,
            "columns",
            format!("Derive references column {} which is not available", column.describe()),
        ));
    }
    for column in step
        .columns
        .iter()
        .duplicates_by(|c| c.identity_key())
    {
        issues.push(scope.issue(
            IssueCode::DuplicateColumn,
            "columns",
            format!("Column {} is referenced more than once", column.describe()),
        ));
    }

    match expression_variables(&step.expression) {
        Ok(variables) => {
            for variable in &variables {
                let bound: Vec<&ColumnRef> = step
                    .columns
                    .iter()
                    .filter(|c| &c.name == variable)
                    .unique_by(|c| c.identity_key())
                    .collect();
                match bound.as_slice() {
                    [] => issues.push(scope.issue(
                        IssueCode::UnboundVariable,
                        "expression",
                        format!("Variable '{variable}' does not match any referenced column"),
                    )),
                    [_] => {}
                    candidates => issues.push(scope.issue(
                        IssueCode::AmbiguousVariable,
                        "expression",
                        format!(
                            "Variable '{variable}' matches {} referenced columns: {}",
                            candidates.len(),
                            candidates.iter().map(|c| c.describe()).join(", ")
                        ),
                    )),
                }
            }
        }
        Err(err) => issues.push(scope.issue(
            IssueCode::InvalidExpression,
            "expression",
            format!("Derive expression is invalid: {err}"),
        )),
    }
    issues
}
