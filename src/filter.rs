use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    issue::{Issue, IssueCode, StepScope},
    schema::{Column, ColumnIdentity, ColumnRef, ColumnType, InferredSchema},
};

const FIELD: &str = "conditions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        use ComparisonOperator::*;
        match self {
            Eq => "eq",
            NotEq => "not_eq",
            Gt => "gt",
            Ge => "ge",
            Lt => "lt",
            Le => "le",
            Contains => "contains",
            StartsWith => "starts_with",
            EndsWith => "ends_with",
            IsNull => "is_null",
            IsNotNull => "is_not_null",
        }
    }

    pub fn is_textual(&self) -> bool {
        use ComparisonOperator::*;
        matches!(self, Contains | StartsWith | EndsWith)
    }

    pub fn is_ordering(&self) -> bool {
        use ComparisonOperator::*;
        matches!(self, Gt | Ge | Lt | Le)
    }

    pub fn takes_value(&self) -> bool {
        use ComparisonOperator::*;
        !matches!(self, IsNull | IsNotNull)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCombinator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: ColumnRef,
    pub operator: ComparisonOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    #[serde(default)]
    pub combinator: FilterCombinator,
    pub conditions: Vec<FilterCondition>,
}

pub fn validate_filter(step: &FilterStep, scope: StepScope, schema: &InferredSchema) -> Vec<Issue> {
    let mut issues = Vec::new();
    if step.conditions.is_empty() {
        issues.push(scope.issue(
            IssueCode::EmptySelection,
            FIELD,
            "Filter needs at least one condition",
        ));
    }
    for (position, condition) in step.conditions.iter().enumerate() {
        let Some(column) = schema.find_column(&condition.column) else {
            issues.push(scope.issue(
                IssueCode::MissingColumn,
                FIELD,
                format!(
                    "Condition {} filters on column {} which is not available",
                    position + 1,
                    condition.column.describe()
                ),
            ));
            continue;
        };
        check_condition(condition, column, position, scope, &mut issues);
    }
    issues
}

fn check_condition(
    condition: &FilterCondition,
    column: &Column,
    position: usize,
    scope: StepScope,
    issues: &mut Vec<Issue>,
) {
    let operator = condition.operator;
    let label = format!("Condition {}", position + 1);
    if operator.is_textual() && !column.column_type.is_textual() {
        issues.push(scope.issue(
            IssueCode::IncompatibleType,
            FIELD,
            format!(
                "{label}: operator '{}' needs a text column but '{}' is {}",
                operator.as_str(),
                column.name,
                column.column_type
            ),
        ));
    }
    if operator.is_ordering() && column.column_type == ColumnType::Boolean {
        issues.push(scope.issue(
            IssueCode::IncompatibleType,
            FIELD,
            format!(
                "{label}: operator '{}' cannot compare boolean column '{}'",
                operator.as_str(),
                column.name
            ),
        ));
    }

    let value = condition.value.as_ref().filter(|v| !v.is_null());
    match (operator.takes_value(), value) {
        (false, Some(_)) => issues.push(scope.issue(
            IssueCode::InvalidValue,
            FIELD,
            format!("{label}: operator '{}' does not take a value", operator.as_str()),
        )),
        (true, None) => issues.push(scope.issue(
            IssueCode::InvalidValue,
            FIELD,
            format!("{label}: operator '{}' requires a value", operator.as_str()),
        )),
        (true, Some(value)) => {
            let expected = if operator.is_textual() {
                ColumnType::String
            } else {
                column.column_type
            };
            if let Err(err) = check_literal(value, expected) {
                issues.push(scope.issue(
                    IssueCode::InvalidValue,
                    FIELD,
                    format!("{label} on '{}': {err}", column.name),
                ));
            }
        }
        (false, None) => {}
    }
}

/// Checks that a JSON literal can be compared against a column of `ty`.
pub fn check_literal(value: &Value, ty: ColumnType) -> Result<()> {
    match ty {
        ColumnType::Number | ColumnType::Float => value
            .is_number()
            .then_some(())
            .ok_or_else(|| anyhow!("expected a number but found {value}")),
        ColumnType::Boolean => value
            .is_boolean()
            .then_some(())
            .ok_or_else(|| anyhow!("expected true or false but found {value}")),
        ColumnType::String | ColumnType::Enum => value
            .is_string()
            .then_some(())
            .ok_or_else(|| anyhow!("expected a string but found {value}")),
        ColumnType::Date => {
            let raw = value
                .as_str()
                .ok_or_else(|| anyhow!("expected a date string but found {value}"))?;
            parse_date_literal(raw).map(|_| ())
        }
        ColumnType::DateTime => {
            let raw = value
                .as_str()
                .ok_or_else(|| anyhow!("expected a datetime string but found {value}"))?;
            parse_datetime_literal(raw).map(|_| ())
        }
    }
}

pub fn parse_date_literal(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| anyhow!("'{value}' is not a valid date"))
}

pub fn parse_datetime_literal(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| anyhow!("'{value}' is not a valid datetime"))
}
