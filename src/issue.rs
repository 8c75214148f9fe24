//! Field-level validation issues.
//!
//! Issues are data: validators return them and the driver reports the ones
//! belonging to the first invalid step. The issue path always has the shape
//! `[stepIndex, "step {stepIndex+1} - {StepLabel}", fieldName]`.

use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeTuple};

use crate::pipeline::StepKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingColumn,
    DuplicateColumn,
    EmptySelection,
    NameCollision,
    EmptyName,
    UnknownTable,
    UnknownRelation,
    RelationEndpointMismatch,
    UnknownOriginTable,
    MissingJoinKey,
    IncompatibleType,
    InvalidValue,
    NegativeValue,
    InvalidExpression,
    UnboundVariable,
    AmbiguousVariable,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingColumn => "missing_column",
            IssueCode::DuplicateColumn => "duplicate_column",
            IssueCode::EmptySelection => "empty_selection",
            IssueCode::NameCollision => "name_collision",
            IssueCode::EmptyName => "empty_name",
            IssueCode::UnknownTable => "unknown_table",
            IssueCode::UnknownRelation => "unknown_relation",
            IssueCode::RelationEndpointMismatch => "relation_endpoint_mismatch",
            IssueCode::UnknownOriginTable => "unknown_origin_table",
            IssueCode::MissingJoinKey => "missing_join_key",
            IssueCode::IncompatibleType => "incompatible_type",
            IssueCode::InvalidValue => "invalid_value",
            IssueCode::NegativeValue => "negative_value",
            IssueCode::InvalidExpression => "invalid_expression",
            IssueCode::UnboundVariable => "unbound_variable",
            IssueCode::AmbiguousVariable => "ambiguous_variable",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePath {
    pub step_index: usize,
    pub step_label: String,
    pub field: String,
}

impl IssuePath {
    pub fn new(step_index: usize, kind: StepKind, field: impl Into<String>) -> Self {
        IssuePath {
            step_index,
            step_label: format!("step {} - {}", step_index + 1, kind.label()),
            field: field.into(),
        }
    }
}

impl Serialize for IssuePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.step_index)?;
        tuple.serialize_element(&self.step_label)?;
        tuple.serialize_element(&self.field)?;
        tuple.end()
    }
}

impl fmt::Display for IssuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.step_label, self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
    pub path: IssuePath,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}

/// Step being validated; stamps every issue with its path.
#[derive(Debug, Clone, Copy)]
pub struct StepScope {
    pub index: usize,
    pub kind: StepKind,
}

impl StepScope {
    pub fn new(index: usize, kind: StepKind) -> Self {
        StepScope { index, kind }
    }

    pub fn issue(&self, code: IssueCode, field: &str, message: impl Into<String>) -> Issue {
        Issue {
            code,
            message: message.into(),
            path: IssuePath::new(self.index, self.kind, field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<Issue>),
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(issues)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn issues(&self) -> &[Issue] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(issues) => issues,
        }
    }
}
