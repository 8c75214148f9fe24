//! Pipeline documents and the closed set of step variants.

use std::{fmt, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    derive::DeriveStep,
    document,
    filter::FilterStep,
    schema::{ColumnRef, ColumnType},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub from: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(from: impl Into<String>, steps: Vec<Step>) -> Self {
        Pipeline {
            from: from.into(),
            steps,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let pipeline: Pipeline = document::load_from_path(path)
            .with_context(|| format!("Loading pipeline from {path:?}"))?;
        ensure!(
            !pipeline.from.trim().is_empty(),
            "Pipeline {path:?} does not name a base table"
        );
        Ok(pipeline)
    }

    /// The pipeline made of the first `len` steps.
    pub fn prefix(&self, len: usize) -> Pipeline {
        Pipeline {
            from: self.from.clone(),
            steps: self.steps.iter().take(len).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Select(SelectStep),
    Aggregate(AggregateStep),
    Relate(RelateStep),
    Filter(FilterStep),
    Order(OrderStep),
    Take(TakeStep),
    Derive(DeriveStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Select,
    Aggregate,
    Relate,
    Filter,
    Order,
    Take,
    Derive,
}

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::Select,
        StepKind::Aggregate,
        StepKind::Relate,
        StepKind::Filter,
        StepKind::Order,
        StepKind::Take,
        StepKind::Derive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Select => "Select",
            StepKind::Aggregate => "Aggregate",
            StepKind::Relate => "Relate",
            StepKind::Filter => "Filter",
            StepKind::Order => "Order",
            StepKind::Take => "Take",
            StepKind::Derive => "Derive",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Select(_) => StepKind::Select,
            Step::Aggregate(_) => StepKind::Aggregate,
            Step::Relate(_) => StepKind::Relate,
            Step::Filter(_) => StepKind::Filter,
            Step::Order(_) => StepKind::Order,
            Step::Take(_) => StepKind::Take,
            Step::Derive(_) => StepKind::Derive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectStep {
    pub select: Vec<ColumnRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOperation {
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl AggregateOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOperation::Count => "count",
            AggregateOperation::Sum => "sum",
            AggregateOperation::Average => "average",
            AggregateOperation::Min => "min",
            AggregateOperation::Max => "max",
        }
    }

    /// Type of the synthesized result column for a source of `source` type.
    pub fn result_type(&self, source: ColumnType) -> ColumnType {
        match self {
            AggregateOperation::Count | AggregateOperation::Sum | AggregateOperation::Average => {
                ColumnType::Number
            }
            AggregateOperation::Min | AggregateOperation::Max => source,
        }
    }

    pub fn requires_numeric(&self) -> bool {
        matches!(self, AggregateOperation::Sum | AggregateOperation::Average)
    }
}

impl fmt::Display for AggregateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStep {
    pub operation: AggregateOperation,
    pub column: ColumnRef,
    #[serde(rename = "as")]
    pub alias: String,
    #[serde(default)]
    pub group: Vec<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelateTarget {
    /// Table to join in.
    pub table: String,
    /// Catalog relation id used for the join.
    pub relation: String,
    #[serde(rename = "as")]
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelateStep {
    pub relation: RelateTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub column: ColumnRef,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStep {
    pub order: Vec<OrderTerm>,
}

/// Limit and offset stay signed so negative input can be reported as an
/// issue instead of failing to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeStep {
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
