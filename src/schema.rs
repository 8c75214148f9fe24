//! Schema model for pipeline inference.
//!
//! This module owns the value types that flow between pipeline steps: the
//! [`Column`] (one addressable field), the [`ColumnType`] enum, the
//! [`RelationUse`] recorded when a table is joined in, and the
//! [`InferredSchema`] that describes what is available after N steps.
//!
//! ## Column identity
//!
//! Columns are never compared by reference or by full value. Two columns are
//! the same column when `(name, table, relation alias)` match, and every
//! membership or uniqueness test in the crate goes through
//! [`ColumnIdentity::same_column`].

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Table sentinel used for columns synthesized by an aggregate step.
pub const AGGREGATE_TABLE: &str = "aggregate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Number,
    Float,
    Boolean,
    Date,
    DateTime,
    Enum,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Enum => "enum",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "string", "number", "float", "boolean", "date", "datetime", "enum",
        ]
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Float)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Enum)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::DateTime)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "text" | "varchar" => Ok(ColumnType::String),
            "number" | "integer" | "int" => Ok(ColumnType::Number),
            "float" | "double" | "decimal" => Ok(ColumnType::Float),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            "datetime" | "date-time" | "timestamp" => Ok(ColumnType::DateTime),
            "enum" => Ok(ColumnType::Enum),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                ColumnType::variants().join(", ")
            )),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

/// Where a column originates: a catalog table, or an aggregate step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableRef {
    Table(String),
    Aggregate,
}

impl TableRef {
    pub fn table(id: impl Into<String>) -> Self {
        TableRef::Table(id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            TableRef::Table(id) => id,
            TableRef::Aggregate => AGGREGATE_TABLE,
        }
    }

    pub fn table_id(&self) -> Option<&str> {
        match self {
            TableRef::Table(id) => Some(id),
            TableRef::Aggregate => None,
        }
    }

    pub fn is_table(&self, id: &str) -> bool {
        self.table_id() == Some(id)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TableRef {
    fn from(value: &str) -> Self {
        if value == AGGREGATE_TABLE {
            TableRef::Aggregate
        } else {
            TableRef::Table(value.to_string())
        }
    }
}

impl Serialize for TableRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TableRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        if token.trim().is_empty() {
            return Err(de::Error::custom("Table reference cannot be empty"));
        }
        Ok(TableRef::from(token.as_str()))
    }
}

/// Structural identity shared by full columns and step column references.
pub trait ColumnIdentity {
    fn column_name(&self) -> &str;
    fn table_ref(&self) -> &TableRef;
    fn relation_alias(&self) -> Option<&str>;

    /// `(name, table, relation alias)`, the key every identity check uses.
    fn identity_key(&self) -> (&str, &str, Option<&str>) {
        (
            self.column_name(),
            self.table_ref().as_str(),
            self.relation_alias(),
        )
    }

    fn same_column<C: ColumnIdentity + ?Sized>(&self, other: &C) -> bool {
        self.identity_key() == other.identity_key()
    }

    /// Human readable reference used in issue messages.
    fn describe(&self) -> String {
        match self.relation_alias() {
            Some(alias) => format!(
                "'{}' of table '{}' (joined as '{}')",
                self.column_name(),
                self.table_ref(),
                alias
            ),
            None => format!(
                "'{}' of table '{}'",
                self.column_name(),
                self.table_ref()
            ),
        }
    }
}

/// A column as referenced from a step: just its structural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub name: String,
    pub table: TableRef,
    #[serde(
        default,
        rename = "as",
        skip_serializing_if = "Option::is_none"
    )]
    pub relation: Option<String>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>, table: impl Into<TableRef>) -> Self {
        ColumnRef {
            name: name.into(),
            table: table.into(),
            relation: None,
        }
    }

    pub fn via(mut self, alias: impl Into<String>) -> Self {
        self.relation = Some(alias.into());
        self
    }
}

impl From<&str> for ColumnRef {
    /// Parses `table.column` or `alias:table.column`.
    fn from(value: &str) -> Self {
        let (alias, rest) = match value.split_once(':') {
            Some((alias, rest)) => (Some(alias.trim().to_string()), rest),
            None => (None, value),
        };
        let (table, name) = rest.split_once('.').unwrap_or((AGGREGATE_TABLE, rest));
        ColumnRef {
            name: name.trim().to_string(),
            table: TableRef::from(table.trim()),
            relation: alias,
        }
    }
}

impl ColumnIdentity for ColumnRef {
    fn column_name(&self) -> &str {
        &self.name
    }

    fn table_ref(&self) -> &TableRef {
        &self.table
    }

    fn relation_alias(&self) -> Option<&str> {
        self.relation.as_deref()
    }
}

/// A joined table as known to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationUse {
    #[serde(rename = "as")]
    pub alias: String,
    /// Catalog relation id.
    pub relation: String,
    /// Joined (target) table id.
    pub table: String,
    /// Target-side join column.
    pub column: String,
    /// In-scope origin column the join predicate reads from.
    pub on: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub is_updateable: bool,
    #[serde(default)]
    pub default_expression: Option<String>,
    pub table: TableRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationUse>,
}

impl Column {
    /// Synthesized result column of an aggregate step.
    pub fn aggregate(name: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            column_type,
            is_nullable: false,
            is_identity: false,
            is_updateable: false,
            default_expression: None,
            table: TableRef::Aggregate,
            relation: None,
        }
    }

    pub fn to_ref(&self) -> ColumnRef {
        ColumnRef {
            name: self.name.clone(),
            table: self.table.clone(),
            relation: self.relation.as_ref().map(|r| r.alias.clone()),
        }
    }
}

impl ColumnIdentity for Column {
    fn column_name(&self) -> &str {
        &self.name
    }

    fn table_ref(&self) -> &TableRef {
        &self.table
    }

    fn relation_alias(&self) -> Option<&str> {
        self.relation.as_ref().map(|r| r.alias.as_str())
    }
}

/// Columns and relation aliases available after a prefix of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub relations: Vec<RelationUse>,
}

impl InferredSchema {
    pub fn new(columns: Vec<Column>, relations: Vec<RelationUse>) -> Self {
        InferredSchema { columns, relations }
    }

    pub fn find_column<C: ColumnIdentity + ?Sized>(&self, key: &C) -> Option<&Column> {
        self.columns.iter().find(|column| column.same_column(key))
    }

    pub fn contains_column<C: ColumnIdentity + ?Sized>(&self, key: &C) -> bool {
        self.find_column(key).is_some()
    }

    pub fn has_relation_alias(&self, alias: &str) -> bool {
        self.relations.iter().any(|r| r.alias == alias)
    }

    /// True when `name` is taken by a column or a relation alias.
    pub fn name_in_use(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name) || self.has_relation_alias(name)
    }

    /// First in-scope column named `column` that originates from `table`,
    /// whether it was read directly or through a join.
    pub fn find_table_column(&self, table: &str, column: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == column && c.table.is_table(table))
    }

    /// Distinct catalog tables with at least one column in scope.
    pub fn tables_in_scope(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for id in self.columns.iter().filter_map(|c| c.table.table_id()) {
            if !tables.contains(&id) {
                tables.push(id);
            }
        }
        tables
    }

    pub fn column_refs(&self) -> Vec<ColumnRef> {
        self.columns.iter().map(Column::to_ref).collect()
    }
}
