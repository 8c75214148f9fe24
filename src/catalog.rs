//! Table and relation catalogs consulted by the engine.
//!
//! The engine reads catalogs through the [`TableCatalog`] and
//! [`RelationCatalog`] traits only. [`CatalogSnapshot`] is the in-memory
//! implementation loaded from a catalog document.

use std::{collections::HashSet, fmt, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    document,
    schema::{Column, ColumnType, TableRef},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default = "TableColumn::default_updateable")]
    pub is_updateable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expression: Option<String>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        TableColumn {
            name: name.into(),
            column_type,
            is_nullable: false,
            is_identity: false,
            is_updateable: true,
            default_expression: None,
        }
    }

    pub const fn default_updateable() -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

impl Table {
    /// Columns of this table as they appear when read directly.
    pub fn schema_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                column_type: column.column_type,
                is_nullable: column.is_nullable,
                is_identity: column.is_identity,
                is_updateable: column.is_updateable,
                default_expression: column.default_expression.clone(),
                table: TableRef::table(&self.id),
                relation: None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            RelationType::OneToOne => "one-to-one",
            RelationType::OneToMany => "one-to-many",
            RelationType::ManyToMany => "many-to-many",
        };
        f.write_str(token)
    }
}

/// Bridge table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub table: String,
    pub column_1: String,
    pub column_2: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub table_1: String,
    pub column_1: String,
    pub table_2: String,
    pub column_2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<JoinTable>,
}

/// One side of a relation as seen from a join target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSides<'a> {
    pub origin_table: &'a str,
    pub origin_column: &'a str,
    pub target_table: &'a str,
    pub target_column: &'a str,
}

impl Relation {
    pub fn has_endpoint(&self, table: &str) -> bool {
        self.table_1 == table || self.table_2 == table
    }

    /// Splits the relation into origin and target sides for a join into
    /// `target`. Side 2 is the target when both endpoints are the same table.
    pub fn sides_for_target(&self, target: &str) -> Option<JoinSides<'_>> {
        if self.table_2 == target {
            Some(JoinSides {
                origin_table: &self.table_1,
                origin_column: &self.column_1,
                target_table: &self.table_2,
                target_column: &self.column_2,
            })
        } else if self.table_1 == target {
            Some(JoinSides {
                origin_table: &self.table_2,
                origin_column: &self.column_2,
                target_table: &self.table_1,
                target_column: &self.column_1,
            })
        } else {
            None
        }
    }

    /// Sides for a join that starts from `origin`.
    pub fn sides_from_origin(&self, origin: &str) -> Option<JoinSides<'_>> {
        if self.table_1 == origin {
            self.sides_for_target(&self.table_2)
        } else if self.table_2 == origin {
            self.sides_for_target(&self.table_1)
        } else {
            None
        }
    }
}

pub trait TableCatalog {
    fn resolve_table(&self, table_id: &str) -> Option<&Table>;
}

pub trait RelationCatalog {
    fn resolve_relation(&self, relation_id: &str) -> Option<&Relation>;
    fn relations_for_table(&self, table_id: &str) -> Vec<&Relation>;
}

/// Read-only catalog views handed to every engine call.
#[derive(Clone, Copy)]
pub struct Catalogs<'a> {
    pub tables: &'a dyn TableCatalog,
    pub relations: &'a dyn RelationCatalog,
}

impl<'a> Catalogs<'a> {
    pub fn new(tables: &'a dyn TableCatalog, relations: &'a dyn RelationCatalog) -> Self {
        Catalogs { tables, relations }
    }
}

impl fmt::Debug for Catalogs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalogs").finish_non_exhaustive()
    }
}

/// Tables and relations captured at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl CatalogSnapshot {
    pub fn new(tables: Vec<Table>, relations: Vec<Relation>) -> Result<Self> {
        let snapshot = CatalogSnapshot { tables, relations };
        snapshot.ensure_unique_ids()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot: CatalogSnapshot = document::load_from_path(path)
            .with_context(|| format!("Loading catalog from {path:?}"))?;
        snapshot
            .ensure_unique_ids()
            .with_context(|| format!("Validating catalog {path:?}"))?;
        Ok(snapshot)
    }

    pub fn catalogs(&self) -> Catalogs<'_> {
        Catalogs::new(self, self)
    }

    fn ensure_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.id.as_str()) {
                bail!("Duplicate table id '{}' in catalog", table.id);
            }
            let mut columns = HashSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.as_str()) {
                    bail!("Duplicate column '{}' in table '{}'", column.name, table.id);
                }
            }
        }
        let mut seen = HashSet::new();
        for relation in &self.relations {
            if !seen.insert(relation.id.as_str()) {
                bail!("Duplicate relation id '{}' in catalog", relation.id);
            }
        }
        Ok(())
    }
}

impl TableCatalog for CatalogSnapshot {
    fn resolve_table(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == table_id)
    }
}

impl RelationCatalog for CatalogSnapshot {
    fn resolve_relation(&self, relation_id: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == relation_id)
    }

    fn relations_for_table(&self, table_id: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.has_endpoint(table_id))
            .collect()
    }
}
