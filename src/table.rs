//! Plain-text tables for the command-line output.

use std::fmt::Write as _;

use crate::{
    catalog::Table,
    infer::JoinCandidate,
    issue::Issue,
    schema::InferredSchema,
};

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_line(&mut output, &header_cells, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut output, &rule, &widths);
    for row in rows {
        push_line(&mut output, row, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.replace(['\n', '\t'], " ")))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(output, "{}", line.trim_end());
}

fn flag(value: bool) -> String {
    let token = if value { "yes" } else { "" };
    token.to_string()
}

pub fn render_schema(schema: &InferredSchema) -> String {
    let rows: Vec<Vec<String>> = schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.column_type.to_string(),
                column.table.to_string(),
                column
                    .relation
                    .as_ref()
                    .map(|r| r.alias.clone())
                    .unwrap_or_default(),
                flag(column.is_nullable),
            ]
        })
        .collect();
    render_table(&["#", "name", "type", "table", "via", "nullable"], &rows)
}

pub fn render_issues(issues: &[Issue]) -> String {
    let rows: Vec<Vec<String>> = issues
        .iter()
        .map(|issue| {
            vec![
                issue.path.step_label.clone(),
                issue.path.field.clone(),
                issue.code.to_string(),
                issue.message.clone(),
            ]
        })
        .collect();
    render_table(&["step", "field", "code", "message"], &rows)
}

pub fn render_candidates(candidates: &[JoinCandidate]) -> String {
    let rows: Vec<Vec<String>> = candidates
        .iter()
        .map(|c| {
            vec![
                c.relation.clone(),
                c.relation_type.to_string(),
                format!("{}.{}", c.origin_table, c.origin_column),
                format!("{}.{}", c.target_table, c.target_column),
                c.suggested_alias.clone(),
            ]
        })
        .collect();
    render_table(&["relation", "type", "from", "to", "alias"], &rows)
}

pub fn render_table_columns(table: &Table) -> String {
    let rows: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                column.column_type.to_string(),
                flag(column.is_nullable),
                flag(column.is_identity),
                flag(column.is_updateable),
                column.default_expression.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_table(
        &["name", "type", "nullable", "identity", "updateable", "default"],
        &rows,
    )
}
