//! CREATE TABLE / DROP TABLE generation.
//!
//! Independent of statement compilation: no caching, no bind parameters.

use crate::ast::{ExprTree, Node, NodeId, Table};
use crate::error::{SqlError, SqlResult};

fn named_table(tree: &ExprTree, table: NodeId) -> SqlResult<(&Table, &str)> {
    match tree.node(table)? {
        Node::Table(t) => match t.name.as_deref() {
            Some(name) => Ok((t, name)),
            None => Err(SqlError::unsupported("anonymous table", "a DDL target")),
        },
        other => Err(SqlError::unsupported(other.kind(), "a DDL target")),
    }
}

/// Generate CREATE TABLE SQL.
pub fn create_table(tree: &ExprTree, table: NodeId) -> SqlResult<String> {
    let (t, name) = named_table(tree, table)?;

    let mut specs = Vec::with_capacity(t.columns.len());
    for id in &t.columns {
        match tree.node(*id)? {
            Node::Column(c) => specs.push(c.spec.specification()),
            other => return Err(SqlError::unsupported(other.kind(), "a table column")),
        }
    }

    Ok(format!("CREATE TABLE {} ({})", name, specs.join(", ")))
}

/// Generate DROP TABLE SQL.
pub fn drop_table(tree: &ExprTree, table: NodeId) -> SqlResult<String> {
    let (_, name) = named_table(tree, table)?;
    Ok(format!("DROP TABLE {}", name))
}

/// CREATE TABLE statements in the given order.
pub fn create_all(tree: &ExprTree, tables: &[NodeId]) -> SqlResult<Vec<String>> {
    tables.iter().map(|t| create_table(tree, *t)).collect()
}

/// DROP TABLE statements, in reverse creation order.
pub fn drop_all(tree: &ExprTree, tables: &[NodeId]) -> SqlResult<Vec<String>> {
    tables.iter().rev().map(|t| drop_table(tree, *t)).collect()
}
