//! INSERT, UPDATE and DELETE rendering.

use super::Compiler;
use super::binds::BindOrigin;
use crate::ast::{ColumnValue, Delete, Insert, Node, NodeId, Table, Update};
use crate::error::{SqlError, SqlResult};

impl<'t> Compiler<'t> {
    fn dml_target(&self, table: NodeId) -> SqlResult<(&'t Table, &'t str)> {
        let tree = self.tree;
        match tree.node(table)? {
            Node::Table(t) => match t.name.as_deref() {
                Some(name) => Ok((t, name)),
                None => Err(SqlError::unsupported("anonymous table", "a DML target")),
            },
            other => Err(SqlError::unsupported(other.kind(), "a DML target")),
        }
    }

    /// Pair each participating column with the placeholder it binds.
    ///
    /// Columns take part when the statement assigns them or a compile-time
    /// parameter names them. When nothing does, every column takes part
    /// with its declared default as the bind default.
    fn colparams(
        &mut self,
        table_id: NodeId,
        table: &'t Table,
        values: &'t [(NodeId, ColumnValue)],
    ) -> SqlResult<Vec<(&'t str, String)>> {
        let tree = self.tree;

        for (i, (column, _)) in values.iter().enumerate() {
            match tree.node(*column)? {
                Node::Column(c) if c.owner == table_id => {}
                _ => {
                    return Err(SqlError::unresolved(
                        column.index(),
                        "value assigned to a column outside the target table",
                    ));
                }
            }
            if values[..i].iter().any(|(c, _)| c == column) {
                return Err(SqlError::unresolved(
                    column.index(),
                    "column assigned more than once",
                ));
            }
        }

        let mut columns = Vec::with_capacity(table.columns.len());
        for &id in &table.columns {
            match tree.node(id)? {
                Node::Column(c) => columns.push((id, c)),
                other => return Err(SqlError::unsupported(other.kind(), "a table column")),
            }
        }

        let explicit = !values.is_empty()
            || columns
                .iter()
                .any(|(_, c)| self.options.params.contains_key(c.name()));

        let mut pairs = Vec::with_capacity(columns.len());
        for (id, column) in columns {
            let name = column.name();
            let assigned = match self.options.params.get(name) {
                Some(v) => Some(ColumnValue::Literal(v.clone())),
                None => values
                    .iter()
                    .find(|(c, _)| *c == id)
                    .map(|(_, v)| v.clone()),
            };

            let key = match assigned {
                None if explicit => continue,
                None => self.binds.register(
                    BindOrigin::Column(id),
                    name,
                    name,
                    column.spec.default.clone(),
                ),
                Some(ColumnValue::Literal(v)) => {
                    self.binds
                        .register(BindOrigin::Column(id), name, name, Some(v))
                }
                Some(ColumnValue::Param(bind)) => {
                    let node = tree.node(bind)?;
                    if !matches!(node, Node::BindParam(_)) {
                        return Err(SqlError::unsupported(node.kind(), "a column value"));
                    }
                    self.ensure(bind)?;
                    let origin = BindOrigin::Node(bind);
                    self.binds.alias_name(origin, name);
                    self.binds
                        .key_of(origin)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            SqlError::unresolved(bind.index(), "bind parameter was never registered")
                        })?
                }
            };
            pairs.push((name, self.generator.placeholder(&key)));
        }
        Ok(pairs)
    }

    pub(super) fn render_insert(&mut self, insert: &'t Insert) -> SqlResult<String> {
        let (table, name) = self.dml_target(insert.table)?;
        let pairs = self.colparams(insert.table, table, &insert.values)?;

        let columns: Vec<&str> = pairs.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<&str> = pairs.iter().map(|(_, p)| p.as_str()).collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            name,
            columns.join(", "),
            placeholders.join(", ")
        ))
    }

    pub(super) fn render_update(&mut self, update: &'t Update) -> SqlResult<String> {
        let (table, name) = self.dml_target(update.table)?;
        let pairs = self.colparams(update.table, table, &update.values)?;

        let sets: Vec<String> = pairs
            .iter()
            .map(|(c, p)| format!("{}={}", c, p))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", name, sets.join(", "));
        sql.push_str(&self.where_suffix(update.filter)?);
        Ok(sql)
    }

    pub(super) fn render_delete(&mut self, delete: &'t Delete) -> SqlResult<String> {
        let (_, name) = self.dml_target(delete.table)?;
        let mut sql = format!("DELETE FROM {}", name);
        sql.push_str(&self.where_suffix(delete.filter)?);
        Ok(sql)
    }
}
