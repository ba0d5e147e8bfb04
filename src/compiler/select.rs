//! SELECT rendering.

use std::collections::{HashMap, HashSet, VecDeque};

use super::Compiler;
use super::binds::unique_name;
use crate::ast::{Node, NodeId, Select};
use crate::error::SqlResult;

/// A selected item after tables and aliases are expanded into their columns.
enum Expanded<'t> {
    Column(NodeId),
    Labeled(NodeId, &'t str),
    Expr(NodeId),
}

/// Labels claimed within one SELECT.
#[derive(Default)]
struct Labels {
    taken: HashSet<String>,
    by_column: HashMap<NodeId, String>,
}

impl Labels {
    fn claim(&mut self, base: &str) -> String {
        let label = unique_name(base, |l| self.taken.contains(l));
        self.taken.insert(label.clone());
        label
    }

    /// The same column instance keeps its label.
    fn column(&mut self, id: NodeId, base: &str) -> String {
        if let Some(label) = self.by_column.get(&id) {
            return label.clone();
        }
        let label = self.claim(base);
        self.by_column.insert(id, label.clone());
        label
    }
}

impl<'t> Compiler<'t> {
    pub(super) fn render_select(&mut self, id: NodeId, select: &'t Select) -> SqlResult<String> {
        let tree = self.tree;
        let use_labels = select.use_labels || self.options.use_labels;

        let mut expanded = Vec::with_capacity(select.items.len());
        for item in &select.items {
            match (&item.label, tree.node(item.node)?) {
                (Some(label), _) => expanded.push(Expanded::Labeled(item.node, label.as_str())),
                (None, Node::Table(_)) | (None, Node::Alias(_)) => expanded.extend(
                    tree.columns_of(item.node)
                        .iter()
                        .map(|c| Expanded::Column(*c)),
                ),
                (None, Node::Column(_)) => expanded.push(Expanded::Column(item.node)),
                (None, _) => expanded.push(Expanded::Expr(item.node)),
            }
        }

        let mut labels = Labels::default();
        let mut columns = Vec::with_capacity(expanded.len());
        // names an alias over this SELECT sees, in proxy column order
        let mut exports = Vec::with_capacity(expanded.len());
        for entry in expanded {
            match entry {
                Expanded::Column(column) => {
                    let fullname = self.value_text(column)?;
                    if use_labels {
                        let base = self.label_base(column)?;
                        let label = labels.column(column, &base);
                        columns.push(format!("{} AS {}", fullname, label));
                        exports.push(label);
                    } else {
                        columns.push(fullname);
                        exports.push(self.column_name(column)?);
                    }
                }
                Expanded::Labeled(item, label) => {
                    let text = self.value_text(item)?;
                    let label = labels.claim(label);
                    columns.push(format!("{} AS {}", text, label));
                    exports.push(label);
                }
                Expanded::Expr(item) => columns.push(self.value_text(item)?),
            }
        }
        self.exports.insert(id, exports);

        // Each override found on a FROM element is conjoined in front of
        // the predicate collected so far.
        let mut predicates: VecDeque<NodeId> = select.filter.into_iter().collect();
        let mut froms = Vec::with_capacity(select.froms.len());
        for from in &select.froms {
            if let Some(&extra) = self.options.where_overrides.get(from) {
                predicates.push_front(extra);
            }
            if let Some(text) = self.from_text(*from)? {
                froms.push(text);
            }
        }

        let mut sql = String::from("SELECT ");
        if columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&columns.join(", "));
        }

        if !froms.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&froms.join(", "));
        }

        let where_text = self.conjoin(predicates)?;
        if !where_text.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_text);
        }

        for (keyword, clause) in &select.clauses {
            let text = self.value_text(*clause)?;
            sql.push(' ');
            sql.push_str(keyword);
            sql.push(' ');
            sql.push_str(&text);
        }

        Ok(sql)
    }

    /// `<owner>_<column>`, or the bare column name for anonymous owners.
    fn label_base(&mut self, column: NodeId) -> SqlResult<String> {
        let name = self.column_name(column)?;
        let owner = match self.tree.node(column)? {
            Node::Column(c) => self.tree.owner_name(c.owner),
            _ => None,
        };
        Ok(match owner {
            Some(owner) => format!("{}_{}", owner, name),
            None => name,
        })
    }

    /// AND together the WHERE predicate and any injected predicates.
    ///
    /// The merged text lives only in this SELECT's output; the cached text
    /// of each predicate node is left as it was.
    fn conjoin(&mut self, predicates: VecDeque<NodeId>) -> SqlResult<String> {
        if predicates.len() == 1 {
            return self.value_text(predicates[0]);
        }
        let mut parts = Vec::with_capacity(predicates.len());
        for id in predicates {
            let text = self.value_text(id)?;
            if text.is_empty() {
                continue;
            }
            if self.needs_grouping(id) {
                parts.push(format!("({})", text));
            } else {
                parts.push(text);
            }
        }
        Ok(parts.join(" AND "))
    }

    /// Unparenthesized groups joined by something other than AND, and bare
    /// OR expressions, which bind looser than AND.
    fn needs_grouping(&self, id: NodeId) -> bool {
        match self.tree.get(id) {
            Some(Node::Compound(c)) => {
                !c.parens
                    && c.clauses.len() > 1
                    && c.operator
                        .as_deref()
                        .is_some_and(|op| !op.eq_ignore_ascii_case("AND"))
            }
            Some(Node::Binary(b)) => !b.parens && b.operator.eq_ignore_ascii_case("OR"),
            _ => false,
        }
    }
}
